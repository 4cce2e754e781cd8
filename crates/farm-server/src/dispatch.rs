//! Routes received envelopes to their handlers and builds the reply.

use std::io;

use farm_core::{FrameDecoder, Message, MessageType, TaskProgress};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::db::DbQueue;

/// Receiver-side message router.
#[derive(Clone)]
pub struct Dispatcher {
    db: DbQueue,
}

impl Dispatcher {
    pub fn new(db: DbQueue) -> Self {
        Self { db }
    }

    /// Handles one received message and returns the reply to send, if any.
    pub fn handle(&self, mut msg: Message) -> Option<Message> {
        match msg.message_type() {
            MessageType::TaskUpdateState | MessageType::TaskUpdatePercent => {
                self.task_update(&mut msg)
            }
            MessageType::VersionMismatch => {
                warn!(fault = ?msg.fault(), "peer speaks another protocol version");
                reply(MessageType::VersionMismatch)
            }
            MessageType::Invalid => {
                warn!(fault = ?msg.fault(), "received invalid message");
                None
            }
            MessageType::String => {
                match msg.as_string() {
                    Ok(text) => info!(%text, "message from peer"),
                    Err(e) => warn!(error = %e, "unreadable string message"),
                }
                None
            }
            other => {
                debug!(message = %msg, kind = other.name(), "unhandled message type");
                None
            }
        }
    }

    /// Reads frames from `input` until end of stream, writing every reply to
    /// `output`.
    ///
    /// # Errors
    ///
    /// Any I/O error, or [`io::ErrorKind::InvalidData`] once a faulty frame
    /// has left the stream out of sync.
    pub async fn serve<R, W>(&self, mut input: R, mut output: W) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut decoder = FrameDecoder::new();
        let mut chunk = vec![0u8; 64 * 1024];
        loop {
            let n = input.read(&mut chunk).await?;
            if n == 0 {
                debug!("input stream closed");
                return Ok(());
            }
            for msg in decoder.push(&chunk[..n]) {
                if let Some(reply) = self.handle(msg) {
                    output.write_all(reply.as_bytes()).await?;
                }
            }
            output.flush().await?;
            if decoder.is_desynced() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "input stream out of sync",
                ));
            }
        }
    }

    fn task_update(&self, msg: &mut Message) -> Option<Message> {
        let progress: TaskProgress<'static> = match msg.read_payload() {
            Ok(progress) => progress,
            Err(e) => {
                warn!(error = %e, message = %msg, "malformed task progress");
                return None;
            }
        };
        debug!(%progress, "task progress");

        // Unconfirmed updates are resent by the render node.
        if let Err(e) = self.db.update_item(&progress, None) {
            error!(error = %e, "could not queue task progress");
            return None;
        }
        reply(MessageType::Confirm)
    }
}

fn reply(message_type: MessageType) -> Option<Message> {
    match Message::from_control(message_type, 0) {
        Ok(msg) => Some(msg),
        Err(e) => {
            error!(error = %e, "could not build reply");
            None
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
