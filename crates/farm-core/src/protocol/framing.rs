//! Splits a byte stream into envelopes.
//!
//! The transport hands over bytes in whatever chunks the socket produced.
//! [`FrameDecoder`] accumulates them, waits until one full frame is present
//! (`header + declared length`), and yields it as a parsed [`Message`].
//!
//! A frame that parses to a fault (version mismatch, unknown type, or bad
//! length) is still yielded. Its length field is meaningless, so the frame
//! boundary is lost: the decoder drops everything it holds and everything
//! pushed afterwards until the transport calls [`FrameDecoder::reset`],
//! typically after reconnecting.

use tracing::{debug, warn};

use crate::protocol::envelope::{Message, RawHeader};

/// Accumulates stream bytes and yields complete messages.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
    /// Set after a faulty frame; input is dropped until [`reset`](Self::reset).
    desynced: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes received but not yet part of a complete frame.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// `true` once a faulty frame was yielded and the stream is out of sync.
    pub fn is_desynced(&self) -> bool {
        self.desynced
    }

    /// Forgets buffered bytes and resumes decoding at the next byte pushed.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.desynced = false;
    }

    /// Appends `chunk` and returns every message completed by it, in order.
    ///
    /// Returns nothing while the decoder is out of sync.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Message> {
        if self.desynced {
            debug!(dropped = chunk.len(), "stream out of sync, dropping input");
            return Vec::new();
        }
        self.pending.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(header) = RawHeader::peek(&self.pending) {
            let frame_len = header.frame_len();
            if self.pending.len() < frame_len {
                break;
            }
            // frame_len is within [HEADER_SIZE, BUFFER_SIZE_LIMIT]: parsing cannot fail.
            let parsed = Message::from_bytes(&self.pending[..frame_len]);
            self.pending.drain(..frame_len);
            let Ok(msg) = parsed else { break };

            let faulted = msg.fault().is_some();
            out.push(msg);
            if faulted {
                if !self.pending.is_empty() {
                    warn!(
                        dropped = self.pending.len(),
                        "discarding stream bytes after a faulty header"
                    );
                }
                self.pending.clear();
                self.desynced = true;
                break;
            }
        }
        out
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
