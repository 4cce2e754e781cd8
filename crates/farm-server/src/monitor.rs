//! Turns queue availability changes into monitor messages.

use farm_core::Message;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::queue::QueueObserver;

/// Forwards database alarms to monitors as `TString` messages.
///
/// Delivery is best effort: the queue worker must never wait on monitors, so
/// a full or closed channel only produces a log line.
#[derive(Debug, Clone)]
pub struct MonitorAlarm {
    tx: mpsc::Sender<Message>,
}

impl MonitorAlarm {
    /// Creates the sink and the receiving end the monitor fan-out reads from.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    fn send(&self, text: String) {
        let msg = match Message::from_string(&text) {
            Ok(msg) => msg,
            Err(e) => {
                error!(error = %e, "could not build monitor alarm message");
                return;
            }
        };
        match self.tx.try_send(msg) {
            Ok(()) => info!(alarm = %text, "monitor notified"),
            Err(e) => warn!(alarm = %text, error = %e, "monitor notification dropped"),
        }
    }
}

impl QueueObserver for MonitorAlarm {
    fn backend_unavailable(&self, queue: &str) {
        self.send(format!("{queue}: database connection lost"));
    }

    fn backend_recovered(&self, queue: &str) {
        self.send(format!("{queue}: database connection established"));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use farm_core::MessageType;

    use super::*;

    #[test]
    fn test_alarm_messages_carry_queue_name() {
        // Arrange
        let (alarm, mut rx) = MonitorAlarm::new(4);

        // Act
        alarm.backend_unavailable("db");
        alarm.backend_recovered("db");

        // Assert
        let mut lost = rx.try_recv().unwrap();
        assert_eq!(lost.message_type(), MessageType::String);
        assert_eq!(lost.as_string().unwrap(), "db: database connection lost");
        let mut back = rx.try_recv().unwrap();
        assert_eq!(back.as_string().unwrap(), "db: database connection established");
    }

    #[test]
    fn test_full_channel_drops_without_blocking() {
        let (alarm, mut rx) = MonitorAlarm::new(1);

        alarm.backend_unavailable("db");
        alarm.backend_recovered("db");

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_channel_is_tolerated() {
        let (alarm, rx) = MonitorAlarm::new(2);
        drop(rx);

        alarm.backend_unavailable("db");
    }
}
