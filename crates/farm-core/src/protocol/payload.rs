//! Payload serialization traits and the decoded-payload sum type.
//!
//! Concrete payload types implement [`WirePayload`] to write themselves into
//! an envelope and [`FromWire`] to be rebuilt from a received one. Receivers
//! that do not know the shape up front call [`Message::decode`], which picks
//! the shape from the message type and falls back to [`Payload::Unknown`].

use crate::msgclasses::TaskProgress;
use crate::protocol::buffer::WireBuffer;
use crate::protocol::envelope::Message;
use crate::protocol::error::WireError;
use crate::protocol::types::MessageType;

/// A value that can serialize itself into a message payload.
pub trait WirePayload {
    /// Appends the encoded value at the buffer's write cursor.
    ///
    /// # Errors
    ///
    /// Propagates buffer errors, typically [`WireError::AllocationFailure`].
    fn write_to(&self, buf: &mut WireBuffer) -> Result<(), WireError>;
}

/// A value that can be rebuilt from a received message payload.
pub trait FromWire: Sized {
    /// Reads the value from the buffer's read cursor.
    ///
    /// # Errors
    ///
    /// Returns a decoding error when the bytes are short or inconsistent.
    fn read_from(buf: &mut WireBuffer) -> Result<Self, WireError>;
}

/// Text is written with the string encoding.
impl WirePayload for str {
    fn write_to(&self, buf: &mut WireBuffer) -> Result<(), WireError> {
        buf.write_string(self)
    }
}

impl WirePayload for String {
    fn write_to(&self, buf: &mut WireBuffer) -> Result<(), WireError> {
        buf.write_string(self)
    }
}

impl FromWire for String {
    fn read_from(buf: &mut WireBuffer) -> Result<Self, WireError> {
        buf.read_string()
    }
}

/// Bytes are written verbatim: the header length already frames them.
impl WirePayload for [u8] {
    fn write_to(&self, buf: &mut WireBuffer) -> Result<(), WireError> {
        buf.write_bytes(self)
    }
}

impl WirePayload for [String] {
    fn write_to(&self, buf: &mut WireBuffer) -> Result<(), WireError> {
        buf.write_string_list(self)
    }
}

impl FromWire for Vec<String> {
    fn read_from(buf: &mut WireBuffer) -> Result<Self, WireError> {
        buf.read_string_list()
    }
}

/// Every payload shape a receiver knows how to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Control message: just the header value.
    Control {
        message_type: MessageType,
        value: i32,
    },
    /// `TString`.
    Text(String),
    /// `TStringList`.
    TextList(Vec<String>),
    /// `TDATA`.
    Raw(Vec<u8>),
    /// `TTaskUpdateState` / `TTaskUpdatePercent`.
    TaskProgress(TaskProgress<'static>),
    /// Any data type without a decoder here; the payload is kept verbatim.
    Unknown {
        message_type: MessageType,
        bytes: Vec<u8>,
    },
}

impl Message {
    /// Decodes the payload according to the message type.
    ///
    /// Decoding happens only when this is called. The read cursor is rewound
    /// afterwards, so the message can be decoded again.
    ///
    /// # Errors
    ///
    /// Returns the payload's decoding error if the bytes do not match the
    /// shape the type promises.
    pub fn decode(&mut self) -> Result<Payload, WireError> {
        let message_type = self.message_type();
        match message_type {
            t if t.is_control() => Ok(Payload::Control {
                message_type: t,
                value: self.int_field(),
            }),
            MessageType::String => self.as_string().map(Payload::Text),
            MessageType::StringList => self.as_string_list().map(Payload::TextList),
            MessageType::Data => Ok(Payload::Raw(self.as_raw_bytes()?.to_vec())),
            MessageType::TaskUpdateState | MessageType::TaskUpdatePercent => {
                self.read_payload().map(Payload::TaskProgress)
            }
            t => Ok(Payload::Unknown {
                message_type: t,
                bytes: self.payload().to_vec(),
            }),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn received(msg: &Message) -> Message {
        Message::from_bytes(msg.as_bytes()).expect("frame parses")
    }

    #[test]
    fn test_decode_control() {
        let mut msg = received(&Message::from_control(MessageType::MonitorId, 4).unwrap());
        assert_eq!(
            msg.decode().unwrap(),
            Payload::Control {
                message_type: MessageType::MonitorId,
                value: 4
            }
        );
    }

    #[test]
    fn test_decode_text_and_list() {
        let mut text = received(&Message::from_string("hi").unwrap());
        assert_eq!(text.decode().unwrap(), Payload::Text("hi".to_string()));

        let list = vec!["a".to_string(), "b".to_string()];
        let mut msg = received(&Message::from_payload(MessageType::StringList, list.as_slice()).unwrap());
        assert_eq!(msg.decode().unwrap(), Payload::TextList(list));
    }

    #[test]
    fn test_decode_unknown_shape_keeps_bytes() {
        let sent = Message::from_payload(MessageType::JobsList, &[1u8, 2, 3][..]).unwrap();
        let mut msg = received(&sent);
        assert_eq!(
            msg.decode().unwrap(),
            Payload::Unknown {
                message_type: MessageType::JobsList,
                bytes: vec![1, 2, 3]
            }
        );
    }

    #[test]
    fn test_decode_is_repeatable() {
        let mut msg = received(&Message::from_string("again").unwrap());
        let first = msg.decode().unwrap();
        let second = msg.decode().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_string_payload_round_trips_through_read_payload() {
        let owned = String::from("owned");
        let mut msg = received(&Message::from_payload(MessageType::String, &owned).unwrap());
        let back: String = msg.read_payload().unwrap();
        assert_eq!(back, owned);
    }
}
