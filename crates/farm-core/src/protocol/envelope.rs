//! The message envelope: a versioned, typed, length-framed unit of wire traffic.
//!
//! Wire format:
//! ```text
//! [version:4][type:4][length:4][payload:length]
//! ```
//! For control types the third header field is a plain integer value and no
//! payload follows. For data types it is the payload length, `1..=MAX_PAYLOAD_SIZE`.
//!
//! # Lifecycle
//!
//! A sender creates an envelope with [`Message::new`] (type `TNULL`) and sets
//! it exactly once, or uses one of the `from_*` shortcuts. A receiver builds
//! one with [`Message::from_bytes`], which parses and validates the header
//! straight away. A version mismatch or a broken header does not fail the
//! call. The message is converted in place to `TVersionMismatch` or `TInvalid`
//! and the reason is kept in [`Message::fault`], so always check
//! [`Message::message_type`] after receiving.

use std::fmt;

use tracing::{debug, warn};

use crate::protocol::buffer::{
    wire_len, WireBuffer, BUFFER_SIZE_LIMIT, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
use crate::protocol::error::WireError;
use crate::protocol::payload::{FromWire, WirePayload};
use crate::protocol::types::MessageType;

/// Protocol version compiled into this library. Peers must match exactly.
pub const PROTOCOL_VERSION: i32 = 1;

/// Text carried by the diagnostic message that replaces an oversized payload.
pub const OVERFLOW_TEXT: &str = "maximum message size exceeded";

/// Capacity of the small buffer holding [`OVERFLOW_TEXT`].
const DIAGNOSTIC_BUFFER_SIZE: usize = 100;

/// Where an envelope is in its one-way lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    /// Built locally and not yet set.
    Uninitialized,
    /// Control type: no payload.
    Control,
    /// Data type with a validated payload.
    Data,
    /// Rejected during construction or parsing.
    Invalid,
    /// Received from a peer running another protocol version.
    VersionMismatch,
}

/// The three header fields as they appear on the wire, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHeader {
    pub version: i32,
    pub code: i32,
    pub int_field: i32,
}

impl RawHeader {
    /// Reads a header from the front of `bytes`, if enough bytes are present.
    pub fn peek(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..HEADER_SIZE)?;
        let field = |at: usize| {
            i32::from_be_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
        };
        Some(Self {
            version: field(0),
            code: field(4),
            int_field: field(8),
        })
    }

    /// Total frame size a receiver should wait for before parsing.
    ///
    /// Only a current-version data header with a valid length announces a
    /// payload. Every other header is treated as a bare 12-byte frame, and
    /// parsing it yields a control, `TVersionMismatch`, or `TInvalid` message.
    pub fn frame_len(&self) -> usize {
        match usize::try_from(self.int_field) {
            Ok(len)
                if self.version == PROTOCOL_VERSION
                    && MessageType::is_data_code(self.code)
                    && (1..=MAX_PAYLOAD_SIZE).contains(&len) =>
            {
                HEADER_SIZE + len
            }
            _ => HEADER_SIZE,
        }
    }
}

/// A protocol message: header fields plus the buffer that carries them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    version: i32,
    message_type: MessageType,
    /// Payload length for data types, a plain value for control types.
    int_field: i32,
    buffer: WireBuffer,
    /// `true` while a sender is writing the payload.
    writing: bool,
    /// `true` when built from received bytes.
    received: bool,
    /// `true` once a setter has been called, whatever its outcome.
    set: bool,
    /// Why the message was downgraded, if it was.
    fault: Option<WireError>,
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Message {
    /// Creates an empty `TNULL` message ready to be set once.
    pub fn new() -> Self {
        let mut msg = Self {
            version: PROTOCOL_VERSION,
            message_type: MessageType::Null,
            int_field: 0,
            buffer: WireBuffer::new(),
            writing: false,
            received: false,
            set: false,
            fault: None,
        };
        msg.sync_header();
        msg
    }

    /// Builds a payload-free message.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidControlType`] if `message_type` is in the data band.
    pub fn from_control(message_type: MessageType, value: i32) -> Result<Self, WireError> {
        let mut msg = Self::new();
        msg.set_control(message_type, value)?;
        Ok(msg)
    }

    /// Builds a data message by letting `payload` serialize itself.
    ///
    /// Use [`Message::set_payload`] to keep the degraded diagnostic message
    /// when the payload is too large.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidDataType`] for a control type and
    /// [`WireError::PayloadTooLarge`] when the payload exceeds the ceiling.
    pub fn from_payload<P>(message_type: MessageType, payload: &P) -> Result<Self, WireError>
    where
        P: WirePayload + ?Sized,
    {
        let mut msg = Self::new();
        msg.set_payload(message_type, payload)?;
        Ok(msg)
    }

    /// Builds a `TString` message.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::PayloadTooLarge`] when the text exceeds the ceiling.
    pub fn from_string(text: &str) -> Result<Self, WireError> {
        let mut msg = Self::new();
        msg.set_with(MessageType::String, |buf| buf.write_string(text))?;
        Ok(msg)
    }

    /// Builds a `TStringList` message.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::PayloadTooLarge`] when the list exceeds the ceiling.
    pub fn from_string_list<S: AsRef<str>>(list: &[S]) -> Result<Self, WireError> {
        let mut msg = Self::new();
        msg.set_with(MessageType::StringList, |buf| buf.write_string_list(list))?;
        Ok(msg)
    }

    /// Builds a `TDATA` message carrying `data` verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InvalidLength`] when `data` is empty or longer
    /// than [`MAX_PAYLOAD_SIZE`]. The message is not degraded in that case.
    pub fn from_data(data: &[u8]) -> Result<Self, WireError> {
        if data.is_empty() || data.len() > MAX_PAYLOAD_SIZE {
            return Err(WireError::InvalidLength {
                length: wire_len(data.len()).unwrap_or(i32::MAX),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let mut msg = Self::new();
        msg.set_with(MessageType::Data, |buf| buf.write_bytes(data))?;
        Ok(msg)
    }

    /// Parses a received frame.
    ///
    /// Bytes past `header + declared length` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Truncated`] for fewer than 12 bytes and
    /// [`WireError::Oversized`] above the buffer ceiling. Every other problem
    /// downgrades the returned message instead (see the module docs).
    pub fn from_bytes(raw: &[u8]) -> Result<Self, WireError> {
        if raw.len() < HEADER_SIZE {
            warn!(
                len = raw.len(),
                "received message shorter than the protocol header"
            );
            return Err(WireError::Truncated {
                needed: HEADER_SIZE,
                available: raw.len(),
            });
        }
        if raw.len() > BUFFER_SIZE_LIMIT {
            warn!(len = raw.len(), "received message exceeds buffer ceiling");
            return Err(WireError::Oversized {
                size: raw.len(),
                limit: BUFFER_SIZE_LIMIT,
            });
        }

        let buffer = WireBuffer::from_received(raw);
        let (version, code, int_field) = buffer.read_header();
        let mut msg = Self {
            version,
            message_type: MessageType::Null,
            int_field,
            buffer,
            writing: false,
            received: true,
            set: false,
            fault: None,
        };
        msg.validate_received(code);
        Ok(msg)
    }

    // ── Setters ───────────────────────────────────────────────────────────────

    /// Sets a fresh message to a control type.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::AlreadySet`] if the message was set before, or
    /// [`WireError::InvalidControlType`] for a data type. Either way the
    /// message becomes `TInvalid`.
    pub fn set_control(&mut self, message_type: MessageType, value: i32) -> Result<(), WireError> {
        self.check_unset()?;
        if message_type.is_data() {
            return Err(self.reject(WireError::InvalidControlType(message_type)));
        }
        self.message_type = message_type;
        self.int_field = value;
        self.sync_header();
        Ok(())
    }

    /// Sets a fresh message to a data type and serializes `payload` into it.
    ///
    /// When the payload does not fit under the ceiling, the message becomes
    /// a `TNULL` carrying [`OVERFLOW_TEXT`]. That is still valid to send,
    /// and [`WireError::PayloadTooLarge`] is returned.
    ///
    /// # Errors
    ///
    /// [`WireError::AlreadySet`], [`WireError::InvalidDataType`],
    /// [`WireError::PayloadTooLarge`], or whatever the payload reports.
    pub fn set_payload<P>(&mut self, message_type: MessageType, payload: &P) -> Result<(), WireError>
    where
        P: WirePayload + ?Sized,
    {
        self.set_with(message_type, |buf| payload.write_to(buf))
    }

    fn set_with<F>(&mut self, message_type: MessageType, write: F) -> Result<(), WireError>
    where
        F: FnOnce(&mut WireBuffer) -> Result<(), WireError>,
    {
        self.check_unset()?;
        if message_type.is_control() {
            return Err(self.reject(WireError::InvalidDataType(message_type)));
        }

        self.writing = true;
        match write(&mut self.buffer) {
            Ok(()) => {}
            Err(WireError::AllocationFailure { requested, .. }) => {
                return Err(self.degrade(requested.saturating_sub(HEADER_SIZE)));
            }
            Err(WireError::Poisoned) => {
                return Err(self.degrade(self.buffer.written()));
            }
            Err(other) => return Err(self.reject(other)),
        }

        let len = self.buffer.written();
        if len == 0 {
            return Err(self.reject(WireError::InvalidLength {
                length: 0,
                max: MAX_PAYLOAD_SIZE,
            }));
        }
        self.message_type = message_type;
        self.int_field = wire_len(len)?;
        self.sync_header();
        debug!(message = %self, "message set");
        Ok(())
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// The raw third header field: payload length or control value.
    pub fn int_field(&self) -> i32 {
        self.int_field
    }

    /// The value carried by a control message, `None` for data types.
    pub fn control_value(&self) -> Option<i32> {
        self.message_type.is_control().then_some(self.int_field)
    }

    /// Declared payload length: zero for control types.
    pub fn payload_len(&self) -> usize {
        if self.message_type.is_data() {
            usize::try_from(self.int_field).unwrap_or(0)
        } else {
            0
        }
    }

    /// Bytes that go on the wire: header plus declared payload.
    pub fn write_size(&self) -> usize {
        HEADER_SIZE + self.payload_len()
    }

    /// The frame to transmit, exactly [`write_size`](Self::write_size) bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.frame(self.payload_len())
    }

    /// The payload bytes, header excluded.
    pub fn payload(&self) -> &[u8] {
        &self.buffer.payload()[..self.payload_len()]
    }

    /// `true` while built for sending, `false` once received.
    pub fn is_writing(&self) -> bool {
        self.writing
    }

    /// Why the message was converted to `TInvalid`, `TVersionMismatch`, or a
    /// diagnostic `TNULL`.
    pub fn fault(&self) -> Option<&WireError> {
        self.fault.as_ref()
    }

    pub fn state(&self) -> MessageState {
        match self.message_type {
            MessageType::Invalid => MessageState::Invalid,
            MessageType::VersionMismatch => MessageState::VersionMismatch,
            _ if self.is_fresh() => MessageState::Uninitialized,
            t if t.is_data() => MessageState::Data,
            _ => MessageState::Control,
        }
    }

    /// The text left in a sender-side `TNULL` after an oversized payload.
    pub fn diagnostic(&self) -> Option<String> {
        if self.message_type != MessageType::Null || !self.writing {
            return None;
        }
        let mut scratch = self.buffer.clone();
        scratch.reset_read();
        scratch.read_string().ok()
    }

    /// Reads a `TString` payload. Calling it again returns the same text.
    ///
    /// # Errors
    ///
    /// [`WireError::TypeMismatch`] for any other type, or a decoding error.
    pub fn as_string(&mut self) -> Result<String, WireError> {
        self.read_as(MessageType::String, WireBuffer::read_string)
    }

    /// Reads a `TStringList` payload. Calling it again returns the same list.
    ///
    /// # Errors
    ///
    /// [`WireError::TypeMismatch`] for any other type, or a decoding error.
    pub fn as_string_list(&mut self) -> Result<Vec<String>, WireError> {
        self.read_as(MessageType::StringList, WireBuffer::read_string_list)
    }

    /// The verbatim payload of a `TDATA` message.
    ///
    /// # Errors
    ///
    /// [`WireError::TypeMismatch`] for any other type.
    pub fn as_raw_bytes(&self) -> Result<&[u8], WireError> {
        self.expect_type(MessageType::Data)?;
        Ok(self.payload())
    }

    /// Deserializes a typed payload from a data message. The read cursor is
    /// rewound afterwards, so the same payload can be read again.
    ///
    /// # Errors
    ///
    /// [`WireError::TypeMismatch`] for a non-data message, or whatever the
    /// payload's reader reports.
    pub fn read_payload<P: FromWire>(&mut self) -> Result<P, WireError> {
        if !self.message_type.is_data() {
            return Err(WireError::TypeMismatch {
                expected: MessageType::Data,
                actual: self.message_type,
            });
        }
        let result = P::read_from(&mut self.buffer);
        self.buffer.reset_read();
        result
    }

    fn read_as<T>(
        &mut self,
        expected: MessageType,
        read: fn(&mut WireBuffer) -> Result<T, WireError>,
    ) -> Result<T, WireError> {
        self.expect_type(expected)?;
        let result = read(&mut self.buffer);
        self.buffer.reset_read();
        result
    }

    fn expect_type(&self, expected: MessageType) -> Result<(), WireError> {
        if self.message_type == expected {
            Ok(())
        } else {
            Err(WireError::TypeMismatch {
                expected,
                actual: self.message_type,
            })
        }
    }

    // ── Internal state transitions ────────────────────────────────────────────

    fn validate_received(&mut self, code: i32) {
        if self.version != PROTOCOL_VERSION {
            warn!(
                received = self.version,
                expected = PROTOCOL_VERSION,
                "protocol version mismatch"
            );
            let fault = WireError::VersionMismatch {
                received: self.version,
                expected: PROTOCOL_VERSION,
            };
            self.version = PROTOCOL_VERSION;
            self.message_type = MessageType::VersionMismatch;
            self.int_field = 0;
            self.fault = Some(fault);
            self.buffer.truncate_payload(0);
            self.sync_header();
            return;
        }

        let message_type = match MessageType::try_from(code) {
            Ok(t) => t,
            Err(e) => {
                self.reject(e);
                return;
            }
        };

        if message_type.is_data() {
            let len = match usize::try_from(self.int_field) {
                Ok(len) if (1..=MAX_PAYLOAD_SIZE).contains(&len) => len,
                _ => {
                    self.reject(WireError::InvalidLength {
                        length: self.int_field,
                        max: MAX_PAYLOAD_SIZE,
                    });
                    return;
                }
            };
            if self.buffer.written() < len {
                self.reject(WireError::InsufficientData {
                    needed: len,
                    available: self.buffer.written(),
                });
                return;
            }
            self.buffer.truncate_payload(len);
        } else {
            self.buffer.truncate_payload(0);
        }
        self.message_type = message_type;
    }

    fn is_fresh(&self) -> bool {
        !self.set && !self.received && self.fault.is_none()
    }

    /// Consumes the one-shot setter, failing if it was already used.
    fn check_unset(&mut self) -> Result<(), WireError> {
        if self.is_fresh() {
            self.set = true;
            Ok(())
        } else {
            let current = self.message_type;
            Err(self.reject(WireError::AlreadySet(current)))
        }
    }

    /// Marks the message `TInvalid` and hands the reason back for returning.
    fn reject(&mut self, fault: WireError) -> WireError {
        warn!(%fault, "message is invalid");
        self.message_type = MessageType::Invalid;
        self.int_field = 0;
        self.fault = Some(fault.clone());
        self.buffer.truncate_payload(0);
        self.sync_header();
        fault
    }

    /// Swaps an oversized payload for a `TNULL` carrying [`OVERFLOW_TEXT`].
    fn degrade(&mut self, attempted: usize) -> WireError {
        let fault = WireError::PayloadTooLarge {
            size: attempted,
            limit: MAX_PAYLOAD_SIZE,
        };
        warn!(%fault, "payload replaced by diagnostic message");
        self.buffer = WireBuffer::with_capacity(DIAGNOSTIC_BUFFER_SIZE);
        if let Err(e) = self.buffer.write_string(OVERFLOW_TEXT) {
            debug!(error = %e, "could not write overflow diagnostic");
        }
        self.message_type = MessageType::Null;
        self.int_field = 0;
        self.fault = Some(fault.clone());
        self.sync_header();
        fault
    }

    fn sync_header(&mut self) {
        self.buffer
            .write_header(self.version, self.message_type.code(), self.int_field);
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Length={}, type={}",
            self.message_type.name(),
            self.write_size(),
            self.message_type.code()
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a raw frame with arbitrary header fields.
    fn frame(version: i32, code: i32, int_field: i32, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
        out.extend_from_slice(&version.to_be_bytes());
        out.extend_from_slice(&code.to_be_bytes());
        out.extend_from_slice(&int_field.to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    // ── Construction ──────────────────────────────────────────────────────────

    #[test]
    fn test_new_message_is_uninitialized_null() {
        let msg = Message::new();
        assert_eq!(msg.message_type(), MessageType::Null);
        assert_eq!(msg.state(), MessageState::Uninitialized);
        assert_eq!(msg.write_size(), HEADER_SIZE);
    }

    #[test]
    fn test_from_control_carries_value_without_payload() {
        let msg = Message::from_control(MessageType::RenderId, 17).unwrap();
        assert_eq!(msg.state(), MessageState::Control);
        assert_eq!(msg.control_value(), Some(17));
        assert_eq!(msg.write_size(), HEADER_SIZE);
        assert_eq!(msg.as_bytes(), frame(PROTOCOL_VERSION, 20, 17, &[]).as_slice());
    }

    #[test]
    fn test_from_control_rejects_data_type() {
        let result = Message::from_control(MessageType::String, 0);
        assert_eq!(
            result,
            Err(WireError::InvalidControlType(MessageType::String))
        );
    }

    #[test]
    fn test_set_payload_rejects_control_type_and_invalidates() {
        let mut msg = Message::new();
        let result = msg.set_payload(MessageType::Confirm, "text");
        assert_eq!(result, Err(WireError::InvalidDataType(MessageType::Confirm)));
        assert_eq!(msg.state(), MessageState::Invalid);
    }

    #[test]
    fn test_message_can_only_be_set_once() {
        let mut msg = Message::from_control(MessageType::Confirm, 1).unwrap();
        let result = msg.set_control(MessageType::Confirm, 2);
        assert_eq!(result, Err(WireError::AlreadySet(MessageType::Confirm)));
        assert_eq!(msg.message_type(), MessageType::Invalid);
    }

    #[test]
    fn test_from_string_sets_length_header() {
        let msg = Message::from_string("hello").unwrap();
        assert_eq!(msg.message_type(), MessageType::String);
        assert_eq!(msg.payload_len(), 4 + 5);
        assert_eq!(msg.write_size(), HEADER_SIZE + 9);
        assert_eq!(&msg.as_bytes()[8..12], &9i32.to_be_bytes());
    }

    #[test]
    fn test_from_data_rejects_empty_input() {
        assert!(matches!(
            Message::from_data(&[]),
            Err(WireError::InvalidLength { length: 0, .. })
        ));
    }

    #[test]
    fn test_empty_string_still_has_length_prefix() {
        let msg = Message::from_string("").unwrap();
        assert_eq!(msg.payload_len(), 4);
    }

    #[test]
    fn test_oversized_payload_degrades_to_diagnostic_null() {
        // Arrange
        let huge = vec![0u8; MAX_PAYLOAD_SIZE + 1];
        let mut msg = Message::new();

        // Act
        let result = msg.set_payload(MessageType::TaskOutput, huge.as_slice());

        // Assert
        assert!(matches!(result, Err(WireError::PayloadTooLarge { .. })));
        assert_eq!(msg.message_type(), MessageType::Null);
        assert_eq!(msg.write_size(), HEADER_SIZE);
        assert_eq!(msg.diagnostic().as_deref(), Some(OVERFLOW_TEXT));
        assert!(matches!(msg.fault(), Some(WireError::PayloadTooLarge { .. })));
        assert_eq!(msg.state(), MessageState::Control);
        assert_eq!(
            msg.set_control(MessageType::Confirm, 1),
            Err(WireError::AlreadySet(MessageType::Null))
        );
    }

    #[test]
    fn test_explicit_null_control_uses_up_the_setter() {
        let mut msg = Message::new();

        assert_eq!(msg.set_control(MessageType::Null, 0), Ok(()));
        assert_eq!(msg.state(), MessageState::Control);

        assert_eq!(
            msg.set_control(MessageType::Confirm, 3),
            Err(WireError::AlreadySet(MessageType::Null))
        );
        assert_eq!(msg.message_type(), MessageType::Invalid);
    }

    // ── Reception ─────────────────────────────────────────────────────────────

    #[test]
    fn test_from_bytes_rejects_short_input() {
        for len in 0..HEADER_SIZE {
            let raw = vec![0u8; len];
            assert_eq!(
                Message::from_bytes(&raw),
                Err(WireError::Truncated {
                    needed: HEADER_SIZE,
                    available: len
                })
            );
        }
    }

    #[test]
    fn test_from_bytes_rejects_input_above_ceiling() {
        let raw = vec![0u8; BUFFER_SIZE_LIMIT + 1];
        assert!(matches!(
            Message::from_bytes(&raw),
            Err(WireError::Oversized { .. })
        ));
    }

    #[test]
    fn test_version_mismatch_downgrades_regardless_of_type() {
        // Arrange: another version, a data type, and a plausible payload
        let raw = frame(PROTOCOL_VERSION + 1, 49, 3, &[1, 2, 3]);

        // Act
        let msg = Message::from_bytes(&raw).unwrap();

        // Assert
        assert_eq!(msg.message_type(), MessageType::VersionMismatch);
        assert_eq!(msg.int_field(), 0);
        assert_eq!(msg.write_size(), HEADER_SIZE);
        assert_eq!(
            msg.fault(),
            Some(&WireError::VersionMismatch {
                received: PROTOCOL_VERSION + 1,
                expected: PROTOCOL_VERSION
            })
        );
        assert_eq!(&msg.as_bytes()[8..12], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_unknown_type_becomes_invalid() {
        let msg = Message::from_bytes(&frame(PROTOCOL_VERSION, 219, 0, &[])).unwrap();
        assert_eq!(msg.state(), MessageState::Invalid);
        assert_eq!(msg.fault(), Some(&WireError::UnknownType(219)));
    }

    #[test]
    fn test_data_type_with_zero_length_becomes_invalid() {
        let msg = Message::from_bytes(&frame(PROTOCOL_VERSION, 49, 0, &[])).unwrap();
        assert_eq!(msg.message_type(), MessageType::Invalid);
    }

    #[test]
    fn test_data_type_with_length_above_max_becomes_invalid() {
        let too_long = i32::try_from(MAX_PAYLOAD_SIZE + 1).unwrap();
        let msg = Message::from_bytes(&frame(PROTOCOL_VERSION, 47, too_long, &[])).unwrap();
        assert_eq!(msg.message_type(), MessageType::Invalid);
    }

    #[test]
    fn test_data_type_with_missing_payload_bytes_becomes_invalid() {
        let msg = Message::from_bytes(&frame(PROTOCOL_VERSION, 47, 10, &[1, 2])).unwrap();
        assert_eq!(msg.message_type(), MessageType::Invalid);
        assert!(matches!(msg.fault(), Some(WireError::InsufficientData { .. })));
    }

    #[test]
    fn test_received_control_keeps_value() {
        let msg = Message::from_bytes(&frame(PROTOCOL_VERSION, 3, 99, &[])).unwrap();
        assert_eq!(msg.state(), MessageState::Control);
        assert_eq!(msg.control_value(), Some(99));
        assert!(!msg.is_writing());
    }

    #[test]
    fn test_received_null_is_a_control_message() {
        let msg = Message::from_bytes(&frame(PROTOCOL_VERSION, 0, 0, &[])).unwrap();
        assert_eq!(msg.state(), MessageState::Control);
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let mut raw = Message::from_string("abc").unwrap().as_bytes().to_vec();
        raw.extend_from_slice(b"garbage");
        let mut msg = Message::from_bytes(&raw).unwrap();
        assert_eq!(msg.as_string().unwrap(), "abc");
        assert_eq!(msg.write_size(), HEADER_SIZE + 7);
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    #[test]
    fn test_string_accessor_is_idempotent() {
        let sent = Message::from_string("frame 12 done").unwrap();
        let mut received = Message::from_bytes(sent.as_bytes()).unwrap();
        assert_eq!(received.as_string().unwrap(), "frame 12 done");
        assert_eq!(received.as_string().unwrap(), "frame 12 done");
    }

    #[test]
    fn test_string_list_accessor_is_idempotent() {
        let sent = Message::from_string_list(&["a", "b"]).unwrap();
        let mut received = Message::from_bytes(sent.as_bytes()).unwrap();
        assert_eq!(received.as_string_list().unwrap(), vec!["a", "b"]);
        assert_eq!(received.as_string_list().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_accessor_type_mismatch() {
        let mut msg = Message::from_string("x").unwrap();
        assert_eq!(
            msg.as_string_list(),
            Err(WireError::TypeMismatch {
                expected: MessageType::StringList,
                actual: MessageType::String
            })
        );
        assert!(matches!(
            msg.as_raw_bytes(),
            Err(WireError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_raw_bytes_round_trip() {
        let sent = Message::from_data(&[9, 8, 7]).unwrap();
        let received = Message::from_bytes(sent.as_bytes()).unwrap();
        assert_eq!(received.as_raw_bytes().unwrap(), &[9, 8, 7]);
    }

    #[test]
    fn test_display_reports_name_length_and_code() {
        let msg = Message::from_control(MessageType::Confirm, 0).unwrap();
        assert_eq!(msg.to_string(), "TConfirm: Length=12, type=3");
    }

    #[test]
    fn test_raw_header_frame_len() {
        let data = RawHeader {
            version: PROTOCOL_VERSION,
            code: 49,
            int_field: 20,
        };
        assert_eq!(data.frame_len(), HEADER_SIZE + 20);

        let control = RawHeader { code: 3, ..data };
        assert_eq!(control.frame_len(), HEADER_SIZE);

        let foreign = RawHeader {
            version: PROTOCOL_VERSION + 1,
            ..data
        };
        assert_eq!(foreign.frame_len(), HEADER_SIZE);

        assert_eq!(RawHeader::peek(&[0u8; 11]), None);
    }
}
