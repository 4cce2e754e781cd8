//! Error taxonomy shared by the wire buffer, the envelope, and payload types.

use thiserror::Error;

use crate::protocol::types::MessageType;

/// Errors that can occur while building, parsing, or reading protocol messages.
///
/// Header-level problems (`VersionMismatch`, `UnknownType`, `InvalidLength`) are
/// normally not returned from [`Message::from_bytes`](crate::Message::from_bytes):
/// the message is converted in place and the error is kept as its
/// [`fault`](crate::Message::fault).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Fewer bytes than a complete header.
    #[error("truncated message: need at least {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// More bytes than the absolute buffer ceiling.
    #[error("oversized message: {size} bytes exceeds the {limit} byte ceiling")]
    Oversized { size: usize, limit: usize },

    /// The sender runs a different protocol version.
    #[error("protocol version mismatch: received {received}, running {expected}")]
    VersionMismatch { received: i32, expected: i32 },

    /// The type code is outside the catalog.
    #[error("unknown message type: {0}")]
    UnknownType(i32),

    /// A data-typed header declares a length outside `1..=max`.
    #[error("invalid data length {length} (allowed 1..={max})")]
    InvalidLength { length: i32, max: usize },

    /// An accessor was called for a payload shape the message does not carry.
    #[error("type mismatch: expected {expected}, message is {actual}")]
    TypeMismatch {
        expected: MessageType,
        actual: MessageType,
    },

    /// Buffer growth was refused because it would pass the hard ceiling.
    #[error("cannot allocate {requested} bytes: ceiling is {limit}")]
    AllocationFailure { requested: usize, limit: usize },

    /// The serialized payload does not fit in one message.
    #[error("maximum message size exceeded: payload of {size} bytes, limit {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    /// A file bundle index past the number of appended files.
    #[error("file index {index} out of range ({count} files)")]
    IndexOutOfRange { index: usize, count: usize },

    /// A data type was given to a constructor that takes no payload.
    #[error("{0} is a data type and needs a payload")]
    InvalidControlType(MessageType),

    /// A control type was given to a constructor that writes a payload.
    #[error("{0} is a control type and cannot carry a payload")]
    InvalidDataType(MessageType),

    /// The message was already given a type; envelopes are set exactly once.
    #[error("message is already set to {0}")]
    AlreadySet(MessageType),

    /// A read ran past the bytes actually present in the payload.
    #[error("insufficient payload data: need {needed} bytes, {available} remaining")]
    InsufficientData { needed: usize, available: usize },

    /// The payload bytes do not describe a valid value.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The buffer refused an earlier allocation and accepts no further writes.
    #[error("wire buffer is unusable after a failed allocation")]
    Poisoned,
}
