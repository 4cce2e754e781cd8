//! Protocol module: wire buffer, message catalog, envelope, and framing.

pub mod buffer;
pub mod envelope;
pub mod error;
pub mod framing;
pub mod payload;
pub mod types;

pub use buffer::{WireBuffer, BUFFER_SIZE_LIMIT, DEFAULT_BUFFER_SIZE, HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use envelope::{Message, MessageState, RawHeader, OVERFLOW_TEXT, PROTOCOL_VERSION};
pub use error::WireError;
pub use framing::FrameDecoder;
pub use payload::{FromWire, Payload, WirePayload};
pub use types::MessageType;
