//! # farm-core
//!
//! Shared library for the render farm control plane: the binary message
//! envelope, the message type catalog, and the task progress payload that
//! render nodes send while they work.
//!
//! This crate is used by the server and by anything that talks to it. It has
//! no dependencies on sockets, databases, or an async runtime.
//!
//! # Architecture overview
//!
//! Every message on the wire is a 12-byte header (version, type, int field;
//! all big-endian) optionally followed by a payload. Types below
//! [`MessageType::DATA_BOUNDARY`] are *control* messages whose entire content
//! is the header's int field. Types at or above it are *data* messages whose
//! int field is the payload length.
//!
//! - **`protocol`** – The growable [`WireBuffer`], the [`MessageType`]
//!   catalog, the [`Message`] envelope and its validation of received
//!   frames, and the [`FrameDecoder`] that cuts a byte stream into frames.
//!
//! - **`msgclasses`** – Concrete payloads. [`TaskProgress`] carries a
//!   running task's state, an optional block of activity data, and a bundle
//!   of named files.

pub mod msgclasses;
pub mod protocol;

pub use msgclasses::{FileBundle, ProgressState, TaskKey, TaskProgress};
pub use protocol::{
    FrameDecoder, FromWire, Message, MessageState, MessageType, Payload, WireBuffer, WireError,
    WirePayload, PROTOCOL_VERSION,
};
