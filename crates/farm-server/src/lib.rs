//! farm-server library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! - **`queue`**    – Generic single-worker FIFO queue with reconnect and alarm handling.
//! - **`db`**       – Binds the queue to a database: statement batches and records.
//! - **`spool`**    – File-backed database connection.
//! - **`monitor`**  – Sends queue alarms to monitors.
//! - **`dispatch`** – Routes received messages and builds replies.
//! - **`config`**   – TOML configuration.

pub mod config;
pub mod db;
pub mod dispatch;
pub mod monitor;
pub mod queue;
pub mod spool;
