//! Concrete payload types carried inside data messages.

pub mod task_progress;

pub use task_progress::{FileBundle, ProgressState, TaskKey, TaskProgress};
