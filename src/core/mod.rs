//! Core plumbing shared by every engine: abort tokens, the task event
//! channel, the external process runner and in-place file access.

pub mod abort;
pub mod command;
pub mod file_io;
pub mod message;

// Re-exports for convenience
pub use abort::AbortToken;
pub use command::{ProcessRunner, TokioProcessRunner};
pub use message::{Message, TaskEvent, TaskReporter};
