//! rgfar - interactive search and replace driven by ripgrep
//!
//! The task engine builds ripgrep invocations, streams and parses their
//! output, rewrites matched files and syncs later edits back to disk, with
//! progress reporting and cancellation throughout.

pub mod backend;
pub mod config;
pub mod core;
pub mod error;
pub mod task_engine;
pub mod types;

// Public API
pub use crate::backend::{Confirm, Confirmation, FixedConfirm, RipgrepEngine, SearchEngine};
pub use crate::config::{ColorScheme, EngineConfig, RipgrepConfig};
pub use crate::core::{AbortToken, ProcessRunner, TaskEvent, TokioProcessRunner};
pub use crate::error::EngineError;
pub use crate::task_engine::{TaskEngine, TaskHandle, TaskSummary};
pub use crate::types::*;
