//! Search engine backends.
//!
//! The task engine is generic over `SearchEngine`, so another search tool can
//! be plugged in by implementing the same four capabilities.

use crate::core::TaskReporter;
use crate::error::EngineError;
use crate::types::{ChangedFile, SearchInputs};
use async_trait::async_trait;

pub mod ripgrep;

pub use ripgrep::RipgrepEngine;

/// Answer from the confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
    Cancel,
}

/// Yes/cancel prompt used before destructive operations.
/// Anything other than `Yes` cancels.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &str) -> Confirmation;
}

/// Always gives the same answer. Used for `--yes` and in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirm(pub Confirmation);

#[async_trait]
impl Confirm for FixedConfirm {
    async fn confirm(&self, prompt: &str) -> Confirmation {
        log::debug!("Auto-answering '{}' with {:?}", prompt, self.0);
        self.0
    }
}

/// The capabilities every engine provides.
///
/// Operations stream matches and progress through the reporter and return
/// how they ended; `Err(EngineError::Aborted)` means the reporter's abort
/// token fired.
#[async_trait]
pub trait SearchEngine: Send + Sync + 'static {
    /// Engine name, e.g. for logs
    fn name(&self) -> &'static str;

    async fn search(
        &self,
        inputs: &SearchInputs,
        reporter: &TaskReporter,
    ) -> Result<(), EngineError>;

    /// Enumerate candidate files, then rewrite them with the replacement
    /// applied. Files rewritten before an abort stay rewritten.
    async fn replace(
        &self,
        inputs: &SearchInputs,
        confirm: &dyn Confirm,
        reporter: &TaskReporter,
    ) -> Result<(), EngineError>;

    /// Write lines edited after a replace back to disk.
    async fn sync(
        &self,
        inputs: &SearchInputs,
        changed: &[ChangedFile],
        reporter: &TaskReporter,
    ) -> Result<(), EngineError>;

    /// Inputs to use when a search is started from a text selection.
    fn prefill_from_selection(&self, inputs: &SearchInputs, selection: &str) -> SearchInputs;
}
