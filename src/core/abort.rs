//! Abort tokens handed out for every running task.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Cancellation handle for one in-flight task.
///
/// Aborting is idempotent and safe after the task has finished.
#[derive(Debug, Clone)]
pub struct AbortToken {
    id: u64,
    token: CancellationToken,
}

impl AbortToken {
    pub fn new() -> Self {
        Self {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn abort(&self) {
        if !self.token.is_cancelled() {
            log::info!("Aborting task #{}", self.id);
        }
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the token is aborted.
    pub async fn aborted(&self) {
        self.token.cancelled().await
    }
}

impl Default for AbortToken {
    fn default() -> Self {
        Self::new()
    }
}
