//! [`DerivationPool`]: bounds how many Argon2id derivations run at once.
//!
//! Each derivation reserves `KdfParams::memory_kib` of working memory and
//! pins a core, so unbounded fan-out across fields can exhaust the host.
//! Work submitted through the pool waits for a semaphore permit, then runs on
//! Tokio's blocking thread pool so it never stalls the async executor.

use std::sync::Arc;

use common::FieldError;
use tokio::sync::Semaphore;

/// Semaphore-bounded runner for derivation-bearing closures.
///
/// Cheap to clone; clones share the same permits.
#[derive(Clone, Debug)]
pub struct DerivationPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl DerivationPool {
    /// Create a pool allowing `size` concurrent derivations (at least one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Maximum number of concurrent derivations.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `task` on the blocking pool once a permit is free.
    ///
    /// The permit is held until `task` returns.
    ///
    /// # Errors
    ///
    /// Returns whatever `task` returns, or [`FieldError::Internal`] if the
    /// task panicked or was cancelled.
    pub async fn run<T, F>(&self, task: F) -> Result<T, FieldError>
    where
        F: FnOnce() -> Result<T, FieldError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| FieldError::Internal("derivation pool closed".into()))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            task()
        })
        .await
        .map_err(|e| FieldError::Internal(format!("derivation task failed: {e}")))?
    }
}
