//! Process-wide bounded pool for blocking work.
//!
//! The request dispatcher must never block: file writes, PDF extraction,
//! embedding and index work are handed to `spawn_blocking`, and a semaphore
//! caps how many of those jobs run at once. Waiting for a permit is itself
//! an await point, so queued jobs cost the dispatcher nothing.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Clone, Debug)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidConfig("worker pool size must be greater than zero".to_string()));
        }
        Ok(Self { permits: Arc::new(Semaphore::new(size)), size })
    }

    pub fn size(&self) -> usize { self.size }

    /// Jobs currently allowed to start without waiting.
    pub fn available(&self) -> usize { self.permits.available_permits() }

    /// Run `job` on a blocking thread once a permit is free and resume the
    /// caller with its result. Panics inside `job` surface as `Error::Worker`.
    pub async fn run<F, T>(&self, label: &'static str, job: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| Error::Worker(format!("{label}: {e}")))?;
        let queued = Instant::now();
        let out = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| Error::Worker(format!("{label}: {e}")))?;
        debug!(job = label, elapsed_ms = queued.elapsed().as_millis() as u64, "worker job finished");
        Ok(out)
    }
}
