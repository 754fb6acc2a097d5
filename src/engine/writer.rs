//! Deferred persistence.
//!
//! State changes only mark the registry dirty; a background task coalesces
//! bursts of changes into a single save and runs the blocking store call off
//! the async workers.

use super::registry::Shared;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Cheap, cloneable "something changed" signal
#[derive(Clone, Default)]
pub(crate) struct PersistTrigger {
    notify: Arc<Notify>,
}

impl PersistTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never blocks; repeated calls before the writer wakes collapse into one
    pub fn mark_dirty(&self) {
        self.notify.notify_one();
    }

    async fn dirty(&self) {
        self.notify.notified().await;
    }
}

/// Run the background writer until aborted.
pub(crate) fn spawn_writer(shared: Arc<Shared>, trigger: PersistTrigger) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            trigger.dirty().await;

            let shared = Arc::clone(&shared);
            match tokio::task::spawn_blocking(move || shared.save()).await {
                Ok(Ok(count)) => debug!(farms = count, "Farm state persisted"),
                Ok(Err(e)) => error!(error = %e, "Failed to persist farm state"),
                Err(e) => error!(error = %e, "Persistence task panicked"),
            }
        }
    })
}
