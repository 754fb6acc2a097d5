//! Per-farm sensor schedule.
//!
//! Each farm gets its own task that wakes on a fixed interval and ticks that
//! farm's cell. The task holds nothing but its own cell, the alert sink and the
//! persistence trigger.

use super::cell::FarmCell;
use super::writer::PersistTrigger;
use crate::notify::NotificationSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Cancellable handle to a farm's ticker task. Aborts the task when dropped.
pub(crate) struct TickerHandle {
    handle: JoinHandle<()>,
}

impl TickerHandle {
    /// Abort the task. Safe to call more than once.
    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start the periodic ticker for one farm.
///
/// Must be called from within a Tokio runtime.
pub(crate) fn spawn_ticker(
    cell: Arc<FarmCell>,
    sink: Arc<dyn NotificationSink>,
    persist: PersistTrigger,
    period: Duration,
) -> TickerHandle {
    let handle = tokio::spawn(async move {
        let mut ticker = interval(period);
        // Skip missed ticks to prevent a burst after a stall
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await; // consume immediate first tick; history is already seeded

        info!(farm_id = %cell.id(), period_ms = period.as_millis() as u64, "Farm ticker started");

        loop {
            ticker.tick().await;

            // Alerts and the dirty mark are delivered inside the cell
            if let Err(e) = cell.tick(sink.as_ref(), &persist) {
                // Farm was removed between wakeups
                debug!(farm_id = %cell.id(), error = %e, "Ticker stopping");
                break;
            }
        }
    });

    TickerHandle { handle }
}
