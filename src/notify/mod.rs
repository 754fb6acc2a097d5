//! Alert delivery.
//!
//! The registry hands every critical alert to a `NotificationSink`. Delivery is
//! fire-and-forget: sinks must not block and never report failure back.

use crate::control::Alert;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::warn;

/// Receiver of alerts produced on the tick path.
///
/// `notify` is called while the originating farm's state is locked: it must
/// return promptly and must not call back into the registry.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, alert: &Alert);
}

/// Logs alerts through `tracing`
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, alert: &Alert) {
        warn!(
            farm_id = %alert.farm_id,
            farm = %alert.farm_name,
            temperature = alert.temperature,
            range = %alert.threshold_range,
            kind = ?alert.kind,
            "{}",
            alert.message()
        );
    }
}

/// Fans alerts out to any number of subscribers over a broadcast channel
pub struct BroadcastNotifier {
    alert_tx: broadcast::Sender<Alert>,
    /// Total alerts published (lifetime counter)
    published: AtomicU64,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (alert_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            alert_tx,
            published: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.alert_tx.subscribe()
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl NotificationSink for BroadcastNotifier {
    fn notify(&self, alert: &Alert) {
        self.published.fetch_add(1, Ordering::Relaxed);
        // No subscribers is fine
        let _ = self.alert_tx.send(alert.clone());
    }
}
