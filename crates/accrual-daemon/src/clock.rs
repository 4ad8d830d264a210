//! Block clock.
//!
//! The daemon has no chain beneath it, so block height is synthesized from
//! wall-clock time: one block every `block_interval_ms`. Height never moves
//! backwards, including across restarts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info};

use accrual_types::BlockHeight;

/// Shared, monotonically increasing block height.
#[derive(Clone, Debug)]
pub struct BlockClock {
    height: Arc<AtomicU64>,
    interval: Duration,
}

impl BlockClock {
    /// Clock starting at `start` and ticking every `interval_ms` milliseconds.
    pub fn new(start: BlockHeight, interval_ms: u64) -> Self {
        Self {
            height: Arc::new(AtomicU64::new(start)),
            interval: Duration::from_millis(interval_ms.max(1)),
        }
    }

    /// Current block height.
    pub fn current(&self) -> BlockHeight {
        self.height.load(Ordering::SeqCst)
    }

    /// Advance by `blocks`. Returns the new height.
    pub fn advance(&self, blocks: u64) -> BlockHeight {
        let prev = self
            .height
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| {
                Some(h.saturating_add(blocks))
            })
            .unwrap_or_else(|h| h);
        prev.saturating_add(blocks)
    }

    /// Tick until a shutdown signal arrives.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        // First tick completes immediately.
        ticker.tick().await;
        info!(
            start = self.current(),
            interval_ms = self.interval.as_millis() as u64,
            "block clock running"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let height = self.advance(1);
                    debug!(height, "block");
                }
                _ = shutdown_rx.recv() => {
                    info!(height = self.current(), "block clock stopped");
                    break;
                }
            }
        }
    }
}

/// Current Unix timestamp in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
