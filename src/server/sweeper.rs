use crate::infra_memory::MemorySingleUseLedger;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Periodically drops expired entries from the in-process ledger. Redis
/// expires keys on its own and needs nothing like this.
pub struct LedgerSweeper {
    ledger: Arc<MemorySingleUseLedger>,
    interval: Duration,
    cancellation_token: CancellationToken,
}

impl LedgerSweeper {
    pub fn new(
        ledger: Arc<MemorySingleUseLedger>,
        interval: Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            ledger,
            interval,
            cancellation_token,
        }
    }

    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("ledger sweeper shutting down...");
                    break;
                }
                _ = ticker.tick() => {
                    let purged = self.ledger.purge_expired();
                    if purged > 0 {
                        tracing::debug!(
                            purged,
                            remaining = self.ledger.len(),
                            "purged expired ledger entries"
                        );
                    }
                }
            }
        }
    }
}
