use fee_core::DaysFilter;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::{ReportCache, Result};

/// Counts for one completed refresh batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
}

/// A refresh batch that has been started but not necessarily finished
#[derive(Debug)]
pub struct RefreshBatch {
    pub batch_id: Uuid,
    pub addresses_triggered: usize,
    pub handle: JoinHandle<RefreshSummary>,
}

/// Re-runs the cache for every stored wallet, a bounded number at a time
pub struct RefreshDispatcher {
    cache: Arc<ReportCache>,
    max_concurrent: usize,
}

impl RefreshDispatcher {
    pub fn new(cache: Arc<ReportCache>, max_concurrent: usize) -> Self {
        Self {
            cache,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// List stored wallets and start refreshing them in the background.
    ///
    /// Returns as soon as the batch is spawned.
    pub async fn dispatch(&self) -> Result<RefreshBatch> {
        let addresses = self.cache.list_cached_addresses().await?;
        let batch_id = Uuid::new_v4();
        let addresses_triggered = addresses.len();

        info!(
            "🔄 Refresh batch {} triggered for {} wallets (max {} concurrent)",
            batch_id, addresses_triggered, self.max_concurrent
        );

        let cache = Arc::clone(&self.cache);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        let handle = tokio::spawn(async move {
            let refreshes = addresses.into_iter().map(|address| {
                let cache = Arc::clone(&cache);
                let semaphore = Arc::clone(&semaphore);
                async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            error!("Refresh semaphore closed before {}: {}", address, e);
                            return false;
                        }
                    };

                    match cache.get_or_refresh(&address, DaysFilter::AllTime).await {
                        Ok(fees) => {
                            info!("Refreshed {} (source: {})", address, fees.source.as_str());
                            true
                        }
                        Err(e) => {
                            error!("Refresh failed for {}: {}", address, e);
                            false
                        }
                    }
                }
            });

            let results = join_all(refreshes).await;
            cache.wait_for_pending_writes().await;

            let refreshed = results.iter().filter(|ok| **ok).count();
            let summary = RefreshSummary {
                refreshed,
                failed: results.len() - refreshed,
            };
            info!(
                "Refresh batch {} finished: {} refreshed, {} failed",
                batch_id, summary.refreshed, summary.failed
            );
            summary
        });

        Ok(RefreshBatch {
            batch_id,
            addresses_triggered,
            handle,
        })
    }
}
