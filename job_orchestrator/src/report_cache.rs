use chrono::{Duration, Utc};
use fee_core::{normalize_address, DaysFilter, ReportSource, WalletReport};
use persistence_layer::ReportStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::{ChainOrchestrator, Result};

/// A wallet report together with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct WalletFees {
    pub report: WalletReport,
    pub source: ReportSource,
}

/// Read-through cache in front of the orchestrator.
///
/// Only all-time reports are read from or written to the store. Writes run
/// in background tasks so callers never wait on the store.
pub struct ReportCache {
    orchestrator: Arc<ChainOrchestrator>,
    store: Arc<dyn ReportStore>,
    freshness: Duration,
    pending_writes: Mutex<JoinSet<()>>,
}

impl ReportCache {
    pub fn new(
        orchestrator: Arc<ChainOrchestrator>,
        store: Arc<dyn ReportStore>,
        freshness: Duration,
    ) -> Self {
        Self {
            orchestrator,
            store,
            freshness,
            pending_writes: Mutex::new(JoinSet::new()),
        }
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    /// Serve a fresh stored report when there is one, otherwise aggregate live
    pub async fn get_or_refresh(
        &self,
        wallet_address: &str,
        days: DaysFilter,
    ) -> Result<WalletFees> {
        let address = normalize_address(wallet_address);

        if days.is_all_time() {
            match self.store.get_report(&address).await {
                Ok(Some(report)) if report.is_fresh_at(Utc::now(), self.freshness) => {
                    info!("📦 Serving cached fee report for {}", address);
                    return Ok(WalletFees {
                        report,
                        source: ReportSource::Cache,
                    });
                }
                Ok(Some(report)) => {
                    debug!(
                        "Cached report for {} is stale (last updated {})",
                        address, report.last_updated
                    );
                }
                Ok(None) => debug!("No cached report for {}", address),
                Err(e) => warn!(
                    "Failed to read cached report for {}, fetching live: {}",
                    address, e
                ),
            }
        }

        let outcome = self.orchestrator.orchestrate(&address, days).await?;
        let report = WalletReport::from_chain_reports(
            &address,
            outcome.chain_reports,
            outcome.failed_chains,
            Utc::now(),
        );

        let source = if report.failed_chains.is_empty() {
            ReportSource::Api
        } else {
            ReportSource::ApiPartial
        };

        if days.is_all_time() {
            self.schedule_write(report.clone()).await;
        }

        Ok(WalletFees { report, source })
    }

    /// Every wallet with a stored report
    pub async fn list_cached_addresses(&self) -> Result<Vec<String>> {
        Ok(self.store.list_wallet_addresses().await?)
    }

    /// Wait until every write started so far has finished
    pub async fn wait_for_pending_writes(&self) {
        let mut writes = std::mem::take(&mut *self.pending_writes.lock().await);
        while let Some(result) = writes.join_next().await {
            if let Err(e) = result {
                error!("Report write task panicked: {}", e);
            }
        }
    }

    async fn schedule_write(&self, report: WalletReport) {
        let store = Arc::clone(&self.store);
        let mut writes = self.pending_writes.lock().await;

        // Reap writes that already finished
        while writes.try_join_next().is_some() {}

        writes.spawn(async move {
            match store.upsert_report(&report).await {
                Ok(()) => debug!("Cached fee report for {}", report.wallet_address),
                Err(e) => error!(
                    "Failed to cache fee report for {}: {}",
                    report.wallet_address, e
                ),
            }
        });
    }
}
