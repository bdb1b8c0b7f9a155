use chrono::Utc;
use config_manager::{ChainConfig, SystemConfig};
use fee_core::{
    normalize_address, process_transactions, ChainReport, DaysFilter, FetchError,
    TransactionSource,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::{OrchestratorError, Result};

/// Everything one orchestration run needs to know, passed in explicitly
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Chains in reporting order
    pub chains: Vec<ChainConfig>,
    /// Upper bound for fetching one chain
    pub chain_timeout: Duration,
}

impl OrchestratorSettings {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            chains: config.chains.clone(),
            chain_timeout: Duration::from_secs(config.orchestrator.chain_timeout_seconds),
        }
    }
}

/// Result of fanning out over all configured chains
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestrationOutcome {
    /// Successful chains, in configured order
    pub chain_reports: Vec<ChainReport>,
    /// Names of chains whose fetch failed or timed out
    pub failed_chains: Vec<String>,
}

/// Fetches and processes one wallet on every configured chain concurrently
pub struct ChainOrchestrator {
    settings: OrchestratorSettings,
    source: Arc<dyn TransactionSource>,
}

impl ChainOrchestrator {
    pub fn new(settings: OrchestratorSettings, source: Arc<dyn TransactionSource>) -> Self {
        Self { settings, source }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Run every chain to completion and merge what succeeded.
    ///
    /// One chain failing never cancels the others; only when no chain
    /// succeeds does the whole run fail.
    pub async fn orchestrate(
        &self,
        wallet_address: &str,
        days: DaysFilter,
    ) -> Result<OrchestrationOutcome> {
        if self.settings.chains.is_empty() {
            return Err(OrchestratorError::AllChainsFailed {
                message: "All chains failed to fetch. Last error: no chains configured"
                    .to_string(),
            });
        }

        let address = normalize_address(wallet_address);
        let cutoff = days.cutoff(Utc::now());
        let started = Instant::now();

        info!(
            "🚀 Aggregating fees for {} across {} chains (timeframe: {})",
            address,
            self.settings.chains.len(),
            days
        );

        let futures = self
            .settings
            .chains
            .iter()
            .map(|chain| self.process_chain(&address, chain, cutoff));
        let results = join_all(futures).await;

        let mut chain_reports = Vec::new();
        let mut failed_chains = Vec::new();
        let mut first_error: Option<FetchError> = None;

        for (chain, result) in self.settings.chains.iter().zip(results) {
            match result {
                Ok(report) => chain_reports.push(report),
                Err(e) => {
                    warn!("Chain {} failed for {}: {}", chain.name, address, e);
                    failed_chains.push(chain.name.clone());
                    first_error.get_or_insert(e);
                }
            }
        }

        if chain_reports.is_empty() {
            let last_error = first_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(OrchestratorError::AllChainsFailed {
                message: format!("All chains failed to fetch. Last error: {}", last_error),
            });
        }

        info!(
            "✅ Aggregated {} for {} chains ({} failed) in {:.2}s",
            address,
            chain_reports.len(),
            failed_chains.len(),
            started.elapsed().as_secs_f64()
        );

        Ok(OrchestrationOutcome {
            chain_reports,
            failed_chains,
        })
    }

    async fn process_chain(
        &self,
        address: &str,
        chain: &ChainConfig,
        cutoff: Option<chrono::DateTime<Utc>>,
    ) -> std::result::Result<ChainReport, FetchError> {
        let fetch = self.source.fetch_transactions(address, &chain.slug);
        let items = match tokio::time::timeout(self.settings.chain_timeout, fetch).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(FetchError::Timeout {
                    chain: chain.name.clone(),
                    seconds: self.settings.chain_timeout.as_secs(),
                })
            }
        };

        let summary = process_transactions(&items, address, cutoff);
        debug!(
            "{}: {} transactions, ${} in fees",
            chain.name, summary.transaction_count, summary.total_fee_usd
        );

        Ok(ChainReport::new(chain.name.clone(), summary))
    }
}
