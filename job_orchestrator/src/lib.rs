use config_manager::{ConfigurationError, StoreBackend, StoreConfig, SystemConfig};
use goldrush_client::{GoldRushClient, GoldRushConfig, GoldRushError};
use persistence_layer::{
    MemoryReportStore, PersistenceError, PostgresReportStore, RedisReportStore, ReportStore,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub mod chain_orchestrator;
pub mod refresh;
pub mod report_cache;

pub use chain_orchestrator::{ChainOrchestrator, OrchestrationOutcome, OrchestratorSettings};
pub use refresh::{RefreshBatch, RefreshDispatcher, RefreshSummary};
pub use report_cache::{ReportCache, WalletFees};

#[derive(Error, Debug, Clone)]
pub enum OrchestratorError {
    #[error("{message}")]
    AllChainsFailed { message: String },
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<PersistenceError> for OrchestratorError {
    fn from(err: PersistenceError) -> Self {
        OrchestratorError::Persistence(err.to_string())
    }
}

impl From<ConfigurationError> for OrchestratorError {
    fn from(err: ConfigurationError) -> Self {
        OrchestratorError::Config(err.to_string())
    }
}

impl From<GoldRushError> for OrchestratorError {
    fn from(err: GoldRushError) -> Self {
        OrchestratorError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Open the configured report store
pub async fn connect_store(config: &StoreConfig) -> Result<Arc<dyn ReportStore>> {
    let store: Arc<dyn ReportStore> = match config.backend {
        StoreBackend::Postgres => {
            let store = PostgresReportStore::new(&config.postgres_url).await?;
            store.ensure_schema().await?;
            info!("Using PostgreSQL report store");
            Arc::new(store)
        }
        StoreBackend::Redis => {
            let store = RedisReportStore::new(&config.redis_url).await?;
            info!("Using Redis report store");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            info!("Using in-memory report store; reports are lost on restart");
            Arc::new(MemoryReportStore::new())
        }
    };

    Ok(store)
}

/// Build the GoldRush-backed orchestrator described by `config`
pub fn build_orchestrator(config: &SystemConfig) -> Result<ChainOrchestrator> {
    let client = GoldRushClient::with_config(GoldRushConfig {
        api_key: config.goldrush.api_key.clone(),
        base_url: config.goldrush.api_base_url.clone(),
        page_size: config.goldrush.page_size,
        timeout_seconds: config.goldrush.request_timeout_seconds,
    })?;

    Ok(ChainOrchestrator::new(
        OrchestratorSettings::from_config(config),
        Arc::new(client),
    ))
}

/// Build the report cache over the GoldRush orchestrator and `store`
pub fn build_report_cache(
    config: &SystemConfig,
    store: Arc<dyn ReportStore>,
) -> Result<ReportCache> {
    let orchestrator = build_orchestrator(config)?;
    Ok(ReportCache::new(
        Arc::new(orchestrator),
        store,
        chrono::Duration::minutes(config.cache.freshness_minutes),
    ))
}
