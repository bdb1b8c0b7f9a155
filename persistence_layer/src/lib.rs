use async_trait::async_trait;
use fee_core::{normalize_address, WalletReport};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

pub mod postgres_client;
pub mod redis_client;

pub use postgres_client::PostgresReportStore;
pub use redis_client::RedisReportStore;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Redis connection error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Connection pool creation failed: {0}")]
    PoolCreation(String),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Keyed storage for the latest all-time report of each wallet.
///
/// Keys are lowercased wallet addresses. Upserts replace the whole record
/// (last write wins).
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn get_report(&self, wallet_address: &str) -> Result<Option<WalletReport>>;

    async fn upsert_report(&self, report: &WalletReport) -> Result<()>;

    /// Every wallet address that has a stored report
    async fn list_wallet_addresses(&self) -> Result<Vec<String>>;
}

/// Process-local store, used by tests and the `memory` backend
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: RwLock<HashMap<String, WalletReport>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reports.read().await.is_empty()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn get_report(&self, wallet_address: &str) -> Result<Option<WalletReport>> {
        let key = normalize_address(wallet_address);
        Ok(self.reports.read().await.get(&key).cloned())
    }

    async fn upsert_report(&self, report: &WalletReport) -> Result<()> {
        let key = normalize_address(&report.wallet_address);
        debug!("Storing fee report for {} in memory", key);
        self.reports.write().await.insert(key, report.clone());
        Ok(())
    }

    async fn list_wallet_addresses(&self) -> Result<Vec<String>> {
        let mut addresses: Vec<String> = self.reports.read().await.keys().cloned().collect();
        addresses.sort();
        Ok(addresses)
    }
}
