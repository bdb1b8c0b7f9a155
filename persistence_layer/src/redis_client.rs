use async_trait::async_trait;
use fee_core::{normalize_address, WalletReport};
use redis::{AsyncCommands, Client};
use tracing::debug;

use crate::{ReportStore, Result};

/// Set holding every wallet address with a stored report
pub const WALLET_INDEX_KEY: &str = "wallet_stats_index";

pub fn wallet_stats_key(wallet_address: &str) -> String {
    format!("wallet_stats:{}", normalize_address(wallet_address))
}

/// Decode a stored report; the total is rebuilt from the chain reports
fn decode_report(json: &str) -> Result<WalletReport> {
    let report: WalletReport = serde_json::from_str(json)?;
    Ok(report.with_recomputed_total())
}

/// Redis-backed report store: one JSON value per wallet plus an index set
#[derive(Debug, Clone)]
pub struct RedisReportStore {
    client: Client,
}

impl RedisReportStore {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;

        // Test the connection
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        Ok(Self { client })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl ReportStore for RedisReportStore {
    async fn get_report(&self, wallet_address: &str) -> Result<Option<WalletReport>> {
        let mut conn = self.get_connection().await?;
        let json: Option<String> = conn.get(wallet_stats_key(wallet_address)).await?;

        match json {
            Some(data) => Ok(Some(decode_report(&data)?)),
            None => Ok(None),
        }
    }

    async fn upsert_report(&self, report: &WalletReport) -> Result<()> {
        let address = normalize_address(&report.wallet_address);
        let json = serde_json::to_string(report)?;
        let mut conn = self.get_connection().await?;

        let _: () = redis::pipe()
            .atomic()
            .set(wallet_stats_key(&address), json)
            .ignore()
            .sadd(WALLET_INDEX_KEY, &address)
            .ignore()
            .query_async(&mut conn)
            .await?;

        debug!("Stored fee report for {} in Redis", address);
        Ok(())
    }

    async fn list_wallet_addresses(&self) -> Result<Vec<String>> {
        let mut conn = self.get_connection().await?;
        let mut addresses: Vec<String> = conn.smembers(WALLET_INDEX_KEY).await?;
        addresses.sort();
        Ok(addresses)
    }
}
