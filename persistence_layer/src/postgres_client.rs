use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fee_core::{normalize_address, ChainReport, FeeCategory, WalletReport};
use rust_decimal::prelude::ToPrimitive;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{PersistenceError, ReportStore, Result};

const CREATE_WALLET_STATS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS wallet_stats (
        wallet_address TEXT PRIMARY KEY,
        chain_stats_all_time JSONB NOT NULL,
        failed_chains JSONB NOT NULL DEFAULT '[]'::jsonb,
        total_fee DOUBLE PRECISION NOT NULL DEFAULT 0,
        top_category TEXT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
"#;

/// PostgreSQL-backed report store over the `wallet_stats` table
#[derive(Debug, Clone)]
pub struct PostgresReportStore {
    pool: PgPool,
}

impl PostgresReportStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30)) // How long to wait for a connection
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await
            .map_err(|e| {
                PersistenceError::PoolCreation(format!("PostgreSQL connection error: {}", e))
            })?;

        info!("PostgreSQL pool initialized: max_connections=20, min_connections=2");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `wallet_stats` table when it does not exist yet
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_WALLET_STATS_TABLE)
            .execute(&self.pool)
            .await?;
        debug!("wallet_stats schema ensured");
        Ok(())
    }

    fn row_to_report(row: PgRow) -> Result<WalletReport> {
        let wallet_address: String = row.try_get("wallet_address")?;
        let chain_stats: String = row.try_get("chain_stats")?;
        let failed_chains: String = row.try_get("failed")?;
        let top_category: String = row.try_get("top_category")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

        let chain_reports: Vec<ChainReport> = serde_json::from_str(&chain_stats)?;

        // The total_fee column is only for queries; the chain reports are authoritative
        Ok(WalletReport {
            wallet_address,
            chain_reports,
            failed_chains: serde_json::from_str(&failed_chains)?,
            top_category_overall: parse_category(&top_category)?,
            total_fee_usd_all_chains: Default::default(),
            last_updated: updated_at,
        }
        .with_recomputed_total())
    }
}

/// Value written to the `total_fee` column
fn total_fee_column(report: &WalletReport) -> f64 {
    match report.total_fee_usd_all_chains.to_f64() {
        Some(total) => total,
        None => {
            warn!(
                "Total fee {} for {} does not fit in f64, storing 0",
                report.total_fee_usd_all_chains, report.wallet_address
            );
            0.0
        }
    }
}

/// Categories are stored by their display label
fn parse_category(label: &str) -> Result<FeeCategory> {
    Ok(serde_json::from_value(serde_json::Value::String(
        label.to_string(),
    ))?)
}

#[async_trait]
impl ReportStore for PostgresReportStore {
    async fn get_report(&self, wallet_address: &str) -> Result<Option<WalletReport>> {
        let row = sqlx::query(
            r#"
            SELECT wallet_address, chain_stats_all_time::text AS chain_stats,
                   failed_chains::text AS failed, top_category, updated_at
            FROM wallet_stats
            WHERE wallet_address = $1
            "#,
        )
        .bind(normalize_address(wallet_address))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_report).transpose()
    }

    async fn upsert_report(&self, report: &WalletReport) -> Result<()> {
        let chain_stats_json = serde_json::to_string(&report.chain_reports)?;
        let failed_chains_json = serde_json::to_string(&report.failed_chains)?;
        let total_fee = total_fee_column(report);

        sqlx::query(
            r#"
            INSERT INTO wallet_stats
            (wallet_address, chain_stats_all_time, failed_chains, total_fee,
             top_category, updated_at)
            VALUES ($1, $2::jsonb, $3::jsonb, $4, $5, $6)
            ON CONFLICT (wallet_address)
            DO UPDATE SET
                chain_stats_all_time = EXCLUDED.chain_stats_all_time,
                failed_chains = EXCLUDED.failed_chains,
                total_fee = EXCLUDED.total_fee,
                top_category = EXCLUDED.top_category,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(normalize_address(&report.wallet_address))
        .bind(chain_stats_json)
        .bind(failed_chains_json)
        .bind(total_fee)
        .bind(report.top_category_overall.label())
        .bind(report.last_updated)
        .execute(&self.pool)
        .await?;

        debug!(
            "Upserted wallet_stats for {} ({} chains, total ${})",
            report.wallet_address,
            report.chain_reports.len(),
            report.total_fee_usd_all_chains
        );
        Ok(())
    }

    async fn list_wallet_addresses(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT wallet_address FROM wallet_stats ORDER BY wallet_address")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| row.try_get::<String, _>("wallet_address").map_err(PersistenceError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fee_core::ChainSummary;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_category_labels() {
        assert_eq!(parse_category("Swap").unwrap(), FeeCategory::Swap);
        assert_eq!(
            parse_category("Liquidity (Remove)").unwrap(),
            FeeCategory::LiquidityRemove
        );
        assert!(parse_category("Staking").is_err());
    }

    #[test]
    fn test_total_fee_column() {
        let summary = ChainSummary {
            total_fee_usd: dec!(12.375),
            ..ChainSummary::default()
        };
        let report = WalletReport::from_chain_reports(
            "0xabc",
            vec![ChainReport::new("Ethereum", summary)],
            vec![],
            Utc::now(),
        );
        assert_eq!(total_fee_column(&report), 12.375);

        let empty = WalletReport::from_chain_reports("0xabc", vec![], vec![], Utc::now());
        assert_eq!(total_fee_column(&empty), 0.0);
    }

    #[tokio::test]
    async fn test_postgres_round_trip() {
        // Requires a running PostgreSQL instance; skipped unless DATABASE_URL is set
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            return;
        };

        let store = PostgresReportStore::new(&database_url).await.unwrap();
        store.ensure_schema().await.unwrap();

        let summary = ChainSummary {
            total_fee_usd: dec!(4.5),
            ..ChainSummary::default()
        };
        let report = WalletReport::from_chain_reports(
            "0xPgRoundTrip",
            vec![ChainReport::new("Base", summary)],
            vec!["Polygon".to_string()],
            Utc::now(),
        );
        store.upsert_report(&report).await.unwrap();

        let stored = store.get_report("0xpgroundtrip").await.unwrap().unwrap();
        assert_eq!(stored.total_fee_usd_all_chains, dec!(4.5));
        assert_eq!(stored.failed_chains, vec!["Polygon".to_string()]);
        assert!(store
            .list_wallet_addresses()
            .await
            .unwrap()
            .contains(&"0xpgroundtrip".to_string()));
    }
}
