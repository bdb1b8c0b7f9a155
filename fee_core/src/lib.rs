pub mod classifier;
pub mod processor;
pub mod timeframe;

pub use classifier::classify;
pub use processor::{process_transactions, TOP_TRANSACTIONS_LIMIT};
pub use timeframe::DaysFilter;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors a transaction source can report for a single chain
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Upstream API error (chain: {chain}, status: {status}): {message}")]
    Upstream {
        chain: String,
        status: u16,
        message: String,
    },
    #[error("Fetch for chain {chain} timed out after {seconds}s")]
    Timeout { chain: String, seconds: u64 },
    #[error("Transport error (chain: {chain}): {message}")]
    Transport { chain: String, message: String },
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Source of raw transaction history for one address on one chain
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Fetch the complete history of `address` on the chain identified by `chain_slug`
    async fn fetch_transactions(
        &self,
        address: &str,
        chain_slug: &str,
    ) -> FetchResult<Vec<RawTransaction>>;
}

/// A transaction as reported by the indexing API, reduced to the fields fee
/// aggregation needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub tx_hash: String,

    /// Address that paid for the transaction
    pub from_address: Option<String>,

    /// Fee paid, in wei, as a decimal string
    pub fees_paid: Option<String>,

    /// USD per native token at the time of the transaction
    pub gas_quote_rate: Option<Decimal>,

    /// Name of the decoded top-level call, when the API could decode it
    pub decoded_name: Option<String>,

    #[serde(default)]
    pub log_events: Vec<RawLogEvent>,

    pub block_signed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLogEvent {
    pub decoded_name: Option<String>,
    pub sender_contract_decimals: Option<u32>,
}

/// Coarse spend category derived from decoded call data
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeeCategory {
    Swap,
    Approve,
    Mint,
    #[serde(rename = "Liquidity (Add)")]
    LiquidityAdd,
    #[serde(rename = "Liquidity (Remove)")]
    LiquidityRemove,
    Bridge,
    #[serde(rename = "NFT Trade/Transfer")]
    NftTransfer,
    Transfer,
    Other,
}

impl FeeCategory {
    pub fn label(&self) -> &'static str {
        match self {
            FeeCategory::Swap => "Swap",
            FeeCategory::Approve => "Approve",
            FeeCategory::Mint => "Mint",
            FeeCategory::LiquidityAdd => "Liquidity (Add)",
            FeeCategory::LiquidityRemove => "Liquidity (Remove)",
            FeeCategory::Bridge => "Bridge",
            FeeCategory::NftTransfer => "NFT Trade/Transfer",
            FeeCategory::Transfer => "Transfer",
            FeeCategory::Other => "Other",
        }
    }
}

impl fmt::Display for FeeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fee paid by one transaction, tagged with its category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedFee {
    #[serde(rename = "feeUSD")]
    pub fee_usd: Decimal,
    pub fee_native: Decimal,
    pub tx_hash: String,
    pub timestamp: DateTime<Utc>,
    pub category: FeeCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotals {
    #[serde(rename = "totalFeeUSD")]
    pub total_fee_usd: Decimal,
    pub count: u64,
}

pub type CategoryAggregate = BTreeMap<FeeCategory, CategoryTotals>;

/// Per-chain aggregate before it is tagged with a chain name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSummary {
    #[serde(rename = "totalFeeUSD")]
    pub total_fee_usd: Decimal,
    pub total_fee_native: Decimal,
    pub transaction_count: u64,
    pub categories: CategoryAggregate,
    pub top_transactions: Vec<CategorizedFee>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainReport {
    pub chain_name: String,
    #[serde(flatten)]
    pub summary: ChainSummary,
}

impl ChainReport {
    pub fn new(chain_name: impl Into<String>, summary: ChainSummary) -> Self {
        Self {
            chain_name: chain_name.into(),
            summary,
        }
    }
}

/// Merged fee report for one wallet; this is what the cache persists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletReport {
    pub wallet_address: String,
    #[serde(rename = "chainStats")]
    pub chain_reports: Vec<ChainReport>,
    pub failed_chains: Vec<String>,
    pub top_category_overall: FeeCategory,
    #[serde(rename = "totalFeeUSDAllChains")]
    pub total_fee_usd_all_chains: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl WalletReport {
    /// Merge per-chain reports into a wallet report stamped with `last_updated`
    pub fn from_chain_reports(
        wallet_address: &str,
        chain_reports: Vec<ChainReport>,
        failed_chains: Vec<String>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        let top_category_overall = top_category(&chain_reports);

        Self {
            wallet_address: normalize_address(wallet_address),
            chain_reports,
            failed_chains,
            top_category_overall,
            total_fee_usd_all_chains: Decimal::ZERO,
            last_updated,
        }
        .with_recomputed_total()
    }

    /// A report is fresh while it is younger than `window`. A timestamp in
    /// the future (writer clock skew) counts as stale.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let age = now.signed_duration_since(self.last_updated);
        age >= Duration::zero() && age < window
    }

    /// Sum of the per-chain totals
    pub fn chain_total_fee_usd(&self) -> Decimal {
        self.chain_reports
            .iter()
            .map(|report| report.summary.total_fee_usd)
            .sum()
    }

    /// Reset `total_fee_usd_all_chains` from the chain reports, for records
    /// read back from storage
    pub fn with_recomputed_total(mut self) -> Self {
        self.total_fee_usd_all_chains = self.chain_total_fee_usd();
        self
    }
}

/// Category with the largest fee summed across chains. Equal sums resolve to
/// the category declared first; no categories at all resolves to `Transfer`.
pub fn top_category(chain_reports: &[ChainReport]) -> FeeCategory {
    let mut totals: BTreeMap<FeeCategory, Decimal> = BTreeMap::new();
    for report in chain_reports {
        for (category, aggregate) in &report.summary.categories {
            *totals.entry(*category).or_default() += aggregate.total_fee_usd;
        }
    }

    let mut best: Option<(FeeCategory, Decimal)> = None;
    for (category, total) in totals {
        match best {
            Some((_, best_total)) if total <= best_total => {}
            _ => best = Some((category, total)),
        }
    }

    best.map(|(category, _)| category)
        .unwrap_or(FeeCategory::Transfer)
}

/// Lowercase form used for address comparison and as the cache key
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Where a wallet report came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportSource {
    #[serde(rename = "cache")]
    Cache,
    #[serde(rename = "api")]
    Api,
    #[serde(rename = "api-partial")]
    ApiPartial,
}

impl ReportSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportSource::Cache => "cache",
            ReportSource::Api => "api",
            ReportSource::ApiPartial => "api-partial",
        }
    }
}
