use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Page size the GoldRush transactions endpoint accepts at most
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Configuration for GoldRush API client
#[derive(Debug, Clone)]
pub struct GoldRushConfig {
    pub api_key: String,
    pub base_url: String,
    pub page_size: u32,
    pub timeout_seconds: u64,
}

impl Default for GoldRushConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.covalenthq.com/v1".to_string(),
            page_size: MAX_PAGE_SIZE,
            timeout_seconds: 120,
        }
    }
}

/// GoldRush API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldRushResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub error: bool,
    pub error_message: Option<String>,
    pub error_code: Option<u32>,
}

/// Body GoldRush sends alongside non-success statuses
#[derive(Debug, Clone, Deserialize)]
pub struct GoldRushErrorBody {
    pub error_message: Option<String>,
}

/// One page of the transactions_v2 endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionsPage {
    pub address: Option<String>,
    pub chain_name: Option<String>,
    pub items: Option<Vec<GoldRushTransaction>>,
    pub pagination: Option<PaginationInfo>,
}

/// Pagination info for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationInfo {
    #[serde(default)]
    pub has_more: bool,
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
    pub total_count: Option<u64>,
}

/// Transaction as returned by GoldRush; only fee-relevant fields are typed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldRushTransaction {
    pub block_signed_at: DateTime<Utc>,
    pub block_height: Option<u64>,
    pub tx_hash: String,
    pub successful: Option<bool>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    /// Wei amount; GoldRush usually sends a string but older responses use numbers
    #[serde(default, deserialize_with = "string_or_number")]
    pub fees_paid: Option<String>,
    pub gas_quote: Option<Decimal>,
    pub gas_quote_rate: Option<Decimal>,
    pub decoded: Option<DecodedCall>,
    pub log_events: Option<Vec<LogEvent>>,
}

/// Decoded top-level call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedCall {
    pub name: Option<String>,
    pub signature: Option<String>,
}

/// Log event within a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub sender_address: Option<String>,
    pub sender_name: Option<String>,
    pub sender_contract_decimals: Option<u32>,
    pub sender_contract_ticker_symbol: Option<String>,
    pub decoded: Option<DecodedLogEvent>,
}

/// Decoded log event data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedLogEvent {
    pub name: Option<String>,
    pub signature: Option<String>,
}

/// Request parameters for fetching one page of transactions
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub wallet_address: String,
    pub chain_slug: String,
    pub page_number: u32,
    pub page_size: u32,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
