use chrono::{DateTime, Utc};
use fee_core::{ReportSource, WalletReport};
use job_orchestrator::{RefreshBatch, WalletFees};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

/// Standard API success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Query parameters for `GET /api/process-wallet`
#[derive(Debug, Default, Deserialize)]
pub struct ProcessWalletQuery {
    pub address: Option<String>,
    /// Positive number of days, or `all`
    pub days: Option<String>,
}

/// Wallet fee report plus the source it was served from
#[derive(Debug, Serialize)]
pub struct WalletFeesResponse {
    #[serde(flatten)]
    pub report: WalletReport,
    pub source: ReportSource,
}

impl From<WalletFees> for WalletFeesResponse {
    fn from(fees: WalletFees) -> Self {
        Self {
            report: fees.report,
            source: fees.source,
        }
    }
}

/// Response of `GET /api/cron`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTriggeredResponse {
    pub message: String,
    pub batch_id: Uuid,
    pub addresses_triggered: usize,
}

impl From<&RefreshBatch> for RefreshTriggeredResponse {
    fn from(batch: &RefreshBatch) -> Self {
        Self {
            message: format!(
                "Refresh triggered for {} wallets",
                batch.addresses_triggered
            ),
            batch_id: batch.batch_id,
            addresses_triggered: batch.addresses_triggered,
        }
    }
}
