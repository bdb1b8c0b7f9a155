use crate::types::*;
use crate::{ApiError, AppState};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use fee_core::DaysFilter;
use goldrush_client::GoldRushClient;
use tracing::info;

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(SuccessResponse::new(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Aggregate fees for one wallet across all configured chains
pub async fn process_wallet(
    State(state): State<AppState>,
    Query(query): Query<ProcessWalletQuery>,
) -> Result<Json<WalletFeesResponse>, ApiError> {
    let address = query
        .address
        .as_deref()
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Wallet address is required".to_string()))?;

    GoldRushClient::validate_wallet_address(address)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let days = DaysFilter::from_query(query.days.as_deref())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    info!("Processing wallet {} (timeframe: {})", address, days);

    let fees = state.cache.get_or_refresh(address, days).await?;
    Ok(Json(WalletFeesResponse::from(fees)))
}

/// Start a background refresh of every stored wallet
pub async fn trigger_refresh(
    State(state): State<AppState>,
) -> Result<Json<RefreshTriggeredResponse>, ApiError> {
    let batch = state.dispatcher.dispatch().await?;
    let response = RefreshTriggeredResponse::from(&batch);

    info!(
        "Refresh batch {} accepted ({} wallets)",
        batch.batch_id, batch.addresses_triggered
    );

    // The batch keeps running after the handle is dropped
    drop(batch.handle);

    Ok(Json(response))
}
