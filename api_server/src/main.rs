use axum::{
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use config_manager::{ConfigurationError, SystemConfig};
use job_orchestrator::{OrchestratorError, RefreshDispatcher, ReportCache};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

mod handlers;
mod middleware;
mod types;

use handlers::*;
use types::*;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SystemConfig>,
    pub cache: Arc<ReportCache>,
    pub dispatcher: Arc<RefreshDispatcher>,
}

impl AppState {
    pub fn new(config: SystemConfig, cache: Arc<ReportCache>) -> Self {
        let dispatcher = Arc::new(RefreshDispatcher::new(
            Arc::clone(&cache),
            config.refresh.max_concurrent_refreshes,
        ));
        Self {
            config: Arc::new(config),
            cache,
            dispatcher,
        }
    }
}

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    AllChainsFailed(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::AllChainsFailed { message } => ApiError::AllChainsFailed(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ConfigurationError> for ApiError {
    fn from(err: ConfigurationError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::AllChainsFailed(message) => {
                error!("Wallet processing failed on every chain: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            ApiError::Internal(detail) => {
                error!("Internal server error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            timestamp: chrono::Utc::now(),
        });

        (status, body).into_response()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so it can choose the log format
    let config = SystemConfig::load()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,api_server=debug".into());
    if config.system.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Wallet Fee Tracker API Server...");
    info!("Configuration loaded: {} chains", config.chains.len());

    let store = job_orchestrator::connect_store(&config.store).await?;
    let cache = Arc::new(job_orchestrator::build_report_cache(&config, store)?);
    info!("Report cache initialized (freshness {} min)", config.cache.freshness_minutes);

    let bind_addr = format!("{}:{}", config.api.host, config.api.port);
    let app_state = AppState::new(config, cache);
    let app = create_router(app_state);

    info!("📋 Available endpoints:");
    info!("   • GET /api/process-wallet?address=<0x..>&days=<N|all> - Wallet fee report");
    info!("   • GET /api/cron - Refresh stored wallets (bearer secret)");
    info!("   • GET /health - Health check");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let cron = Router::new()
        .route("/api/cron", get(trigger_refresh))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_cron_secret,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/process-wallet", get(process_wallet))
        .merge(cron)
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(state)
}
