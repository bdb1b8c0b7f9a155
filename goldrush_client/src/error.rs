use fee_core::FetchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GoldRushError {
    #[error("GoldRush API key is not configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid GoldRush URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("GoldRush API error (chain: {chain}): {message}")]
    Upstream {
        chain: String,
        status: u16,
        message: String,
    },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Invalid wallet address: {address}")]
    InvalidAddress { address: String },
}

impl GoldRushError {
    /// Convert into the chain-scoped error the aggregation pipeline understands
    pub fn into_fetch_error(self, chain: &str) -> FetchError {
        match self {
            GoldRushError::MissingApiKey => FetchError::Configuration(self.to_string()),
            GoldRushError::Url(e) => {
                FetchError::Configuration(format!("Invalid GoldRush URL: {}", e))
            }
            GoldRushError::Upstream {
                chain,
                status,
                message,
            } => FetchError::Upstream {
                chain,
                status,
                message,
            },
            other => FetchError::Transport {
                chain: chain.to_string(),
                message: other.to_string(),
            },
        }
    }
}
