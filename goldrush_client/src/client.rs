use crate::{
    error::GoldRushError,
    types::{
        GoldRushConfig, GoldRushErrorBody, GoldRushResponse, GoldRushTransaction,
        TransactionRequest, TransactionsPage, MAX_PAGE_SIZE,
    },
};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use url::Url;

/// GoldRush (Covalent) API client for paginated EVM transaction history
#[derive(Debug, Clone)]
pub struct GoldRushClient {
    client: Client,
    config: GoldRushConfig,
    base_url: Url,
}

impl GoldRushClient {
    /// Create a new GoldRush client with custom configuration
    pub fn with_config(config: GoldRushConfig) -> Result<Self, GoldRushError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        // Url::join replaces the last segment unless the base ends with '/'
        let base_url = Url::parse(&format!("{}/", config.base_url.trim_end_matches('/')))?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    pub fn config(&self) -> &GoldRushConfig {
        &self.config
    }

    /// Fetch every transaction of `wallet_address` on `chain_slug`, page by page.
    ///
    /// Stops when the API reports no further pages or returns an empty page.
    /// Any failed page aborts the whole fetch; there are no retries.
    pub async fn fetch_chain_transactions(
        &self,
        wallet_address: &str,
        chain_slug: &str,
    ) -> Result<Vec<GoldRushTransaction>, GoldRushError> {
        if self.config.api_key.trim().is_empty() {
            return Err(GoldRushError::MissingApiKey);
        }

        let page_size = self.config.page_size.clamp(1, MAX_PAGE_SIZE);
        let started = Instant::now();
        let mut all_items = Vec::new();
        let mut page_number = 0u32;

        loop {
            let request = TransactionRequest {
                wallet_address: wallet_address.to_string(),
                chain_slug: chain_slug.to_string(),
                page_number,
                page_size,
            };

            let page = self.fetch_transactions_page(&request).await?;
            let items = page.items.unwrap_or_default();
            if items.is_empty() {
                debug!(
                    "Empty page {} for {} on {}, stopping",
                    page_number, wallet_address, chain_slug
                );
                break;
            }
            all_items.extend(items);

            let has_more = page.pagination.map(|p| p.has_more).unwrap_or(false);
            if !has_more {
                break;
            }
            page_number += 1;
        }

        info!(
            "✅ Fetched {} transactions for {} on {} ({} pages, {:.2}s)",
            all_items.len(),
            wallet_address,
            chain_slug,
            page_number + 1,
            started.elapsed().as_secs_f64()
        );

        Ok(all_items)
    }

    /// Fetch a single page of transactions
    async fn fetch_transactions_page(
        &self,
        request: &TransactionRequest,
    ) -> Result<TransactionsPage, GoldRushError> {
        let url = self.base_url.join(&format!(
            "{}/address/{}/transactions_v2/",
            request.chain_slug, request.wallet_address
        ))?;

        debug!(
            "📡 GoldRush request: {} page-number={} page-size={}",
            url, request.page_number, request.page_size
        );

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.config.api_key)
            .query(&[
                ("page-number", request.page_number.to_string()),
                ("page-size", request.page_size.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = upstream_error_message(status, &body);
            error!(
                "❌ GoldRush API error - Chain: {}, Status: {}, Message: {}",
                request.chain_slug, status, message
            );
            return Err(GoldRushError::Upstream {
                chain: request.chain_slug.clone(),
                status: status.as_u16(),
                message,
            });
        }

        let response_text = response.text().await?;
        let api_response: GoldRushResponse<TransactionsPage> = serde_json::from_str(&response_text)
            .map_err(|e| GoldRushError::ParseError {
                message: format!(
                    "Failed to parse transactions page {} for {}: {} (response size: {} bytes)",
                    request.page_number,
                    request.chain_slug,
                    e,
                    response_text.len()
                ),
            })?;

        if api_response.error {
            let message = api_response
                .error_message
                .unwrap_or_else(|| "Unknown API error".to_string());
            error!("❌ GoldRush returned error flag for {}: {}", request.chain_slug, message);
            return Err(GoldRushError::Upstream {
                chain: request.chain_slug.clone(),
                status: status.as_u16(),
                message,
            });
        }

        Ok(api_response.data.unwrap_or(TransactionsPage {
            address: None,
            chain_name: None,
            items: None,
            pagination: None,
        }))
    }

    /// Validate wallet address format for EVM chains
    pub fn validate_wallet_address(address: &str) -> Result<(), GoldRushError> {
        let valid = address.len() == 42
            && address.starts_with("0x")
            && address[2..].chars().all(|c| c.is_ascii_hexdigit());

        if valid {
            Ok(())
        } else {
            Err(GoldRushError::InvalidAddress {
                address: address.to_string(),
            })
        }
    }
}

/// Prefer the structured message from the body, then the status reason
fn upstream_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<GoldRushErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error_message)
        .filter(|message| !message.trim().is_empty())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("Error Code: {}", status.as_u16()))
}
