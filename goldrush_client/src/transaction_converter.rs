use crate::{GoldRushClient, GoldRushTransaction, LogEvent};
use async_trait::async_trait;
use fee_core::{FetchResult, RawLogEvent, RawTransaction, TransactionSource};

impl From<GoldRushTransaction> for RawTransaction {
    fn from(tx: GoldRushTransaction) -> Self {
        RawTransaction {
            tx_hash: tx.tx_hash,
            from_address: tx.from_address,
            fees_paid: tx.fees_paid,
            gas_quote_rate: tx.gas_quote_rate,
            decoded_name: tx.decoded.and_then(|decoded| decoded.name),
            log_events: tx
                .log_events
                .unwrap_or_default()
                .into_iter()
                .map(RawLogEvent::from)
                .collect(),
            block_signed_at: tx.block_signed_at,
        }
    }
}

impl From<LogEvent> for RawLogEvent {
    fn from(log: LogEvent) -> Self {
        RawLogEvent {
            decoded_name: log.decoded.and_then(|decoded| decoded.name),
            sender_contract_decimals: log.sender_contract_decimals,
        }
    }
}

#[async_trait]
impl TransactionSource for GoldRushClient {
    async fn fetch_transactions(
        &self,
        address: &str,
        chain_slug: &str,
    ) -> FetchResult<Vec<RawTransaction>> {
        let transactions = self
            .fetch_chain_transactions(address, chain_slug)
            .await
            .map_err(|e| e.into_fetch_error(chain_slug))?;

        Ok(transactions.into_iter().map(RawTransaction::from).collect())
    }
}
