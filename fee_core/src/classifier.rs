use crate::{FeeCategory, RawLogEvent, RawTransaction};

/// Map a transaction to its spend category. Never fails.
pub fn classify(tx: &RawTransaction) -> FeeCategory {
    let decoded_name = tx.decoded_name.as_deref().map(str::to_lowercase);

    if let Some(name) = decoded_name.as_deref() {
        if let Some(category) = classify_call_name(name) {
            return category;
        }
    }

    if tx.log_events.iter().any(is_nft_transfer) {
        return FeeCategory::NftTransfer;
    }

    match decoded_name {
        Some(name) if name.contains("transfer") => FeeCategory::Transfer,
        _ => FeeCategory::Other,
    }
}

// `name` is already lowercased; first hit wins
fn classify_call_name(name: &str) -> Option<FeeCategory> {
    if name.contains("swap") {
        Some(FeeCategory::Swap)
    } else if name.contains("approve") {
        Some(FeeCategory::Approve)
    } else if name.contains("mint") {
        Some(FeeCategory::Mint)
    } else if name.contains("addliquidity") {
        Some(FeeCategory::LiquidityAdd)
    } else if name.contains("removeliquidity") {
        Some(FeeCategory::LiquidityRemove)
    } else if name.contains("bridge") || name.contains("depositether") {
        Some(FeeCategory::Bridge)
    } else {
        None
    }
}

// Token transfers from zero-decimal contracts are treated as NFTs
fn is_nft_transfer(log: &RawLogEvent) -> bool {
    let is_transfer = log
        .decoded_name
        .as_deref()
        .map(|name| name.contains("Transfer"))
        .unwrap_or(false);

    is_transfer && log.sender_contract_decimals == Some(0)
}
