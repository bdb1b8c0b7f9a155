use crate::{classify, normalize_address, CategorizedFee, ChainSummary, RawTransaction};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

/// Maximum number of entries kept in `ChainSummary::top_transactions`
pub const TOP_TRANSACTIONS_LIMIT: usize = 10;

/// Native tokens on every supported chain use 18 decimals
const NATIVE_DECIMALS: u32 = 18;

/// Aggregate one chain's transactions for `wallet_address`.
///
/// Transactions signed at or before `cutoff` are dropped. Fees only count when
/// the wallet is the sender, but every remaining transaction is classified and
/// counted in its category, so category counts always sum to
/// `transaction_count`.
pub fn process_transactions(
    items: &[RawTransaction],
    wallet_address: &str,
    cutoff: Option<DateTime<Utc>>,
) -> ChainSummary {
    let wallet = normalize_address(wallet_address);
    let mut summary = ChainSummary::default();
    let mut candidates: Vec<CategorizedFee> = Vec::new();

    for tx in items {
        if let Some(cutoff) = cutoff {
            if tx.block_signed_at <= cutoff {
                continue;
            }
        }

        let (fee_native, fee_usd) = if is_sender(tx, &wallet) {
            compute_fee(tx)
        } else {
            (Decimal::ZERO, Decimal::ZERO)
        };

        let category = classify(tx);
        let totals = summary.categories.entry(category).or_default();
        totals.count += 1;
        totals.total_fee_usd += fee_usd;

        summary.transaction_count += 1;
        summary.total_fee_native += fee_native;
        summary.total_fee_usd += fee_usd;

        if fee_usd > Decimal::ZERO {
            candidates.push(CategorizedFee {
                fee_usd,
                fee_native,
                tx_hash: tx.tx_hash.clone(),
                timestamp: tx.block_signed_at,
                category,
            });
        }
    }

    // Stable sort keeps upstream order among equal fees
    candidates.sort_by(|a, b| b.fee_usd.cmp(&a.fee_usd));
    candidates.truncate(TOP_TRANSACTIONS_LIMIT);
    summary.top_transactions = candidates;

    debug!(
        "Processed {} of {} transactions for {}: ${} in fees",
        summary.transaction_count,
        items.len(),
        wallet,
        summary.total_fee_usd
    );

    summary
}

fn is_sender(tx: &RawTransaction, wallet: &str) -> bool {
    tx.from_address
        .as_deref()
        .map(|from| from.trim().eq_ignore_ascii_case(wallet))
        .unwrap_or(false)
}

/// Returns `(fee_native, fee_usd)`; zero whenever an input is missing or unusable
fn compute_fee(tx: &RawTransaction) -> (Decimal, Decimal) {
    let Some(fee_native) = tx.fees_paid.as_deref().and_then(wei_to_native) else {
        return (Decimal::ZERO, Decimal::ZERO);
    };

    let fee_usd = match tx.gas_quote_rate {
        Some(rate) if rate > Decimal::ZERO => {
            fee_native.checked_mul(rate).unwrap_or(Decimal::ZERO)
        }
        _ => Decimal::ZERO,
    };

    (fee_native, fee_usd)
}

fn wei_to_native(raw: &str) -> Option<Decimal> {
    let wei: i128 = raw.trim().parse().ok()?;
    if wei < 0 {
        return None;
    }
    Decimal::try_from_i128_with_scale(wei, NATIVE_DECIMALS)
        .ok()
        .map(|value| value.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeeCategory;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    const WALLET: &str = "0xAbC0000000000000000000000000000000000001";

    fn tx(hash: &str, from: Option<&str>, wei: &str, rate: Option<Decimal>) -> RawTransaction {
        RawTransaction {
            tx_hash: hash.to_string(),
            from_address: from.map(str::to_string),
            fees_paid: Some(wei.to_string()),
            gas_quote_rate: rate,
            decoded_name: Some("swapExactETHForTokens".to_string()),
            log_events: vec![],
            block_signed_at: Utc::now(),
        }
    }

    #[test]
    fn test_sender_fee_conversion() {
        let items = vec![tx(
            "0x1",
            Some("0xabc0000000000000000000000000000000000001"),
            "1000000000000000",
            Some(dec!(2000)),
        )];

        let summary = process_transactions(&items, WALLET, None);
        assert_eq!(summary.total_fee_native, dec!(0.001));
        assert_eq!(summary.total_fee_usd, dec!(2));
        assert_eq!(summary.top_transactions.len(), 1);
        assert_eq!(summary.top_transactions[0].category, FeeCategory::Swap);
    }

    #[test]
    fn test_non_sender_contributes_zero_but_is_counted() {
        let items = vec![
            tx("0x1", Some("0xdeadbeef"), "1000000000000000", Some(dec!(2000))),
            tx("0x2", None, "1000000000000000", Some(dec!(2000))),
        ];

        let summary = process_transactions(&items, WALLET, None);
        assert_eq!(summary.total_fee_usd, Decimal::ZERO);
        assert_eq!(summary.total_fee_native, Decimal::ZERO);
        assert!(summary.top_transactions.is_empty());
        assert_eq!(summary.transaction_count, 2);

        let swap = &summary.categories[&FeeCategory::Swap];
        assert_eq!(swap.count, 2);
        assert_eq!(swap.total_fee_usd, Decimal::ZERO);
    }

    #[test]
    fn test_missing_or_invalid_fee_inputs_yield_zero() {
        let mut no_rate = tx("0x1", Some(WALLET), "1000000000000000", None);
        no_rate.decoded_name = None;
        let garbage_fee = tx("0x2", Some(WALLET), "not-a-number", Some(dec!(2000)));
        let mut no_fee = tx("0x3", Some(WALLET), "0", Some(dec!(2000)));
        no_fee.fees_paid = None;

        let summary = process_transactions(&[no_rate, garbage_fee, no_fee], WALLET, None);
        assert_eq!(summary.total_fee_usd, Decimal::ZERO);
        assert_eq!(summary.total_fee_native, dec!(0.001));
        assert_eq!(summary.transaction_count, 3);
        assert!(summary.top_transactions.is_empty());
    }

    #[test]
    fn test_cutoff_excludes_boundary_and_older() {
        let now = Utc::now();
        let cutoff = now - Duration::days(7);
        let mut at_cutoff = tx("0x1", Some(WALLET), "1000000000000000", Some(dec!(1)));
        at_cutoff.block_signed_at = cutoff;
        let mut inside = tx("0x2", Some(WALLET), "1000000000000000", Some(dec!(1)));
        inside.block_signed_at = cutoff + Duration::seconds(1);

        let summary = process_transactions(&[at_cutoff, inside], WALLET, Some(cutoff));
        assert_eq!(summary.transaction_count, 1);
        assert_eq!(summary.top_transactions[0].tx_hash, "0x2");
    }

    #[test]
    fn test_empty_input() {
        let summary = process_transactions(&[], WALLET, None);
        assert_eq!(summary, ChainSummary::default());
        assert!(summary.categories.is_empty());
        assert!(summary.top_transactions.is_empty());
    }

    #[test]
    fn test_category_totals_match_chain_totals() {
        let mut approve = tx("0x1", Some(WALLET), "3000000000000000", Some(dec!(1500)));
        approve.decoded_name = Some("approve".to_string());
        let swap = tx("0x2", Some(WALLET), "2000000000000000", Some(dec!(1500)));
        let foreign = tx("0x3", Some("0x999"), "9000000000000000", Some(dec!(1500)));

        let summary = process_transactions(&[approve, swap, foreign], WALLET, None);
        let category_fee: Decimal = summary.categories.values().map(|c| c.total_fee_usd).sum();
        let category_count: u64 = summary.categories.values().map(|c| c.count).sum();

        assert_eq!(category_fee, summary.total_fee_usd);
        assert_eq!(category_count, summary.transaction_count);
        assert_eq!(summary.total_fee_usd, dec!(7.5));
    }
}
