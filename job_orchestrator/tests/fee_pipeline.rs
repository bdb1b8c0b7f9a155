use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use config_manager::ChainConfig;
use fee_core::{
    ChainReport, ChainSummary, DaysFilter, FetchError, FetchResult, RawTransaction, ReportSource,
    TransactionSource, WalletReport,
};
use job_orchestrator::{ChainOrchestrator, OrchestratorSettings, RefreshDispatcher, ReportCache};
use persistence_layer::{MemoryReportStore, PersistenceError, ReportStore};
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const WALLET: &str = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";

/// Every chain returns one 0.001 ETH swap at $2000; optionally slow
struct CountingSource {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
    failing_slugs: Vec<String>,
}

impl CountingSource {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay: Duration::ZERO,
            failing_slugs: vec![],
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSource for CountingSource {
    async fn fetch_transactions(
        &self,
        address: &str,
        chain_slug: &str,
    ) -> FetchResult<Vec<RawTransaction>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_slugs.iter().any(|slug| slug == chain_slug) {
            return Err(FetchError::Upstream {
                chain: chain_slug.to_string(),
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }

        Ok(vec![RawTransaction {
            tx_hash: format!("0x{}", chain_slug),
            from_address: Some(address.to_string()),
            fees_paid: Some("1000000000000000".to_string()),
            gas_quote_rate: Some(dec!(2000)),
            decoded_name: Some("swap".to_string()),
            log_events: vec![],
            block_signed_at: Utc::now() - ChronoDuration::days(1),
        }])
    }
}

/// Store whose reads always fail
#[derive(Default)]
struct BrokenReadStore {
    inner: MemoryReportStore,
}

#[async_trait]
impl ReportStore for BrokenReadStore {
    async fn get_report(
        &self,
        _wallet_address: &str,
    ) -> persistence_layer::Result<Option<WalletReport>> {
        Err(PersistenceError::PoolCreation("database unavailable".to_string()))
    }

    async fn upsert_report(&self, report: &WalletReport) -> persistence_layer::Result<()> {
        self.inner.upsert_report(report).await
    }

    async fn list_wallet_addresses(&self) -> persistence_layer::Result<Vec<String>> {
        self.inner.list_wallet_addresses().await
    }
}

fn chains() -> Vec<ChainConfig> {
    vec![
        ChainConfig::new("Ethereum", "eth-mainnet"),
        ChainConfig::new("Base", "base-mainnet"),
    ]
}

fn cache_with(source: Arc<CountingSource>, store: Arc<dyn ReportStore>) -> ReportCache {
    let orchestrator = ChainOrchestrator::new(
        OrchestratorSettings {
            chains: chains(),
            chain_timeout: Duration::from_secs(5),
        },
        source,
    );
    ReportCache::new(Arc::new(orchestrator), store, ChronoDuration::hours(1))
}

fn stored_report(address: &str, age: ChronoDuration) -> WalletReport {
    let summary = ChainSummary {
        total_fee_usd: dec!(42),
        ..ChainSummary::default()
    };
    WalletReport::from_chain_reports(
        address,
        vec![ChainReport::new("Ethereum", summary)],
        vec![],
        Utc::now() - age,
    )
}

#[tokio::test]
async fn test_fresh_report_served_without_fetching() {
    let source = Arc::new(CountingSource::new());
    let store = Arc::new(MemoryReportStore::new());
    store
        .upsert_report(&stored_report(WALLET, ChronoDuration::minutes(59)))
        .await
        .unwrap();
    let cache = cache_with(source.clone(), store);

    let fees = cache
        .get_or_refresh(&WALLET.to_uppercase().replacen("0X", "0x", 1), DaysFilter::AllTime)
        .await
        .unwrap();

    assert_eq!(fees.source, ReportSource::Cache);
    assert_eq!(fees.report.total_fee_usd_all_chains, dec!(42));
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_stale_report_is_refetched_and_written_back() {
    let source = Arc::new(CountingSource::new());
    let store = Arc::new(MemoryReportStore::new());
    store
        .upsert_report(&stored_report(WALLET, ChronoDuration::minutes(61)))
        .await
        .unwrap();
    let cache = cache_with(source.clone(), store.clone());

    let fees = cache.get_or_refresh(WALLET, DaysFilter::AllTime).await.unwrap();
    cache.wait_for_pending_writes().await;

    assert_eq!(fees.source, ReportSource::Api);
    assert_eq!(fees.report.total_fee_usd_all_chains, dec!(4));
    assert_eq!(source.calls(), 2);

    let stored = store.get_report(WALLET).await.unwrap().unwrap();
    assert_eq!(stored.total_fee_usd_all_chains, dec!(4));
    assert_eq!(stored.top_category_overall, fee_core::FeeCategory::Swap);
}

#[tokio::test]
async fn test_partial_result_is_tagged_and_cached() {
    let mut source = CountingSource::new();
    source.failing_slugs = vec!["base-mainnet".to_string()];
    let source = Arc::new(source);
    let store = Arc::new(MemoryReportStore::new());
    let cache = cache_with(source, store.clone());

    let fees = cache.get_or_refresh(WALLET, DaysFilter::AllTime).await.unwrap();
    cache.wait_for_pending_writes().await;

    assert_eq!(fees.source, ReportSource::ApiPartial);
    assert_eq!(fees.report.failed_chains, vec!["Base".to_string()]);
    let stored = store.get_report(WALLET).await.unwrap().unwrap();
    assert_eq!(stored.failed_chains, vec!["Base".to_string()]);
}

#[tokio::test]
async fn test_day_bounded_request_skips_store() {
    let source = Arc::new(CountingSource::new());
    let store = Arc::new(MemoryReportStore::new());
    store
        .upsert_report(&stored_report(WALLET, ChronoDuration::minutes(1)))
        .await
        .unwrap();
    let cache = cache_with(source.clone(), store.clone());

    let fees = cache.get_or_refresh(WALLET, DaysFilter::Days(7)).await.unwrap();
    cache.wait_for_pending_writes().await;

    // Live data even though a fresh all-time report exists, and no write
    assert_eq!(fees.source, ReportSource::Api);
    assert_eq!(source.calls(), 2);
    let stored = store.get_report(WALLET).await.unwrap().unwrap();
    assert_eq!(stored.total_fee_usd_all_chains, dec!(42));
}

#[tokio::test]
async fn test_store_read_error_falls_through_to_live_fetch() {
    let source = Arc::new(CountingSource::new());
    let store = Arc::new(BrokenReadStore::default());
    let cache = cache_with(source.clone(), store.clone());

    let fees = cache.get_or_refresh(WALLET, DaysFilter::AllTime).await.unwrap();
    cache.wait_for_pending_writes().await;

    assert_eq!(fees.source, ReportSource::Api);
    assert_eq!(source.calls(), 2);
    assert_eq!(store.inner.len().await, 1);
}

#[tokio::test]
async fn test_refresh_batch_is_bounded_by_semaphore() {
    let mut source = CountingSource::new();
    source.delay = Duration::from_millis(50);
    let source = Arc::new(source);
    let store = Arc::new(MemoryReportStore::new());

    let orchestrator = ChainOrchestrator::new(
        OrchestratorSettings {
            chains: vec![ChainConfig::new("Ethereum", "eth-mainnet")],
            chain_timeout: Duration::from_secs(5),
        },
        source.clone(),
    );
    let cache = Arc::new(ReportCache::new(
        Arc::new(orchestrator),
        store.clone(),
        ChronoDuration::hours(1),
    ));

    for i in 0..6 {
        let address = format!("0x{:040x}", i);
        store
            .upsert_report(&stored_report(&address, ChronoDuration::hours(2)))
            .await
            .unwrap();
    }

    let dispatcher = RefreshDispatcher::new(cache, 2);
    let batch = dispatcher.dispatch().await.unwrap();
    assert_eq!(batch.addresses_triggered, 6);

    let summary = batch.handle.await.unwrap();
    assert_eq!(summary.refreshed, 6);
    assert_eq!(summary.failed, 0);
    assert_eq!(source.calls(), 6);
    assert!(source.max_in_flight.load(Ordering::SeqCst) <= 2);

    // Every stored report was rewritten by the batch
    for address in store.list_wallet_addresses().await.unwrap() {
        let report = store.get_report(&address).await.unwrap().unwrap();
        assert_eq!(report.total_fee_usd_all_chains, dec!(2));
    }
}

#[tokio::test]
async fn test_refresh_with_empty_store() {
    let cache = Arc::new(cache_with(
        Arc::new(CountingSource::new()),
        Arc::new(MemoryReportStore::new()),
    ));

    let batch = RefreshDispatcher::new(cache, 4).dispatch().await.unwrap();

    assert_eq!(batch.addresses_triggered, 0);
    assert_eq!(batch.handle.await.unwrap().refreshed, 0);
}
