use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use config_manager::SystemConfig;
use fee_core::{DaysFilter, FeeCategory, WalletReport};
use goldrush_client::GoldRushClient;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(about = "Aggregates transaction fees for an EVM wallet across chains", long_about = None)]
struct Cli {
    /// Wallet address (0x + 40 hex characters)
    address: String,

    /// Only count the last N days; `all` for the full history
    #[arg(short, long, default_value = "all")]
    days: DaysFilter,

    /// Print the top transactions as CSV instead of the JSON report
    #[arg(long)]
    csv: bool,

    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

/// One CSV line per top transaction
#[derive(Serialize)]
struct TopTransactionRow<'a> {
    chain: &'a str,
    category: FeeCategory,
    fee_usd: Decimal,
    fee_native: Decimal,
    tx_hash: &'a str,
    timestamp: DateTime<Utc>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,fee_tracker=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    GoldRushClient::validate_wallet_address(&cli.address)?;

    let config = SystemConfig::load_from_path(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let orchestrator = job_orchestrator::build_orchestrator(&config)?;

    info!("Aggregating {} over {} chains", cli.address, config.chains.len());
    let outcome = orchestrator.orchestrate(&cli.address, cli.days).await?;
    let report = WalletReport::from_chain_reports(
        &cli.address,
        outcome.chain_reports,
        outcome.failed_chains,
        Utc::now(),
    );

    if cli.csv {
        write_csv(&report)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

fn write_csv(report: &WalletReport) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for chain in &report.chain_reports {
        for tx in &chain.summary.top_transactions {
            wtr.serialize(TopTransactionRow {
                chain: &chain.chain_name,
                category: tx.category,
                fee_usd: tx.fee_usd,
                fee_native: tx.fee_native,
                tx_hash: &tx.tx_hash,
                timestamp: tx.timestamp,
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}
