//! Command-line probe for the option-chain index
//!
//! Runs one query against a broker's reference files, downloading them
//! first if the local copies are stale, and prints the chain as JSON.

use anyhow::Result;
use clap::Parser;
use reference_data::{Broker, OptionChainService, ReferenceConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chain-query")]
#[command(about = "Query call/put strikes and expiry dates from broker reference files")]
struct Cli {
    /// Underlying symbol, e.g. NIFTY
    symbol: String,

    /// Reference source: flattrade or shoonya
    #[arg(long, default_value = "flattrade")]
    broker: String,

    /// Exchange segment code
    #[arg(long, default_value = "NFO")]
    exchange: String,

    /// Directory for downloaded reference files
    #[arg(long, default_value = "./symbols")]
    symbols_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let broker = match cli.broker.to_lowercase().as_str() {
        "flattrade" => Broker::Flattrade,
        "shoonya" => Broker::Shoonya,
        other => anyhow::bail!("unknown broker: {other}"),
    };

    let config = ReferenceConfig {
        symbols_dir: cli.symbols_dir,
        ..ReferenceConfig::default()
    };
    let service = OptionChainService::new(broker, config)?;

    let chain = service.option_chain(&cli.exchange, &cli.symbol).await?;
    info!(
        calls = chain.call_strikes.len(),
        puts = chain.put_strikes.len(),
        expiries = chain.expiry_dates.len(),
        "query complete"
    );

    println!("{}", serde_json::to_string_pretty(&chain)?);
    Ok(())
}
