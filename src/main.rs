//! Stock Data Pipeline
//!
//! Fetches daily stock price data for a configured symbol list, stages the
//! combined dataset in object storage, bulk-loads it into a warehouse table,
//! and runs the SQL transformation scripts.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stock_data_pipeline::{
    CachedFetcher, ClickhouseWarehouse, Config, FetchCache, MarketDataClient, RetryPolicy,
    S3Store, run_pipeline,
};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "stock-data-pipeline")]
#[command(about = "Fetch daily stock data, stage it, and load the warehouse", long_about = None)]
struct Args {
    /// Path to the configuration YAML file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Re-run the pipeline every N seconds instead of exiting after one run
    #[arg(long, value_name = "SECONDS")]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    info!("Loading configuration from {:?}", args.config);
    let config = Config::from_file(&args.config)
        .context("Failed to load configuration")?;

    // Wire the fetcher: API client with the cache and retry policy around it
    let cache = FetchCache::open(
        config.market_data.cache_db_path.as_deref(),
        Duration::from_secs(config.market_data.cache_ttl_secs),
    )
    .context("Failed to open fetch cache")?;
    let retry = RetryPolicy::new(config.market_data.max_retries);
    let api_key = config.market_data.api_key.clone();
    let fetcher = CachedFetcher::new(
        MarketDataClient::new(config.market_data.clone()),
        cache,
        retry,
        api_key,
    );

    let store = S3Store::new(config.storage.clone())
        .await
        .context("Failed to create object storage client")?;
    let warehouse = ClickhouseWarehouse::new(config.warehouse.clone());

    match args.interval_secs {
        None => {
            run_pipeline(&config, &fetcher, &store, &warehouse).await?;
            info!("Pipeline completed successfully!");
        }
        Some(secs) => loop {
            if let Err(e) = run_pipeline(&config, &fetcher, &store, &warehouse).await {
                error!("Pipeline run failed: {}", e);
            }
            info!("Next run in {} seconds", secs);
            tokio::time::sleep(Duration::from_secs(secs)).await;
        },
    }

    Ok(())
}
