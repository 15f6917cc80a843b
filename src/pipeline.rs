//! Pipeline driver
//!
//! Sequences one run: aggregate-and-stage, load the warehouse, then run the
//! transformations, strictly in that order. The loader reports its outcome
//! instead of raising, so the transformation step runs regardless of how the
//! load went; aggregation and staging failures abort the run.

use anyhow::Result;
use std::path::Path;
use tracing::{error, info};

use crate::aggregator::fetch_all;
use crate::config::Config;
use crate::market_data::SeriesFetcher;
use crate::staging::ObjectStore;
use crate::transformations::run_transformations;
use crate::warehouse::{load, LoadOutcome, Warehouse};

pub async fn run_pipeline(
    config: &Config,
    fetcher: &dyn SeriesFetcher,
    store: &dyn ObjectStore,
    warehouse: &dyn Warehouse,
) -> Result<()> {
    info!(
        "Starting pipeline run for {} symbols",
        config.pipeline.symbols.len()
    );

    let dataset = fetch_all(
        fetcher,
        &config.pipeline.symbols,
        Some((store, config.pipeline.staging_object.as_str())),
    )
    .await?;
    info!(
        "Aggregated {} records ({} symbols returned no data)",
        dataset.len(),
        dataset.failed_symbols.len()
    );

    let staged_uri = store.object_uri(&config.pipeline.staging_object);
    match load(warehouse, &staged_uri, &config.warehouse.table).await {
        LoadOutcome::Loaded(rows) => {
            info!("Warehouse load complete: {} rows in {}", rows, config.warehouse.table);
        }
        LoadOutcome::TruncateFailed => {
            error!(
                "Warehouse load skipped: table {} could not be truncated",
                config.warehouse.table
            );
        }
        LoadOutcome::LoadFailed => {
            error!(
                "Warehouse load failed: table {} is empty until the next successful run",
                config.warehouse.table
            );
        }
    }

    run_transformations(
        warehouse,
        Path::new(&config.pipeline.queries_dir),
        &config.pipeline.transformation_files,
    )
    .await;

    info!("Pipeline run finished");
    Ok(())
}
