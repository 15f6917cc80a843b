//! Multi-symbol aggregation
//!
//! Fetches every requested symbol in order, tolerating per-symbol no-data
//! outcomes, and combines the successes into one dataset sorted by date.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::dataset::{AggregatedDataset, FetchOutcome, SymbolRecord};
use crate::market_data::SeriesFetcher;
use crate::staging::{stage, ObjectStore};

/// Fetch all symbols and combine the results.
///
/// A symbol returning no data is excluded and recorded in the failed set; it
/// does not abort the run. A fetch error (retries already exhausted inside
/// the fetcher) propagates. When a staging destination is supplied, the
/// combined dataset is uploaded before returning.
pub async fn fetch_all(
    fetcher: &dyn SeriesFetcher,
    symbols: &[String],
    staging: Option<(&dyn ObjectStore, &str)>,
) -> Result<AggregatedDataset> {
    // Keyed by (date, symbol): global date-ascending order and the
    // no-duplicate invariant come from the map itself
    let mut by_key: BTreeMap<(NaiveDate, String), SymbolRecord> = BTreeMap::new();
    let mut failed_symbols = Vec::new();

    for symbol in symbols {
        match fetcher.fetch_daily(symbol).await? {
            FetchOutcome::Series(records) => {
                info!("Fetched {} daily records for {}", records.len(), symbol);
                for record in records {
                    by_key.insert((record.date, record.symbol.clone()), record);
                }
            }
            FetchOutcome::NoData => {
                failed_symbols.push(symbol.clone());
            }
        }
    }

    if !failed_symbols.is_empty() {
        warn!("Failed to fetch data for: {}", failed_symbols.join(", "));
    }

    if by_key.is_empty() {
        bail!("No market data collected for any requested symbol");
    }

    let dataset = AggregatedDataset {
        records: by_key.into_values().collect(),
        failed_symbols,
    };

    if let Some((store, object_name)) = staging {
        stage(store, object_name, &dataset).await?;
    }

    Ok(dataset)
}
