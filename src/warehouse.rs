//! Warehouse boundary and two-phase loader
//!
//! The loader replaces the destination table's content in two phases:
//! truncate, then bulk load from the staged object's URI. The phases are not
//! transactional; a load failure after a successful truncate leaves the table
//! empty until the next successful run. Both failure modes are reported
//! through `LoadOutcome` instead of an error, so the pipeline keeps going.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};

/// Options for a CSV bulk load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvLoadOptions {
    /// Leading rows to skip (the staged object carries one header row)
    pub skip_header_rows: u64,
    /// Whether the warehouse may detect column types from the file. The
    /// staged schema is already coerced upstream, so the loader disables it.
    pub infer_schema: bool,
}

impl Default for CsvLoadOptions {
    fn default() -> Self {
        Self {
            skip_header_rows: 1,
            infer_schema: false,
        }
    }
}

/// Warehouse operations used by the loader and the transformation runner
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Discard all rows of the table
    async fn truncate_table(&self, table: &str) -> Result<()>;

    /// Bulk load a staged CSV object into the table
    async fn load_csv(&self, uri: &str, table: &str, options: CsvLoadOptions) -> Result<()>;

    /// Rows currently in the table
    async fn row_count(&self, table: &str) -> Result<u64>;

    /// Run an arbitrary SQL statement
    async fn execute(&self, sql: &str) -> Result<()>;
}

/// Result of a full-refresh load attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Both phases succeeded; carries the warehouse-reported row count
    Loaded(u64),
    /// Phase 1 failed; the table was left untouched and phase 2 was skipped
    TruncateFailed,
    /// Phase 2 failed after a successful truncate; the table is empty
    LoadFailed,
}

impl LoadOutcome {
    pub fn rows_loaded(&self) -> u64 {
        match self {
            LoadOutcome::Loaded(rows) => *rows,
            LoadOutcome::TruncateFailed | LoadOutcome::LoadFailed => 0,
        }
    }
}

/// Replace the table's content with the staged object.
///
/// Never attempts the load when the truncate failed, and never returns an
/// error: failures are logged and captured in the outcome.
pub async fn load(warehouse: &dyn Warehouse, staged_uri: &str, table: &str) -> LoadOutcome {
    if let Err(e) = warehouse.truncate_table(table).await {
        error!("Error truncating table {}: {}", table, e);
        return LoadOutcome::TruncateFailed;
    }
    info!("Successfully truncated table: {}", table);

    if let Err(e) = warehouse.load_csv(staged_uri, table, CsvLoadOptions::default()).await {
        error!("Error loading data into table {}: {}", table, e);
        return LoadOutcome::LoadFailed;
    }

    match warehouse.row_count(table).await {
        Ok(rows) => {
            info!("Loaded {} rows to {}", rows, table);
            LoadOutcome::Loaded(rows)
        }
        Err(e) => {
            error!("Error reading row count for table {}: {}", table, e);
            LoadOutcome::LoadFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockWarehouse;

    #[tokio::test]
    async fn test_successful_load_runs_both_phases_in_order() {
        let warehouse = MockWarehouse::with_rows(2);
        let outcome = load(&warehouse, "s3://staging/daily.csv", "daily_prices").await;

        assert_eq!(outcome, LoadOutcome::Loaded(2));
        assert_eq!(outcome.rows_loaded(), 2);
        assert_eq!(
            warehouse.calls(),
            vec![
                "truncate:daily_prices",
                "load:s3://staging/daily.csv:daily_prices:skip=1:infer=false",
                "count:daily_prices",
            ]
        );
    }

    #[tokio::test]
    async fn test_truncate_failure_skips_the_load_entirely() {
        let mut warehouse = MockWarehouse::with_rows(2);
        warehouse.fail_truncate = true;

        let outcome = load(&warehouse, "s3://staging/daily.csv", "daily_prices").await;

        assert_eq!(outcome, LoadOutcome::TruncateFailed);
        assert_eq!(outcome.rows_loaded(), 0);
        assert_eq!(warehouse.load_call_count(), 0);
        assert_eq!(warehouse.calls(), vec!["truncate:daily_prices"]);
    }

    #[tokio::test]
    async fn test_load_failure_after_truncate_reports_load_failed() {
        let mut warehouse = MockWarehouse::with_rows(2);
        warehouse.fail_load = true;

        let outcome = load(&warehouse, "s3://staging/daily.csv", "daily_prices").await;

        assert_eq!(outcome, LoadOutcome::LoadFailed);
        assert_eq!(outcome.rows_loaded(), 0);
        assert_eq!(
            warehouse.calls(),
            vec![
                "truncate:daily_prices",
                "load:s3://staging/daily.csv:daily_prices:skip=1:infer=false",
            ]
        );
    }

    #[tokio::test]
    async fn test_row_count_failure_reports_load_failed() {
        let mut warehouse = MockWarehouse::with_rows(2);
        warehouse.fail_row_count = true;

        let outcome = load(&warehouse, "s3://staging/daily.csv", "daily_prices").await;
        assert_eq!(outcome, LoadOutcome::LoadFailed);
    }
}
