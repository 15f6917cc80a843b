//! HTTP warehouse client
//!
//! Implements the warehouse boundary over a ClickHouse-style HTTP query
//! interface: every operation is a SQL statement posted to the server, with
//! basic-auth credentials taken from the explicit configuration.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::config::WarehouseConfig;
use crate::warehouse::{CsvLoadOptions, Warehouse};

/// Column structure of the staged CSV, matching the destination table schema.
/// Passed to the bulk load so the server never detects types from the file.
const STAGED_COLUMNS: &str =
    "date Date, open Float64, high Float64, low Float64, close Float64, volume UInt64, symbol String";

pub struct ClickhouseWarehouse {
    config: WarehouseConfig,
    client: reqwest::Client,
}

impl ClickhouseWarehouse {
    pub fn new(config: WarehouseConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(600))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn qualified_table(&self, table: &str) -> String {
        format!("{}.{}", self.config.database, table)
    }

    fn load_sql(&self, uri: &str, table: &str, options: CsvLoadOptions) -> String {
        let source = if options.infer_schema {
            format!("s3('{}', 'CSV')", uri)
        } else {
            format!("s3('{}', 'CSV', '{}')", uri, STAGED_COLUMNS)
        };
        format!(
            "INSERT INTO {} SELECT * FROM {} SETTINGS input_format_csv_skip_first_lines = {}",
            self.qualified_table(table),
            source,
            options.skip_header_rows
        )
    }

    async fn run_query(&self, sql: &str) -> Result<String> {
        let url = format!("{}/", self.config.base_url.trim_end_matches('/'));
        debug!("Executing warehouse query: {}", sql);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.user, self.config.password.as_deref())
            .body(sql.to_string())
            .send()
            .await
            .context("Failed to send warehouse query")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read warehouse response")?;

        if !status.is_success() {
            bail!(
                "Warehouse query failed with status {}: {}",
                status,
                body.trim()
            );
        }

        Ok(body)
    }
}

#[async_trait]
impl Warehouse for ClickhouseWarehouse {
    async fn truncate_table(&self, table: &str) -> Result<()> {
        self.run_query(&format!("TRUNCATE TABLE {}", self.qualified_table(table)))
            .await?;
        Ok(())
    }

    async fn load_csv(&self, uri: &str, table: &str, options: CsvLoadOptions) -> Result<()> {
        self.run_query(&self.load_sql(uri, table, options)).await?;
        Ok(())
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        let body = self
            .run_query(&format!("SELECT count() FROM {}", self.qualified_table(table)))
            .await?;
        body.trim()
            .parse::<u64>()
            .context(format!("Unexpected row count response: '{}'", body.trim()))
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        self.run_query(sql).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warehouse() -> ClickhouseWarehouse {
        ClickhouseWarehouse::new(WarehouseConfig {
            base_url: "http://warehouse:8123".to_string(),
            database: "market".to_string(),
            table: "daily_prices".to_string(),
            user: "default".to_string(),
            password: None,
        })
    }

    #[test]
    fn test_qualified_table() {
        assert_eq!(warehouse().qualified_table("daily_prices"), "market.daily_prices");
    }

    #[test]
    fn test_load_sql_skips_header_and_pins_schema() {
        let sql = warehouse().load_sql(
            "s3://staging/daily.csv",
            "daily_prices",
            CsvLoadOptions::default(),
        );

        assert_eq!(
            sql,
            format!(
                "INSERT INTO market.daily_prices SELECT * FROM s3('s3://staging/daily.csv', 'CSV', '{}') \
                 SETTINGS input_format_csv_skip_first_lines = 1",
                STAGED_COLUMNS
            )
        );
    }

    #[test]
    fn test_load_sql_with_inference_enabled_omits_the_structure() {
        let sql = warehouse().load_sql(
            "s3://staging/daily.csv",
            "daily_prices",
            CsvLoadOptions {
                skip_header_rows: 1,
                infer_schema: true,
            },
        );

        assert!(sql.contains("s3('s3://staging/daily.csv', 'CSV')"));
        assert!(!sql.contains(STAGED_COLUMNS));
    }
}
