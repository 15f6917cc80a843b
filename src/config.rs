//! Configuration module for the stock data pipeline
//!
//! All identifiers and credentials are carried explicitly in the configuration
//! structure loaded here. Components receive the sections they need as
//! parameters; nothing is read from ambient process state.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Market-data API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataConfig {
    /// Base URL of the market-data API
    #[serde(default = "default_market_data_base_url")]
    pub base_url: String,
    /// API key sent with every request
    pub api_key: String,
    /// Automatic retries per symbol on transient fetch failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// How long a fetched series may be served from the cache, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Cache database path. When absent the cache lives only for the process.
    #[serde(default)]
    pub cache_db_path: Option<String>,
}

/// S3-compatible storage configuration for the staging bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Provider type: "aws", "r2" (Cloudflare R2), or "generic"
    pub provider: String,
    /// Bucket holding staged objects
    pub bucket: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Region (optional, provider defaults apply if not specified)
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint URL for S3-compatible services
    /// Examples:
    /// - Cloudflare R2: "https://<account-id>.r2.cloudflarestorage.com"
    /// - MinIO: "http://localhost:9000"
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Force path-style addressing (true for most S3-compatible services)
    #[serde(default)]
    pub force_path_style: Option<bool>,
}

/// Warehouse connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Base URL of the warehouse HTTP query interface
    pub base_url: String,
    /// Database holding the destination table
    pub database: String,
    /// Destination table, fully replaced on each successful load
    pub table: String,
    #[serde(default = "default_warehouse_user")]
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// Per-run pipeline parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Symbols to fetch, in order
    pub symbols: Vec<String>,
    /// Object name for the staged dataset within the bucket
    #[serde(default = "default_staging_object")]
    pub staging_object: String,
    /// Directory holding the SQL transformation scripts
    #[serde(default = "default_queries_dir")]
    pub queries_dir: String,
    /// Transformation scripts, executed strictly in this order after loading
    #[serde(default = "default_transformation_files")]
    pub transformation_files: Vec<String>,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub market_data: MarketDataConfig,
    pub storage: StorageConfig,
    pub warehouse: WarehouseConfig,
    pub pipeline: PipelineConfig,
}

fn default_market_data_base_url() -> String {
    "https://www.alphavantage.co".to_string()
}

fn default_max_retries() -> u32 {
    2
}

fn default_cache_ttl_secs() -> u64 {
    86_400
}

fn default_warehouse_user() -> String {
    "default".to_string()
}

fn default_staging_object() -> String {
    "combined_daily_stock_data.csv".to_string()
}

fn default_queries_dir() -> String {
    "queries".to_string()
}

fn default_transformation_files() -> Vec<String> {
    [
        "Daily_Merge_Deduplicate.sql",
        "Stock_Aggregation.sql",
        "Scaling_Normalizing_ML.sql",
        "Test_Train_Tables.sql",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .context(format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = serde_yaml::from_str(&content)
            .context("Failed to parse config YAML")?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parsing() {
        let yaml = r#"
market_data:
  api_key: "demo-key"
  max_retries: 3
  cache_db_path: "/var/cache/stock-pipeline"

storage:
  provider: "r2"
  bucket: "stock-staging"
  access_key_id: "AK"
  secret_access_key: "SK"
  endpoint: "https://account.r2.cloudflarestorage.com"

warehouse:
  base_url: "http://warehouse:8123"
  database: "market"
  table: "daily_prices"
  user: "loader"
  password: "secret"

pipeline:
  symbols: ["WMT", "AMZN", "UPS"]
  staging_object: "daily.csv"
  queries_dir: "sql"
  transformation_files: ["a.sql", "b.sql"]
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.market_data.max_retries, 3);
        assert_eq!(config.market_data.base_url, "https://www.alphavantage.co");
        assert_eq!(config.storage.endpoint.as_deref(), Some("https://account.r2.cloudflarestorage.com"));
        assert_eq!(config.warehouse.table, "daily_prices");
        assert_eq!(config.pipeline.symbols.len(), 3);
        assert_eq!(config.pipeline.transformation_files, vec!["a.sql", "b.sql"]);
    }

    #[test]
    fn test_config_parsing_defaults() {
        let yaml = r#"
market_data:
  api_key: "demo-key"

storage:
  provider: "aws"
  bucket: "stock-staging"
  access_key_id: "AK"
  secret_access_key: "SK"

warehouse:
  base_url: "http://warehouse:8123"
  database: "market"
  table: "daily_prices"

pipeline:
  symbols: ["WMT"]
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.market_data.max_retries, 2);
        assert_eq!(config.market_data.cache_ttl_secs, 86_400);
        assert_eq!(config.market_data.cache_db_path, None);
        assert_eq!(config.warehouse.user, "default");
        assert_eq!(config.warehouse.password, None);
        assert_eq!(config.pipeline.staging_object, "combined_daily_stock_data.csv");
        assert_eq!(config.pipeline.queries_dir, "queries");
        assert_eq!(config.pipeline.transformation_files.len(), 4);
        assert_eq!(config.pipeline.transformation_files[0], "Daily_Merge_Deduplicate.sql");
    }
}
