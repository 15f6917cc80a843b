//! Market-data API client
//!
//! Fetches one symbol's daily time series over HTTP and normalizes it into
//! typed records. A response without a time-series payload is a normal
//! outcome (`FetchOutcome::NoData`), logged and returned, never an error.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use urlencoding::encode;

use crate::config::MarketDataConfig;
use crate::dataset::{FetchOutcome, SymbolRecord};

/// Source of daily series data, one symbol at a time
#[async_trait]
pub trait SeriesFetcher: Send + Sync {
    async fn fetch_daily(&self, symbol: &str) -> Result<FetchOutcome>;
}

/// Daily series response from the market-data API
///
/// The payload is keyed by date string; entries carry the OHLCV fields as
/// strings. Other top-level members (metadata, rate-limit notes) are ignored.
#[derive(Debug, Deserialize)]
struct DailySeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<BTreeMap<String, DailyEntry>>,
}

#[derive(Debug, Deserialize)]
struct DailyEntry {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

/// HTTP client for the market-data API
pub struct MarketDataClient {
    config: MarketDataConfig,
    client: reqwest::Client,
}

impl MarketDataClient {
    pub fn new(config: MarketDataConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn request_url(&self, symbol: &str) -> String {
        format!(
            "{}/query?function=TIME_SERIES_DAILY&symbol={}&apikey={}",
            self.config.base_url.trim_end_matches('/'),
            encode(symbol),
            encode(&self.config.api_key)
        )
    }

    /// Normalize a parsed response into records, sorted by date ascending
    fn series_to_outcome(symbol: &str, payload: DailySeriesResponse) -> Result<FetchOutcome> {
        let series = match payload.time_series {
            Some(series) if !series.is_empty() => series,
            _ => {
                warn!("No data found for {}. Continuing with the next symbol.", symbol);
                return Ok(FetchOutcome::NoData);
            }
        };

        // BTreeMap iteration over ISO date keys already yields ascending date order
        let mut records = Vec::with_capacity(series.len());
        for (date_str, entry) in series {
            let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                .context(format!("Invalid date '{}' in series for {}", date_str, symbol))?;

            records.push(SymbolRecord {
                date,
                open: parse_price(&entry.open, "open", symbol, &date_str)?,
                high: parse_price(&entry.high, "high", symbol, &date_str)?,
                low: parse_price(&entry.low, "low", symbol, &date_str)?,
                close: parse_price(&entry.close, "close", symbol, &date_str)?,
                volume: coerce_volume(&entry.volume)
                    .context(format!("Invalid volume for {} on {}", symbol, date_str))?,
                symbol: symbol.to_string(),
            });
        }

        debug!("Parsed {} daily records for {}", records.len(), symbol);
        Ok(FetchOutcome::Series(records))
    }
}

#[async_trait]
impl SeriesFetcher for MarketDataClient {
    async fn fetch_daily(&self, symbol: &str) -> Result<FetchOutcome> {
        let url = self.request_url(symbol);
        debug!("Fetching daily series for {} from {}", symbol, self.config.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context(format!("Failed to send market-data request for {}", symbol))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Market-data request failed with status {} for {}", status, symbol);
        }

        let payload: DailySeriesResponse = response
            .json()
            .await
            .context(format!("Failed to parse market-data response for {}", symbol))?;

        Self::series_to_outcome(symbol, payload)
    }
}

fn parse_price(raw: &str, field: &str, symbol: &str, date: &str) -> Result<f64> {
    raw.parse::<f64>()
        .context(format!("Invalid {} price '{}' for {} on {}", field, raw, symbol, date))
}

/// Coerce the textual volume field to a non-negative integer, truncating any
/// fractional representation ("1234" and "1234.0" both yield 1234)
fn coerce_volume(raw: &str) -> Result<u64> {
    if let Ok(volume) = raw.parse::<u64>() {
        return Ok(volume);
    }

    let value = raw
        .parse::<f64>()
        .context(format!("Volume '{}' is not numeric", raw))?;
    if value < 0.0 {
        bail!("Volume '{}' is negative", raw);
    }
    Ok(value.trunc() as u64)
}
