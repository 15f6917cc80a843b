//! Dataset types and staging serialization
//!
//! This module defines the typed records produced by the per-symbol fetcher,
//! the aggregated dataset handed to the staging uploader, and the CSV codec
//! used for the staged object.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Column order of the staged CSV object
pub const CSV_HEADER: [&str; 7] = ["date", "open", "high", "low", "close", "volume", "symbol"];

/// One trading day of one symbol
///
/// Uniquely keyed by (symbol, date). Volume is always a non-negative integer
/// even though the source field arrives as text that may carry a fractional
/// part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub symbol: String,
}

/// Result of fetching one symbol's daily series
///
/// A missing time-series payload is a normal outcome, not an error, so it is
/// modeled as a variant rather than propagated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FetchOutcome {
    /// Non-empty series, ordered by date ascending
    Series(Vec<SymbolRecord>),
    /// The API returned no daily time series for the symbol
    NoData,
}

/// Combined records from all successful fetches, sorted by date ascending,
/// with zero duplicate (symbol, date) pairs
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedDataset {
    pub records: Vec<SymbolRecord>,
    /// Symbols that returned no data, in request order
    pub failed_symbols: Vec<String>,
}

impl AggregatedDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize to the staging format: header row plus one row per record,
    /// no index column. The output is deterministic, so staging the same
    /// dataset twice produces byte-identical content.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(CSV_HEADER)?;
        for record in &self.records {
            wtr.write_record([
                record.date.to_string(),
                record.open.to_string(),
                record.high.to_string(),
                record.low.to_string(),
                record.close.to_string(),
                record.volume.to_string(),
                record.symbol.clone(),
            ])?;
        }
        let data = wtr.into_inner().context("Failed to flush CSV writer")?;
        Ok(data)
    }
}

/// Parse records back out of the staging format
pub fn parse_staged_csv(bytes: &[u8]) -> Result<Vec<SymbolRecord>> {
    let mut rdr = csv::Reader::from_reader(bytes);
    let mut records = Vec::new();

    for (idx, row) in rdr.records().enumerate() {
        let row = row.context(format!("Failed to read staged CSV row {}", idx + 1))?;
        if row.len() != CSV_HEADER.len() {
            bail!(
                "Staged CSV row {} has {} fields, expected {}",
                idx + 1,
                row.len(),
                CSV_HEADER.len()
            );
        }

        let parse_price = |pos: usize, name: &str| -> Result<f64> {
            row[pos]
                .parse::<f64>()
                .context(format!("Invalid {} value '{}' in row {}", name, &row[pos], idx + 1))
        };

        records.push(SymbolRecord {
            date: row[0]
                .parse::<NaiveDate>()
                .context(format!("Invalid date '{}' in row {}", &row[0], idx + 1))?,
            open: parse_price(1, "open")?,
            high: parse_price(2, "high")?,
            low: parse_price(3, "low")?,
            close: parse_price(4, "close")?,
            volume: row[5]
                .parse::<u64>()
                .context(format!("Invalid volume '{}' in row {}", &row[5], idx + 1))?,
            symbol: row[6].to_string(),
        });
    }

    Ok(records)
}
