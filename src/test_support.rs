//! Shared test doubles for the seam traits

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::dataset::{FetchOutcome, SymbolRecord};
use crate::market_data::SeriesFetcher;
use crate::staging::ObjectStore;
use crate::warehouse::{CsvLoadOptions, Warehouse};

pub(crate) fn sample_record(date: &str, symbol: &str, close: f64, volume: u64) -> SymbolRecord {
    SymbolRecord {
        date: date.parse().unwrap(),
        open: close - 1.0,
        high: close + 0.5,
        low: close - 2.0,
        close,
        volume,
        symbol: symbol.to_string(),
    }
}

enum Scripted {
    Series(Vec<SymbolRecord>),
    NoData,
    Error,
}

/// Fetcher returning scripted outcomes per symbol; unknown symbols yield NoData
pub(crate) struct MapFetcher {
    outcomes: HashMap<String, Scripted>,
}

impl MapFetcher {
    pub(crate) fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
        }
    }

    pub(crate) fn with_series(mut self, symbol: &str, records: Vec<SymbolRecord>) -> Self {
        self.outcomes.insert(symbol.to_string(), Scripted::Series(records));
        self
    }

    pub(crate) fn with_no_data(mut self, symbol: &str) -> Self {
        self.outcomes.insert(symbol.to_string(), Scripted::NoData);
        self
    }

    pub(crate) fn with_error(mut self, symbol: &str) -> Self {
        self.outcomes.insert(symbol.to_string(), Scripted::Error);
        self
    }
}

#[async_trait]
impl SeriesFetcher for MapFetcher {
    async fn fetch_daily(&self, symbol: &str) -> Result<FetchOutcome> {
        match self.outcomes.get(symbol) {
            Some(Scripted::Series(records)) => Ok(FetchOutcome::Series(records.clone())),
            Some(Scripted::NoData) | None => Ok(FetchOutcome::NoData),
            Some(Scripted::Error) => bail!("fetch failed for {}", symbol),
        }
    }
}

/// In-memory object store with optional write-failure injection
pub(crate) struct MemoryStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    puts: AtomicUsize,
    fail_puts: bool,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            puts: AtomicUsize::new(0),
            fail_puts: false,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail_puts: true,
            ..Self::new()
        }
    }

    pub(crate) fn object(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub(crate) fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        if self.fail_puts {
            bail!("object storage unavailable");
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (bytes.to_vec(), content_type.to_string()));
        Ok(())
    }

    fn object_uri(&self, key: &str) -> String {
        format!("mem://{}", key)
    }
}

/// Warehouse double recording the call sequence, with per-phase failure
/// injection
pub(crate) struct MockWarehouse {
    calls: Mutex<Vec<String>>,
    executed: Mutex<Vec<String>>,
    pub(crate) fail_truncate: bool,
    pub(crate) fail_load: bool,
    pub(crate) fail_row_count: bool,
    /// `execute` fails for any statement containing this fragment
    pub(crate) failing_sql: Option<String>,
    rows: u64,
}

impl MockWarehouse {
    pub(crate) fn with_rows(rows: u64) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
            fail_truncate: false,
            fail_load: false,
            fail_row_count: false,
            failing_sql: None,
            rows,
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn executed_sql(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub(crate) fn load_call_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with("load:"))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Warehouse for MockWarehouse {
    async fn truncate_table(&self, table: &str) -> Result<()> {
        self.record(format!("truncate:{}", table));
        if self.fail_truncate {
            bail!("truncate rejected");
        }
        Ok(())
    }

    async fn load_csv(&self, uri: &str, table: &str, options: CsvLoadOptions) -> Result<()> {
        self.record(format!(
            "load:{}:{}:skip={}:infer={}",
            uri, table, options.skip_header_rows, options.infer_schema
        ));
        if self.fail_load {
            bail!("load rejected");
        }
        Ok(())
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        self.record(format!("count:{}", table));
        if self.fail_row_count {
            bail!("count rejected");
        }
        Ok(self.rows)
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        self.record("execute".to_string());
        self.executed.lock().unwrap().push(sql.to_string());
        if let Some(fragment) = &self.failing_sql {
            if sql.contains(fragment) {
                bail!("statement rejected");
            }
        }
        Ok(())
    }
}
