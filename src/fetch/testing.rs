//! Scripted in-memory provider used by the orchestrator and API tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::UpstreamError;

use super::{DailyRange, FetchResult, RawFetcher, RawRecord};

#[derive(Default)]
pub struct StubFetcher {
    records: Mutex<HashMap<String, RawRecord>>,
    failures: Mutex<HashMap<String, UpstreamError>>,
    history: Mutex<HashMap<String, Vec<DailyRange>>>,
    delay: Option<Duration>,
    raw_calls: AtomicUsize,
    history_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&self, symbol: &str, record: RawRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(symbol.to_string(), record);
    }

    /// Register a plausible quote for `symbol` priced at `price`.
    pub fn insert_quote(&self, symbol: &str, price: f64) {
        self.insert(symbol, sample_record(price));
    }

    pub fn fail(&self, symbol: &str, err: UpstreamError) {
        self.failures
            .lock()
            .unwrap()
            .insert(symbol.to_string(), err);
    }

    pub fn insert_history(&self, symbol: &str, ranges: Vec<DailyRange>) {
        self.history
            .lock()
            .unwrap()
            .insert(symbol.to_string(), ranges);
    }

    pub fn raw_calls(&self) -> usize {
        self.raw_calls.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    /// Highest number of `raw_fields` calls observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RawFetcher for StubFetcher {
    async fn raw_fields(&self, symbol: &str) -> FetchResult<RawRecord> {
        self.raw_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failure = self.failures.lock().unwrap().get(symbol).cloned();
        if let Some(err) = failure {
            return Err(err);
        }

        self.records
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| UpstreamError::NotFound(symbol.to_string()))
    }

    async fn daily_ranges(&self, symbol: &str, _period: &str) -> FetchResult<Vec<DailyRange>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.history
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| UpstreamError::Transport(format!("no history for {symbol}")))
    }
}

pub fn sample_record(price: f64) -> RawRecord {
    let fields: [(&str, Value); 8] = [
        ("longName", json!("Sample Industries Limited")),
        ("regularMarketPrice", json!(price)),
        ("regularMarketChange", json!(1.25)),
        ("regularMarketChangePercent", json!(0.5)),
        ("regularMarketVolume", json!(120_000)),
        ("marketCap", json!(5_000_000_000_i64)),
        ("trailingPE", json!(21.4)),
        ("sector", json!("Technology")),
    ];

    fields
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
