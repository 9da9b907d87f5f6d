use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::UpstreamError;

pub mod auth;
pub mod decode;
pub mod request;
pub mod yahoo;

#[cfg(test)]
pub mod testing;

pub use yahoo::YahooFetcher;

/// Period requested when deriving 52-week extremes from daily history.
pub const YEARLY_HISTORY: &str = "1y";

pub type FetchResult<T> = std::result::Result<T, UpstreamError>;

/// Loosely-typed field mapping as supplied by the upstream provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: HashMap<String, Value>,
    daily_ranges: Vec<DailyRange>,
}

impl RawRecord {
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self {
            fields,
            daily_ranges: Vec::new(),
        }
    }

    /// Value for `key` unless it is absent or JSON null.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|value| !value.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of populated (non-null) fields.
    pub fn populated_len(&self) -> usize {
        self.fields.values().filter(|value| !value.is_null()).count()
    }

    pub fn daily_ranges(&self) -> &[DailyRange] {
        &self.daily_ranges
    }

    pub fn with_daily_ranges(mut self, ranges: Vec<DailyRange>) -> Self {
        self.daily_ranges = ranges;
        self
    }
}

impl FromIterator<(String, Value)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// High/low of a single trading day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyRange {
    pub high: f64,
    pub low: f64,
}

/// The single capability the core consumes from the market-data provider.
#[async_trait]
pub trait RawFetcher: Send + Sync {
    /// Raw provider fields for a canonical symbol.
    async fn raw_fields(&self, symbol: &str) -> FetchResult<RawRecord>;

    /// Daily high/low values covering `period` (e.g. `1y`).
    async fn daily_ranges(&self, symbol: &str, period: &str) -> FetchResult<Vec<DailyRange>>;
}
