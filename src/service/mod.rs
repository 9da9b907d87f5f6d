use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::cache::{CacheKey, CacheStats, CacheStore, TtlClass};
use crate::config::Config;
use crate::error::FetchError;
use crate::fetch::{RawFetcher, YEARLY_HISTORY};
use crate::normalize::{needs_history, normalize, NormalizedRecord, Quote, ViewType};
use crate::utils::unix_timestamp;

/// Orchestrator policy knobs, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub default_suffix: String,
    pub min_fields: usize,
    pub max_batch: usize,
    pub workers: usize,
}

impl From<&Config> for ServiceSettings {
    fn from(config: &Config) -> Self {
        Self {
            default_suffix: config.symbols.default_suffix.clone(),
            min_fields: config.symbols.min_fields,
            max_batch: config.batch.max_symbols,
            workers: config.batch.workers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchError {
    pub symbol: String,
    pub message: String,
}

/// Partitioned outcome of a batch; successes arrive in completion order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub requested: usize,
    pub successes: Vec<Quote>,
    pub errors: Vec<BatchError>,
}

/// Exchange-suffixed, upper-cased ticker used as cache key and upstream argument.
pub fn canonicalize(symbol: &str, default_suffix: &str) -> String {
    let symbol = symbol.trim().to_ascii_uppercase();
    // index tickers such as ^NSEI carry no exchange suffix
    if symbol.is_empty() || symbol.contains('.') || symbol.starts_with('^') {
        symbol
    } else {
        format!("{symbol}{}", default_suffix.to_ascii_uppercase())
    }
}

/// Whether a canonical symbol only uses characters that occur in exchange tickers.
///
/// Anything else could rewrite the upstream URL, so such symbols never leave the service.
pub fn is_ticker(canonical: &str) -> bool {
    !canonical.is_empty()
        && canonical
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b".^=&-".contains(&b))
}

/// Read-through front for the upstream provider: cache lookup, bounded fetch, normalize, store.
pub struct StockService {
    fetcher: Arc<dyn RawFetcher>,
    cache: Arc<CacheStore>,
    settings: ServiceSettings,
    workers: Arc<Semaphore>,
}

impl StockService {
    pub fn new(
        fetcher: Arc<dyn RawFetcher>,
        cache: Arc<CacheStore>,
        settings: ServiceSettings,
    ) -> Self {
        let workers = Arc::new(Semaphore::new(settings.workers.max(1)));
        Self {
            fetcher,
            cache,
            settings,
            workers,
        }
    }

    pub fn canonicalize(&self, symbol: &str) -> String {
        canonicalize(symbol, &self.settings.default_suffix)
    }

    /// Fetch one symbol in the requested view, serving from cache while fresh.
    ///
    /// A miss runs on a detached task: if the caller goes away the fetch still
    /// completes and populates the cache.
    pub async fn fetch_one(&self, symbol: &str, view: ViewType) -> Result<Quote, FetchError> {
        let canonical = self.canonicalize(symbol);
        if !is_ticker(&canonical) {
            debug!("Rejecting malformed symbol {symbol:?}");
            return Err(FetchError::NotFound(symbol.to_string()));
        }

        let key = CacheKey::new(TtlClass::for_view(view), canonical.clone());
        // summary and full share a TTL class, so the cached shape must match the request
        if let Some(record) = self.cache.get_if(&key, |record| record.view() == view) {
            debug!("Cache hit for {canonical} ({view})");
            return Ok(Quote {
                record,
                cached: true,
            });
        }
        debug!("Cache miss for {canonical} ({view})");

        let fetcher = Arc::clone(&self.fetcher);
        let cache = Arc::clone(&self.cache);
        let workers = Arc::clone(&self.workers);
        let min_fields = self.settings.min_fields;
        let task_symbol = canonical.clone();

        let task = tokio::spawn(async move {
            let _permit = workers
                .acquire_owned()
                .await
                .map_err(|_| FetchError::Internal("worker pool is shut down".to_string()))?;

            let record = load_record(fetcher.as_ref(), &task_symbol, view, min_fields).await?;
            cache.put(key, record.clone());
            Ok::<_, FetchError>(record)
        });

        match task.await {
            Ok(Ok(record)) => Ok(Quote {
                record,
                cached: false,
            }),
            Ok(Err(err)) => {
                warn!("Fetching {canonical} ({view}) failed: {err}");
                Err(err)
            }
            Err(join_err) => Err(FetchError::Internal(format!(
                "fetch task for {canonical} aborted: {join_err}"
            ))),
        }
    }

    /// Fetch up to the configured batch limit of symbols concurrently.
    pub async fn fetch_batch<S: AsRef<str>>(&self, symbols: &[S], view: ViewType) -> BatchResult {
        self.fetch_batch_limited(symbols, view, self.settings.max_batch)
            .await
    }

    /// Like [`StockService::fetch_batch`] with an explicit truncation limit.
    pub async fn fetch_batch_limited<S: AsRef<str>>(
        &self,
        symbols: &[S],
        view: ViewType,
        limit: usize,
    ) -> BatchResult {
        let requested: Vec<String> = symbols
            .iter()
            .take(limit)
            .map(|symbol| symbol.as_ref().trim().to_string())
            .collect();

        let outcomes: Vec<(String, Result<Quote, FetchError>)> =
            stream::iter(requested.iter().cloned())
                .map(|symbol| async move {
                    let outcome = self.fetch_one(&symbol, view).await;
                    (symbol, outcome)
                })
                .buffer_unordered(self.settings.workers.max(1))
                .collect()
                .await;

        let mut successes = Vec::new();
        let mut errors = Vec::new();
        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(quote) => successes.push(quote),
                Err(err) => errors.push(BatchError {
                    symbol,
                    message: err.to_string(),
                }),
            }
        }

        BatchResult {
            requested: requested.len(),
            successes,
            errors,
        }
    }

    pub fn cache_size(&self) -> usize {
        self.cache.size()
    }

    pub fn clear_cache(&self) -> usize {
        let removed = self.cache.clear();
        info!("Cleared {removed} cached entries");
        removed
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Wait for in-flight fetches to finish, then reject any new ones.
    pub async fn shutdown(&self) {
        let total = self.settings.workers.max(1) as u32;
        match self.workers.acquire_many(total).await {
            Ok(permits) => {
                self.workers.close();
                drop(permits);
                info!("Worker pool drained and closed");
            }
            Err(_) => debug!("Worker pool already closed"),
        }
    }
}

async fn load_record(
    fetcher: &dyn RawFetcher,
    symbol: &str,
    view: ViewType,
    min_fields: usize,
) -> Result<NormalizedRecord, FetchError> {
    let raw = fetcher
        .raw_fields(symbol)
        .await
        .map_err(|err| FetchError::upstream(symbol, err))?;

    if raw.populated_len() < min_fields {
        debug!(
            "{symbol} returned only {} fields, treating as unknown",
            raw.populated_len()
        );
        return Err(FetchError::NotFound(symbol.to_string()));
    }

    let raw = if needs_history(&raw, view) {
        match fetcher.daily_ranges(symbol, YEARLY_HISTORY).await {
            Ok(ranges) => raw.with_daily_ranges(ranges),
            Err(err) => {
                warn!("History for {symbol} unavailable, 52-week range left blank: {err}");
                raw
            }
        }
    } else {
        raw
    };

    Ok(normalize(&raw, view, symbol, unix_timestamp()))
}
