use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

pub mod loader;
pub mod validator;

pub use loader::{load, load_from_path, CONFIG_PATH_ENV};
pub use validator::validate_config;

/// Lifetime of cached entries per TTL class.
#[derive(Debug, Clone, Serialize)]
pub struct CacheConfig {
    pub price_ttl_secs: u64,
    pub company_ttl_secs: u64,
    pub max_entries: usize,
}

impl CacheConfig {
    pub fn price_ttl(&self) -> Duration {
        Duration::from_secs(self.price_ttl_secs)
    }

    pub fn company_ttl(&self) -> Duration {
        Duration::from_secs(self.company_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolConfig {
    pub default_suffix: String,
    /// Upstream records with fewer populated fields are treated as unknown symbols.
    pub min_fields: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchConfig {
    pub max_symbols: usize,
    pub watchlist_max_symbols: usize,
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpstreamConfig {
    pub quote_url: String,
    pub chart_url: String,
    pub cookie_url: String,
    pub crumb_url: String,
    pub modules: String,
    pub timeout_secs: u64,
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub cache: CacheConfig,
    pub symbols: SymbolConfig,
    pub batch: BatchConfig,
    pub upstream: UpstreamConfig,
    pub popular_file: PathBuf,
}

impl Config {
    pub fn builtin() -> Self {
        let headers = HashMap::from([
            (
                "User-Agent".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            ),
            ("Accept".to_string(), "application/json".to_string()),
        ]);

        Config {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            cache: CacheConfig {
                price_ttl_secs: 30,
                company_ttl_secs: 3600,
                max_entries: 1000,
            },
            symbols: SymbolConfig {
                default_suffix: ".NS".to_string(),
                min_fields: 5,
            },
            batch: BatchConfig {
                max_symbols: 20,
                watchlist_max_symbols: 15,
                workers: 10,
            },
            upstream: UpstreamConfig {
                quote_url: "https://query2.finance.yahoo.com/v10/finance/quoteSummary/{symbol}?modules={modules}&crumb={crumb}".to_string(),
                chart_url: "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}?range={range}&interval=1d".to_string(),
                cookie_url: "https://fc.yahoo.com".to_string(),
                crumb_url: "https://query2.finance.yahoo.com/v1/test/getcrumb".to_string(),
                modules: "price,summaryDetail,defaultKeyStatistics,financialData,assetProfile"
                    .to_string(),
                timeout_secs: 10,
                headers,
            },
            popular_file: PathBuf::from("assets/popular.csv"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::builtin()
    }
}
