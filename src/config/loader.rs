use std::{
    collections::HashMap,
    env, fs,
    io::ErrorKind,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::{AppError, Context, Result};

use super::{validator, Config};

/// Environment variable naming the JSON config file.
pub const CONFIG_PATH_ENV: &str = "STOCK_CACHE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "assets/config.json";

/// Resolve the effective configuration: built-in defaults, then the JSON file, then env overrides.
pub fn load() -> Result<Config> {
    let path = env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_path(&path)?;
    apply_env_overrides(&mut config, |name| env::var(name).ok())?;
    validator::validate_config(&config)?;
    Ok(config)
}

/// Load the JSON file at `path` on top of the built-in defaults. A missing file is not an error.
pub fn load_from_path(path: &Path) -> Result<Config> {
    let mut config = Config::builtin();

    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            log::info!(
                "No config file at {}, using built-in defaults",
                path.display()
            );
            return Ok(config);
        }
        Err(err) => {
            return Err(AppError::message(format!(
                "failed to read config file {}: {}",
                path.display(),
                err
            )))
        }
    };

    let raw: RawConfig = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse config JSON at {}", path.display()))?;
    raw.apply(&mut config)?;

    Ok(config)
}

fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup("STOCK_CACHE_LISTEN") {
        config.listen_addr = parse_addr(&addr)?;
    }
    if let Some(suffix) = lookup("STOCK_CACHE_SUFFIX") {
        config.symbols.default_suffix = suffix.trim().to_string();
    }
    if let Some(value) = lookup("STOCK_CACHE_PRICE_TTL") {
        config.cache.price_ttl_secs = parse_number("STOCK_CACHE_PRICE_TTL", &value)?;
    }
    if let Some(value) = lookup("STOCK_CACHE_COMPANY_TTL") {
        config.cache.company_ttl_secs = parse_number("STOCK_CACHE_COMPANY_TTL", &value)?;
    }
    if let Some(value) = lookup("STOCK_CACHE_MAX_ENTRIES") {
        config.cache.max_entries = parse_number("STOCK_CACHE_MAX_ENTRIES", &value)?;
    }
    Ok(())
}

fn parse_addr(value: &str) -> Result<SocketAddr> {
    value
        .trim()
        .parse::<SocketAddr>()
        .map_err(AppError::from)
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        AppError::message(format!("{name} must be a non-negative integer, got `{value}`"))
    })
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    listen_addr: Option<String>,
    #[serde(default)]
    cache: RawCacheConfig,
    #[serde(default)]
    symbols: RawSymbolConfig,
    #[serde(default)]
    batch: RawBatchConfig,
    #[serde(default)]
    upstream: RawUpstreamConfig,
    popular_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct RawCacheConfig {
    price_ttl_secs: Option<u64>,
    company_ttl_secs: Option<u64>,
    max_entries: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct RawSymbolConfig {
    default_suffix: Option<String>,
    min_fields: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct RawBatchConfig {
    max_symbols: Option<usize>,
    watchlist_max_symbols: Option<usize>,
    workers: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct RawUpstreamConfig {
    quote_url: Option<String>,
    chart_url: Option<String>,
    cookie_url: Option<String>,
    crumb_url: Option<String>,
    modules: Option<String>,
    timeout_secs: Option<u64>,
    #[serde(default)]
    headers: HashMap<String, String>,
}

impl RawConfig {
    fn apply(self, config: &mut Config) -> Result<()> {
        if let Some(addr) = self.listen_addr {
            config.listen_addr = parse_addr(&addr)?;
        }

        let cache = &mut config.cache;
        overwrite(&mut cache.price_ttl_secs, self.cache.price_ttl_secs);
        overwrite(&mut cache.company_ttl_secs, self.cache.company_ttl_secs);
        overwrite(&mut cache.max_entries, self.cache.max_entries);

        let symbols = &mut config.symbols;
        overwrite(&mut symbols.default_suffix, self.symbols.default_suffix);
        overwrite(&mut symbols.min_fields, self.symbols.min_fields);

        let batch = &mut config.batch;
        overwrite(&mut batch.max_symbols, self.batch.max_symbols);
        overwrite(
            &mut batch.watchlist_max_symbols,
            self.batch.watchlist_max_symbols,
        );
        overwrite(&mut batch.workers, self.batch.workers);

        let upstream = &mut config.upstream;
        overwrite(&mut upstream.quote_url, self.upstream.quote_url);
        overwrite(&mut upstream.chart_url, self.upstream.chart_url);
        overwrite(&mut upstream.cookie_url, self.upstream.cookie_url);
        overwrite(&mut upstream.crumb_url, self.upstream.crumb_url);
        overwrite(&mut upstream.modules, self.upstream.modules);
        overwrite(&mut upstream.timeout_secs, self.upstream.timeout_secs);
        upstream.headers.extend(self.upstream.headers);

        overwrite(&mut config.popular_file, self.popular_file);
        Ok(())
    }
}

fn overwrite<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}
