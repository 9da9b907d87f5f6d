use std::future::Future;
use std::io;
use std::sync::Arc;

use env_logger::Env;
use log::{info, warn};

use stock_cache::api::{app_router, AppState};
use stock_cache::cache::CacheStore;
use stock_cache::config;
use stock_cache::error::Context;
use stock_cache::fetch::YahooFetcher;
use stock_cache::records;
use stock_cache::service::{ServiceSettings, StockService};
use stock_cache::Result;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::load()?;
    let fetcher = YahooFetcher::new(&config.upstream)?;
    let cache = Arc::new(CacheStore::new(&config.cache));
    let service = Arc::new(StockService::new(
        Arc::new(fetcher),
        cache,
        ServiceSettings::from(&config),
    ));
    let popular = records::load_or_default(&config.popular_file)?;

    let state = Arc::new(AppState {
        service: Arc::clone(&service),
        popular,
        watchlist_limit: config.batch.watchlist_max_symbols,
    });
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(
        "Serving stock data on {} (price TTL {}s, company TTL {}s, max {} entries)",
        config.listen_addr,
        config.cache.price_ttl_secs,
        config.cache.company_ttl_secs,
        config.cache.max_entries
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    wait_for_signal(tokio::signal::ctrl_c()).await
}

/// Resolve when `signal` fires; a signal that cannot be installed never resolves.
async fn wait_for_signal<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(err) = signal.await {
        warn!("Failed to listen for Ctrl-C, serving until killed: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
