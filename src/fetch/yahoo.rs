use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::error::{Context, Result, UpstreamError};

use super::auth::CrumbCache;
use super::decode::{flatten_quote_summary, parse_daily_ranges};
use super::request::{build_headers, render_template};
use super::{DailyRange, FetchResult, RawFetcher, RawRecord};

/// Raw-field provider backed by the Yahoo Finance quoteSummary and chart endpoints.
pub struct YahooFetcher {
    client: Client,
    crumbs: CrumbCache,
    quote_url: String,
    chart_url: String,
    modules: Vec<String>,
}

impl YahooFetcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let headers = build_headers(&config.headers)?;
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to construct upstream HTTP client")?;

        let modules = config
            .modules
            .split(',')
            .map(str::trim)
            .filter(|module| !module.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            client,
            crumbs: CrumbCache::new(&config.cookie_url, &config.crumb_url),
            quote_url: config.quote_url.clone(),
            chart_url: config.chart_url.clone(),
            modules,
        })
    }

    async fn get_json(&self, url: &str, cookie: &str, symbol: &str) -> FetchResult<Value> {
        let response = self.client.get(url).header(COOKIE, cookie).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                symbol: symbol.to_string(),
            });
        }

        // quoteSummary and chart both report unknown symbols as 404 with a JSON envelope
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                symbol: symbol.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| {
            if status == StatusCode::NOT_FOUND {
                UpstreamError::NotFound(symbol.to_string())
            } else {
                UpstreamError::Malformed(format!("invalid JSON for {symbol}: {err}"))
            }
        })
    }

    /// Issue an authenticated request, refreshing the crumb once if it was rejected.
    async fn authenticated<F>(&self, symbol: &str, build_url: F) -> FetchResult<Value>
    where
        F: Fn(&str) -> Result<String>,
    {
        let mut refreshed = false;
        loop {
            let crumb = self.crumbs.get(&self.client).await?;
            let url = build_url(&crumb.value)
                .map_err(|err| UpstreamError::Transport(err.to_string()))?;

            match self.get_json(&url, &crumb.cookie, symbol).await {
                Err(UpstreamError::Status { status: 401, .. }) if !refreshed => {
                    log::warn!("Upstream rejected crumb while fetching {symbol}, refreshing");
                    self.crumbs.invalidate().await;
                    refreshed = true;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl RawFetcher for YahooFetcher {
    async fn raw_fields(&self, symbol: &str) -> FetchResult<RawRecord> {
        let modules = self.modules.join(",");
        let payload = self
            .authenticated(symbol, |crumb| {
                render_template(
                    &self.quote_url,
                    &[("symbol", symbol), ("modules", &modules), ("crumb", crumb)],
                )
            })
            .await?;

        let order: Vec<&str> = self.modules.iter().map(String::as_str).collect();
        flatten_quote_summary(&payload, symbol, &order)
    }

    async fn daily_ranges(&self, symbol: &str, period: &str) -> FetchResult<Vec<DailyRange>> {
        let payload = self
            .authenticated(symbol, |crumb| {
                render_template(
                    &self.chart_url,
                    &[("symbol", symbol), ("range", period), ("crumb", crumb)],
                )
            })
            .await?;

        parse_daily_ranges(&payload, symbol)
    }
}
