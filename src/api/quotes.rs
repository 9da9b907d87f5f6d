use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::normalize::{Quote, ViewType};
use crate::service::BatchError;
use crate::utils::unix_timestamp;

use super::error::{ApiError, ApiResult};
use super::AppState;

pub async fn price(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<Quote>> {
    single(&state, &symbol, ViewType::PriceOnly).await
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<Quote>> {
    single(&state, &symbol, ViewType::Summary).await
}

pub async fn stock(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<Quote>> {
    single(&state, &symbol, ViewType::Full).await
}

async fn single(state: &AppState, symbol: &str, view: ViewType) -> ApiResult<Json<Quote>> {
    let quote = state.service.fetch_one(symbol, view).await?;
    Ok(Json(quote))
}

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    symbols: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    count: usize,
    successful: usize,
    prices: Vec<Quote>,
    errors: Vec<BatchError>,
    timestamp: i64,
}

pub async fn batch_price(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BatchQuery>,
) -> ApiResult<Json<BatchResponse>> {
    let symbols = split_symbols(query.symbols.as_deref())?;
    let result = state.service.fetch_batch(&symbols, ViewType::PriceOnly).await;

    Ok(Json(BatchResponse {
        count: result.requested,
        successful: result.successes.len(),
        prices: result.successes,
        errors: result.errors,
        timestamp: unix_timestamp(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct WatchlistQuery {
    symbols: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WatchlistResponse {
    watchlist: Vec<Quote>,
    count: usize,
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: i64,
}

pub async fn watchlist(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WatchlistQuery>,
) -> ApiResult<Json<WatchlistResponse>> {
    let symbols = split_symbols(query.symbols.as_deref())?;
    let (view, kind) = watchlist_view(query.kind.as_deref())?;

    let result = state
        .service
        .fetch_batch_limited(&symbols, view, state.watchlist_limit)
        .await;
    for failure in &result.errors {
        log::debug!("Watchlist skipped {}: {}", failure.symbol, failure.message);
    }

    Ok(Json(WatchlistResponse {
        count: result.successes.len(),
        watchlist: result.successes,
        kind,
        timestamp: unix_timestamp(),
    }))
}

fn watchlist_view(kind: Option<&str>) -> ApiResult<(ViewType, &'static str)> {
    let kind = kind.map(str::trim).filter(|kind| !kind.is_empty());
    match kind.map(str::parse::<ViewType>) {
        None | Some(Ok(ViewType::Summary)) => Ok((ViewType::Summary, "summary")),
        Some(Ok(ViewType::PriceOnly)) => Ok((ViewType::PriceOnly, "price")),
        _ => Err(ApiError::BadRequest(format!(
            "unknown watchlist type '{}', expected 'price' or 'summary'",
            kind.unwrap_or_default()
        ))),
    }
}

fn split_symbols(raw: Option<&str>) -> ApiResult<Vec<String>> {
    let symbols: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|symbol| !symbol.is_empty())
        .map(str::to_string)
        .collect();

    if symbols.is_empty() {
        return Err(ApiError::BadRequest("No symbols provided".to_string()));
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_trims_symbols() {
        let symbols = split_symbols(Some(" TCS, INFY ,,RELIANCE.NS")).expect("symbols");
        assert_eq!(symbols, vec!["TCS", "INFY", "RELIANCE.NS"]);
    }

    #[test]
    fn watchlist_type_selects_view() {
        assert_eq!(watchlist_view(None).expect("default").0, ViewType::Summary);
        assert_eq!(watchlist_view(Some(" Price ")).expect("price").1, "price");
        assert!(matches!(watchlist_view(Some("full")), Err(ApiError::BadRequest(_))));
        assert!(matches!(watchlist_view(Some("chart")), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn empty_symbol_list_is_rejected() {
        assert!(matches!(split_symbols(None), Err(ApiError::BadRequest(_))));
        assert!(matches!(split_symbols(Some(" , ")), Err(ApiError::BadRequest(_))));
    }
}
