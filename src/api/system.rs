use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::records::PopularSymbols;
use crate::utils::unix_timestamp;

use super::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct Banner {
    message: &'static str,
    status: &'static str,
    version: &'static str,
}

pub async fn root() -> Json<Banner> {
    Json(Banner {
        message: "Stock data cache is running",
        status: "active",
        version: VERSION,
    })
}

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
    cache_size: usize,
    timestamp: i64,
    version: &'static str,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "healthy",
        cache_size: state.service.cache_size(),
        timestamp: unix_timestamp(),
        version: VERSION,
    })
}

#[derive(Debug, Serialize)]
pub struct Metrics {
    cache_size: usize,
    cache_hits: u64,
    cache_misses: u64,
    cache_hit_ratio: Option<f64>,
    timestamp: i64,
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<Metrics> {
    let stats = state.service.cache_stats();
    Json(Metrics {
        cache_size: stats.entries,
        cache_hits: stats.hits,
        cache_misses: stats.misses,
        cache_hit_ratio: stats.hit_ratio,
        timestamp: unix_timestamp(),
    })
}

#[derive(Debug, Serialize)]
pub struct Cleared {
    removed: usize,
    timestamp: i64,
}

pub async fn clear_cache(State(state): State<Arc<AppState>>) -> Json<Cleared> {
    Json(Cleared {
        removed: state.service.clear_cache(),
        timestamp: unix_timestamp(),
    })
}

pub async fn popular(State(state): State<Arc<AppState>>) -> Json<PopularSymbols> {
    Json(state.popular.clone())
}
