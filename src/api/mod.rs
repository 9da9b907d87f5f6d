use std::sync::Arc;

use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::records::PopularSymbols;
use crate::service::StockService;

pub mod error;
mod quotes;
mod system;

pub use error::{ApiError, ApiResult};

/// Shared state handed to every handler.
pub struct AppState {
    pub service: Arc<StockService>,
    pub popular: PopularSymbols,
    pub watchlist_limit: usize,
}

pub fn app_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(system::root))
        .route("/price/{symbol}", get(quotes::price))
        .route("/summary/{symbol}", get(quotes::summary))
        .route("/stock/{symbol}", get(quotes::stock))
        .route("/batch/price", get(quotes::batch_price))
        .route("/watchlist", get(quotes::watchlist))
        .route("/popular/indian", get(system::popular))
        .route("/health", get(system::health))
        .route("/metrics", get(system::metrics))
        .route("/cache/clear", post(system::clear_cache))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::cache::CacheStore;
    use crate::config::CacheConfig;
    use crate::error::UpstreamError;
    use crate::fetch::testing::StubFetcher;
    use crate::service::ServiceSettings;

    fn app(fetcher: Arc<StubFetcher>) -> Router {
        let cache = Arc::new(CacheStore::new(&CacheConfig {
            price_ttl_secs: 30,
            company_ttl_secs: 3600,
            max_entries: 100,
        }));
        let service = StockService::new(
            fetcher,
            cache,
            ServiceSettings {
                default_suffix: ".NS".to_string(),
                min_fields: 5,
                max_batch: 20,
                workers: 4,
            },
        );
        let popular = PopularSymbols {
            lists: BTreeMap::from([("nifty50_top10".to_string(), vec!["TCS.NS".to_string()])]),
            sectors: BTreeMap::from([("IT".to_string(), vec!["INFY.NS".to_string()])]),
        };
        app_router(Arc::new(AppState {
            service: Arc::new(service),
            popular,
            watchlist_limit: 2,
        }))
    }

    async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request builds");
        let response = app.clone().oneshot(request).await.expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let json = serde_json::from_slice(&bytes).expect("body is json");
        (status, json)
    }

    #[tokio::test]
    async fn price_route_serves_then_caches() {
        let fetcher = Arc::new(StubFetcher::new());
        fetcher.insert_quote("TCS.NS", 3500.0);
        let app = app(fetcher.clone());

        let (status, body) = send(&app, "GET", "/price/tcs").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "TCS.NS");
        assert_eq!(body["currentPrice"], 3500.0);
        assert_eq!(body["cached"], false);

        let (_, body) = send(&app, "GET", "/price/TCS").await;
        assert_eq!(body["cached"], true);
        assert_eq!(fetcher.raw_calls(), 1);
    }

    #[tokio::test]
    async fn summary_and_stock_routes_use_their_views() {
        let fetcher = Arc::new(StubFetcher::new());
        fetcher.insert_quote("INFY.NS", 1500.0);
        let app = app(fetcher);

        let (status, summary) = send(&app, "GET", "/summary/INFY").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["sector"], "Technology");
        assert!(summary.get("dayHigh").is_none());

        let (status, full) = send(&app, "GET", "/stock/INFY").await;
        assert_eq!(status, StatusCode::OK);
        assert!(full.get("dayHigh").is_some());
    }

    #[tokio::test]
    async fn unknown_symbol_is_not_found() {
        let app = app(Arc::new(StubFetcher::new()));

        let (status, body) = send(&app, "GET", "/price/ZZZ").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 404);
    }

    #[tokio::test]
    async fn encoded_url_syntax_in_symbol_is_not_found() {
        let fetcher = Arc::new(StubFetcher::new());
        let app = app(fetcher.clone());

        for uri in ["/price/TCS.NS%23x", "/summary/TCS%3Fmodules%3Dprice"] {
            let (status, _) = send(&app, "GET", uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        }
        assert_eq!(fetcher.raw_calls(), 0);
    }

    #[tokio::test]
    async fn upstream_failure_is_bad_gateway() {
        let fetcher = Arc::new(StubFetcher::new());
        fetcher.fail("TCS.NS", UpstreamError::Transport("connection reset".into()));
        let app = app(fetcher);

        let (status, body) = send(&app, "GET", "/price/TCS").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], 502);
    }

    #[tokio::test]
    async fn batch_partitions_successes_and_errors() {
        let fetcher = Arc::new(StubFetcher::new());
        fetcher.insert_quote("AAA.NS", 10.0);
        fetcher.insert_quote("BBB.NS", 20.0);
        let app = app(fetcher);

        let (status, body) = send(&app, "GET", "/batch/price?symbols=AAA,BBB,ZZZ-BAD").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        assert_eq!(body["successful"], 2);
        assert_eq!(body["prices"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["errors"][0]["symbol"], "ZZZ-BAD");
    }

    #[tokio::test]
    async fn batch_without_symbols_is_bad_request() {
        let app = app(Arc::new(StubFetcher::new()));

        let (status, body) = send(&app, "GET", "/batch/price?symbols=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn watchlist_is_capped_and_typed() {
        let fetcher = Arc::new(StubFetcher::new());
        for symbol in ["AAA.NS", "BBB.NS", "CCC.NS"] {
            fetcher.insert_quote(symbol, 1.0);
        }
        let app = app(fetcher.clone());

        let (status, body) = send(&app, "GET", "/watchlist?symbols=AAA,BBB,CCC&type=price").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "price");
        assert_eq!(body["count"], 2);
        assert_eq!(fetcher.raw_calls(), 2);

        let (status, _) = send(&app, "GET", "/watchlist?symbols=AAA&type=chart").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_metrics_and_clear() {
        let fetcher = Arc::new(StubFetcher::new());
        fetcher.insert_quote("TCS.NS", 3500.0);
        let app = app(fetcher);

        send(&app, "GET", "/price/TCS").await;
        send(&app, "GET", "/price/TCS").await;

        let (status, health) = send(&app, "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["cache_size"], 1);

        let (_, metrics) = send(&app, "GET", "/metrics").await;
        assert_eq!(metrics["cache_hits"], 1);
        assert_eq!(metrics["cache_misses"], 1);
        assert_eq!(metrics["cache_hit_ratio"], 0.5);

        let (status, cleared) = send(&app, "POST", "/cache/clear").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cleared["removed"], 1);

        let (_, health) = send(&app, "GET", "/health").await;
        assert_eq!(health["cache_size"], 0);
    }

    #[tokio::test]
    async fn popular_and_banner() {
        let app = app(Arc::new(StubFetcher::new()));

        let (status, popular) = send(&app, "GET", "/popular/indian").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(popular["nifty50_top10"][0], "TCS.NS");
        assert_eq!(popular["sectors"]["IT"][0], "INFY.NS");

        let (status, banner) = send(&app, "GET", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(banner["status"], "active");
    }
}
