//! JSON API over a shared [`MarketDataService`].

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::app;
use crate::config::Config;
use crate::market_data::{
    ChartQuery, MarketDataService, SortDirection, SortKey, SortOrder, DEFAULT_CHART_COIN,
    DEFAULT_CHART_DAYS,
};

type AppState = Arc<MarketDataService>;

/// `?sort=kimchiPremium&dir=asc`
#[derive(Debug, Default, Deserialize)]
pub struct ArbitrageQuery {
    pub sort: Option<String>,
    pub dir: Option<String>,
}

impl ArbitrageQuery {
    fn order(&self) -> Result<SortOrder> {
        let key = match &self.sort {
            Some(raw) => raw.parse::<SortKey>()?,
            None => SortKey::default(),
        };
        let direction = match &self.dir {
            Some(raw) => raw.parse::<SortDirection>()?,
            None => SortDirection::default(),
        };
        Ok(SortOrder::new(key, direction))
    }
}

/// `?coinId=ethereum&days=30`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartParams {
    pub coin_id: Option<String>,
    pub days: Option<String>,
}

impl ChartParams {
    fn query(&self) -> Result<ChartQuery> {
        let days = match &self.days {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("invalid days: {raw:?}"))?,
            None => DEFAULT_CHART_DAYS,
        };
        ChartQuery::new(self.coin_id.as_deref().unwrap_or(DEFAULT_CHART_COIN), days)
    }
}

fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "success": false, "error": message })),
    )
        .into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn market_data(State(service): State<AppState>) -> impl IntoResponse {
    Json(service.collect().await)
}

async fn arbitrage(
    State(service): State<AppState>,
    Query(query): Query<ArbitrageQuery>,
) -> Response {
    let order = match query.order() {
        Ok(order) => order,
        Err(err) => return bad_request(err.to_string()),
    };
    Json(app::arbitrage(&service, order).await).into_response()
}

async fn fear_greed(State(service): State<AppState>) -> impl IntoResponse {
    Json(app::fear_greed(&service).await)
}

async fn global(State(service): State<AppState>) -> impl IntoResponse {
    Json(app::global_market(&service).await)
}

async fn market_chart(
    State(service): State<AppState>,
    Query(params): Query<ChartParams>,
) -> Response {
    let query = match params.query() {
        Ok(query) => query,
        Err(err) => return bad_request(format!("{err:#}")),
    };
    let output = app::market_chart(&service, &query).await;
    let status = if output.available {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, Json(output)).into_response()
}

async fn macro_indicators(State(service): State<AppState>) -> impl IntoResponse {
    Json(app::macro_indicators(&service).await)
}

pub fn router(service: AppState, allow_any_origin: bool) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/api/market-data", get(market_data))
        .route("/api/arbitrage", get(arbitrage))
        .route("/api/fear-greed", get(fear_greed))
        .route("/api/global", get(global))
        .route("/api/market-chart", get(market_chart))
        .route("/api/macro", get(macro_indicators))
        .with_state(service)
        .layer(TraceLayer::new_for_http());

    if allow_any_origin {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Bind `config.server.bind` and serve until ctrl-c.
pub async fn serve(config: &Config) -> Result<()> {
    let service = Arc::new(app::build_service(config)?);
    let routes = router(service, config.server.allow_any_origin);

    let listener = tokio::net::TcpListener::bind(config.server.bind.as_str())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!(bind = %config.server.bind, "API server listening");

    axum::serve(listener, routes)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn test_router() -> Router {
        let service = app::build_service(&Config::default()).unwrap();
        router(Arc::new(service), true)
    }

    #[test]
    fn query_defaults_to_market_cap_desc() {
        let order = ArbitrageQuery::default().order().unwrap();
        assert_eq!(order, SortOrder::default());

        let query = ArbitrageQuery {
            sort: Some("kimchi-premium".to_string()),
            dir: Some("ASC".to_string()),
        };
        let order = query.order().unwrap();
        assert_eq!(order.key, SortKey::KimchiPremium);
        assert_eq!(order.direction, SortDirection::Asc);
    }

    #[test]
    fn chart_params_default_to_a_week_of_bitcoin() {
        let query = ChartParams::default().query().unwrap();
        assert_eq!(query, ChartQuery::default());

        let params = ChartParams {
            coin_id: Some("ethereum".to_string()),
            days: Some("abc".to_string()),
        };
        assert!(params.query().is_err());
    }

    #[tokio::test]
    async fn invalid_chart_coin_is_rejected() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/market-chart?coinId=..%2Fglobal")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = test_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_sort_key_is_rejected() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/arbitrage?sort=volume")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("volume"));
    }
}
