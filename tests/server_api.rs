#![cfg(feature = "http")]

mod support;

use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use coinboard::{app, server};
use serde_json::Value;
use tower::ServiceExt;
use wiremock::MockServer;

async fn get_json(router: axum::Router, uri: &str) -> Result<(StatusCode, Value)> {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&body)?))
}

async fn router_for(server: &MockServer) -> Result<axum::Router> {
    let service = app::build_service(&support::config_for(server))?;
    Ok(server::router(Arc::new(service), true))
}

#[tokio::test]
async fn market_data_route_serves_payload() -> Result<()> {
    let upstream = MockServer::start().await;
    support::mount_healthy_market(&upstream).await;

    let (status, json) = get_json(router_for(&upstream).await?, "/api/market-data").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["rates"]["KRW"], 1400.0);
    assert_eq!(json["upbit"].as_array().map(Vec::len), Some(2));

    Ok(())
}

#[tokio::test]
async fn arbitrage_route_sorts_rows() -> Result<()> {
    let upstream = MockServer::start().await;
    support::mount_healthy_market(&upstream).await;

    let (status, json) = get_json(
        router_for(&upstream).await?,
        "/api/arbitrage?sort=kimchiPremium&dir=asc",
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["exchangeRate"], 1400.0);
    assert_eq!(json["sort"]["key"], "kimchiPremium");
    assert_eq!(json["sort"]["direction"], "asc");
    assert_eq!(json["assets"][0]["symbol"], "ETH");
    assert_eq!(json["assets"][1]["symbol"], "BTC");
    assert_eq!(json["summary"]["kimchi"]["count"], 2);
    assert_eq!(json["unpriced"][0], "XYZ");

    Ok(())
}

#[tokio::test]
async fn fear_greed_route_reads_neutral_without_upstream() -> Result<()> {
    let upstream = MockServer::start().await;

    let (status, json) = get_json(router_for(&upstream).await?, "/api/fear-greed").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"], 50);
    assert_eq!(json["band"], "greed");
    assert_eq!(json["status"]["origin"], "fallback");

    Ok(())
}

#[tokio::test]
async fn global_route_reports_dominance_phase() -> Result<()> {
    let upstream = MockServer::start().await;
    support::mount_registry(&upstream).await;
    support::mount_json(&upstream, "/global", support::global_body()).await;

    let (status, json) = get_json(router_for(&upstream).await?, "/api/global").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["available"], true);
    assert_eq!(json["dominance"]["phase"], "btc_lead");
    assert_eq!(json["global"]["market_cap_percentage"]["btc"], 57.3);

    Ok(())
}

#[tokio::test]
async fn market_chart_route_reads_coin_and_days() -> Result<()> {
    let upstream = MockServer::start().await;
    support::mount_json(&upstream, "/coins/ethereum/market_chart", support::chart_body()).await;

    let (status, json) = get_json(
        router_for(&upstream).await?,
        "/api/market-chart?coinId=ethereum&days=30",
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["coinId"], "ethereum");
    assert_eq!(json["days"], 30);
    assert_eq!(json["chart"]["prices"][1][1], 68340.51);

    Ok(())
}

#[tokio::test]
async fn market_chart_route_reports_upstream_outage() -> Result<()> {
    let upstream = MockServer::start().await;
    support::mount_status(&upstream, "/coins/bitcoin/market_chart", 500).await;

    let (status, json) = get_json(router_for(&upstream).await?, "/api/market-chart").await?;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["available"], false);

    Ok(())
}

#[tokio::test]
async fn macro_route_serves_baseline_without_upstream() -> Result<()> {
    let upstream = MockServer::start().await;

    let (status, json) = get_json(router_for(&upstream).await?, "/api/macro").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["indicators"]["us10y"]["value"], 4.12);
    assert_eq!(json["status"]["origin"], "fallback");
    assert!(json["lastUpdated"].is_string());

    Ok(())
}
