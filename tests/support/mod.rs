#![allow(dead_code)]

use std::time::Duration;

use coinboard::config::{Config, FxSourceKind};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config with every provider pointed at `server`.
pub fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    let uri = Some(server.uri());
    config.endpoints.coingecko = uri.clone();
    config.endpoints.upbit = uri.clone();
    config.endpoints.binance = uri.clone();
    config.endpoints.coinbase = uri.clone();
    config.endpoints.exchangerate_api = uri.clone();
    config.endpoints.frankfurter = uri.clone();
    config.endpoints.alternative_me = uri.clone();
    config.endpoints.treasury = uri;
    config.fx.sources = vec![FxSourceKind::ExchangerateApi];
    config.http.timeout = Duration::from_secs(2);
    config
}

pub fn registry_row(id: &str, symbol: &str, market_cap: f64, change: f64) -> Value {
    json!({
        "id": id,
        "symbol": symbol,
        "name": id,
        "image": format!("https://img.example/{id}.png"),
        "current_price": 1.0,
        "market_cap": market_cap,
        "price_change_percentage_24h": change,
        "market_cap_change_percentage_24h": change / 2.0,
    })
}

/// BTC and ETH on every venue; XYZ only in the registry.
pub fn registry_body() -> Value {
    json!([
        registry_row("bitcoin", "btc", 2.0e12, 2.5),
        registry_row("ethereum", "eth", 4.0e11, -1.0),
        registry_row("xyz-token", "xyz", 1.0e9, 10.0),
    ])
}

pub fn upbit_markets_body() -> Value {
    json!([
        {"market": "KRW-BTC", "korean_name": "비트코인", "english_name": "Bitcoin"},
        {"market": "KRW-ETH", "korean_name": "이더리움", "english_name": "Ethereum"},
        {"market": "BTC-ETH", "korean_name": "이더리움", "english_name": "Ethereum"}
    ])
}

pub fn upbit_tickers_body() -> Value {
    json!([
        {"market": "KRW-BTC", "trade_price": 150000000.0, "change": "RISE"},
        {"market": "KRW-ETH", "trade_price": 5000000.0, "change": "FALL"}
    ])
}

pub fn binance_exchange_info_body() -> Value {
    json!({
        "timezone": "UTC",
        "symbols": [
            {"symbol": "BTCUSDT", "status": "TRADING", "baseAsset": "BTC", "quoteAsset": "USDT"},
            {"symbol": "ETHUSDT", "status": "TRADING", "baseAsset": "ETH", "quoteAsset": "USDT"},
            {"symbol": "ETHBTC", "status": "TRADING", "baseAsset": "ETH", "quoteAsset": "BTC"},
            {"symbol": "XYZUSDT", "status": "BREAK", "baseAsset": "XYZ", "quoteAsset": "USDT"}
        ]
    })
}

pub fn binance_tickers_body() -> Value {
    json!([
        {"symbol": "BTCUSDT", "price": "100000.00000000"},
        {"symbol": "ETHUSDT", "price": "3500.00000000"}
    ])
}

pub fn coinbase_rates_body() -> Value {
    json!({
        "data": {
            "currency": "USD",
            "rates": {"BTC": "0.00001", "ETH": "0.0002", "KRW": "1390.5"}
        }
    })
}

pub fn exchangerate_body(krw: f64) -> Value {
    json!({"base": "USD", "date": "2024-06-01", "rates": {"USD": 1, "KRW": krw}})
}

pub fn fng_body() -> Value {
    json!({
        "name": "Fear and Greed Index",
        "data": [
            {"value": "72", "value_classification": "Greed", "timestamp": "1717286400"},
            {"value": "40", "value_classification": "Fear", "timestamp": "1717200000"}
        ]
    })
}

pub fn global_body() -> Value {
    json!({
        "data": {
            "total_market_cap": {"usd": 2.4e12, "krw": 3.3e15},
            "market_cap_percentage": {"btc": 57.3, "eth": 15.1},
            "market_cap_change_percentage_24h_usd": 1.2
        }
    })
}

pub fn chart_body() -> Value {
    json!({
        "prices": [[1717200000000_i64, 67000.5], [1717286400000_i64, 68340.51]],
        "market_caps": [[1717200000000_i64, 1.32e12], [1717286400000_i64, 1.35e12]],
        "total_volumes": [[1717200000000_i64, 2.1e10], [1717286400000_i64, 2.4e10]]
    })
}

pub const TREASURY_PATH: &str =
    "/services/api/fiscal_service/v1/accounting/od/avg_interest_rates";

pub fn treasury_body(rate: &str) -> Value {
    json!({
        "data": [{
            "record_date": "2026-09-30",
            "security_type_desc": "Marketable",
            "avg_interest_rate_amt": rate
        }],
        "meta": {"count": 1}
    })
}

pub async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string("upstream unavailable"))
        .mount(server)
        .await;
}

pub async fn mount_registry(server: &MockServer) {
    mount_json(server, "/coins/markets", registry_body()).await;
}

pub async fn mount_fx(server: &MockServer, krw: f64) {
    mount_json(server, "/v4/latest/USD", exchangerate_body(krw)).await;
}

pub async fn mount_upbit(server: &MockServer) {
    mount_json(server, "/v1/market/all", upbit_markets_body()).await;
    mount_json(server, "/v1/ticker", upbit_tickers_body()).await;
}

pub async fn mount_binance(server: &MockServer) {
    mount_json(server, "/api/v3/exchangeInfo", binance_exchange_info_body()).await;
    mount_json(server, "/api/v3/ticker/price", binance_tickers_body()).await;
}

pub async fn mount_coinbase(server: &MockServer) {
    mount_json(server, "/v2/exchange-rates", coinbase_rates_body()).await;
}

/// Every upstream healthy, USD/KRW at 1400.
pub async fn mount_healthy_market(server: &MockServer) {
    mount_registry(server).await;
    mount_fx(server, 1400.0).await;
    mount_upbit(server).await;
    mount_binance(server).await;
    mount_coinbase(server).await;
}

pub async fn requests_to(server: &MockServer, route: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == route)
        .collect()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}
