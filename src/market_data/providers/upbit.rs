//! Upbit KRW spot venue.
//!
//! Markets are keyed `KRW-BTC`. A batched `/v1/ticker` request that names a
//! single unknown market fails as a whole, so keys should come from the
//! listing first.

use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::get_json;
use crate::market_data::filter::{MarketConvention, VenueListing};
use crate::market_data::models::{rows_from_value, UpbitTicker};
use crate::market_data::sources::SpotVenue;

const UPBIT_API_BASE: &str = "https://api.upbit.com";

#[derive(Debug, Deserialize)]
struct MarketRow {
    market: String,
}

#[derive(Debug, Clone)]
pub struct UpbitVenue {
    client: Client,
    base_url: String,
    convention: MarketConvention,
}

impl UpbitVenue {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: UPBIT_API_BASE.to_string(),
            convention: MarketConvention::QuotePrefix("KRW".to_string()),
        }
    }

    /// Override API base URL (useful for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_quote_currency(mut self, quote: impl Into<String>) -> Self {
        self.convention = MarketConvention::QuotePrefix(quote.into().to_uppercase());
        self
    }
}

impl Default for UpbitVenue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SpotVenue for UpbitVenue {
    type Ticker = UpbitTicker;

    fn convention(&self) -> &MarketConvention {
        &self.convention
    }

    async fn fetch_listing(&self) -> Result<VenueListing> {
        let body = get_json(&self.client, "Upbit", &self.base_url, "/v1/market/all", &[]).await?;
        let rows: Vec<MarketRow> = rows_from_value(body);
        let listing = VenueListing::from_market_keys(rows.iter().map(|r| &r.market), &self.convention);
        debug!(markets = rows.len(), listed = listing.len(), "loaded Upbit listing");
        Ok(listing)
    }

    async fn fetch_tickers(&self, market_keys: &[String]) -> Result<Vec<UpbitTicker>> {
        if market_keys.is_empty() {
            return Ok(Vec::new());
        }

        let markets = market_keys.join(",");
        let body = get_json(
            &self.client,
            "Upbit",
            &self.base_url,
            "/v1/ticker",
            &[("markets", markets.as_str())],
        )
        .await?;

        Ok(rows_from_value(body))
    }

    fn name(&self) -> &str {
        "upbit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_convention_is_krw_prefix() {
        let venue = UpbitVenue::new();
        assert_eq!(venue.convention().market_key("BTC"), "KRW-BTC");
        assert_eq!(
            venue.with_quote_currency("btc").convention().market_key("ETH"),
            "BTC-ETH"
        );
    }

    #[tokio::test]
    async fn empty_key_set_skips_the_request() {
        let venue = UpbitVenue::new().with_base_url("http://127.0.0.1:9");
        assert!(venue.fetch_tickers(&[]).await.unwrap().is_empty());
    }
}
