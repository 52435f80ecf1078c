//! Binance USD-stablecoin spot venue.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::get_json;
use crate::market_data::filter::{MarketConvention, VenueListing};
use crate::market_data::models::{rows_from_value, BinanceTicker};
use crate::market_data::sources::SpotVenue;

const BINANCE_API_BASE: &str = "https://api.binance.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    status: String,
    base_asset: String,
    quote_asset: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    #[serde(default)]
    symbols: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct BinanceVenue {
    client: Client,
    base_url: String,
    convention: MarketConvention,
}

impl BinanceVenue {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: BINANCE_API_BASE.to_string(),
            convention: MarketConvention::QuoteSuffix("USDT".to_string()),
        }
    }

    /// Override API base URL (useful for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_quote_asset(mut self, quote: impl Into<String>) -> Self {
        self.convention = MarketConvention::QuoteSuffix(quote.into().to_uppercase());
        self
    }
}

impl Default for BinanceVenue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SpotVenue for BinanceVenue {
    type Ticker = BinanceTicker;

    fn convention(&self) -> &MarketConvention {
        &self.convention
    }

    /// Symbols with `status == TRADING` quoted in this venue's quote asset.
    async fn fetch_listing(&self) -> Result<VenueListing> {
        let body = get_json(&self.client, "Binance", &self.base_url, "/api/v3/exchangeInfo", &[])
            .await?;
        let info: ExchangeInfo =
            serde_json::from_value(body).context("Unexpected Binance exchangeInfo response")?;

        let quote = self.convention.quote();
        let symbols: Vec<SymbolInfo> = rows_from_value(info.symbols);
        let listing = VenueListing::new(
            symbols
                .iter()
                .filter(|s| s.status == "TRADING" && s.quote_asset.eq_ignore_ascii_case(quote))
                .map(|s| &s.base_asset),
        );
        debug!(symbols = symbols.len(), listed = listing.len(), "loaded Binance listing");
        Ok(listing)
    }

    async fn fetch_tickers(&self, market_keys: &[String]) -> Result<Vec<BinanceTicker>> {
        if market_keys.is_empty() {
            return Ok(Vec::new());
        }

        let symbols = serde_json::to_string(market_keys)?;
        let body = get_json(
            &self.client,
            "Binance",
            &self.base_url,
            "/api/v3/ticker/price",
            &[("symbols", symbols.as_str())],
        )
        .await?;

        Ok(rows_from_value(body))
    }

    fn name(&self) -> &str {
        "binance"
    }
}
