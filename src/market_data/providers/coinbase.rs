//! Coinbase exchange rates.
//!
//! `/v2/exchange-rates?currency=USD` lists how many units of each currency
//! (crypto included) one USD buys. A USD price is the reciprocal.

use anyhow::Result;
use reqwest::Client;
use serde_json::Value;

use super::get_json;
use crate::market_data::models::{rates_from_value, ReferenceRates};
use crate::market_data::sources::ReferenceRateSource;

const COINBASE_API_BASE: &str = "https://api.coinbase.com";

#[derive(Debug, Clone)]
pub struct CoinbaseRateSource {
    client: Client,
    base_url: String,
}

impl CoinbaseRateSource {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: COINBASE_API_BASE.to_string(),
        }
    }

    /// Override API base URL (useful for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for CoinbaseRateSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ReferenceRateSource for CoinbaseRateSource {
    async fn fetch_rates(&self, base_currency: &str) -> Result<ReferenceRates> {
        let currency = base_currency.to_uppercase();
        let mut body = get_json(
            &self.client,
            "Coinbase",
            &self.base_url,
            "/v2/exchange-rates",
            &[("currency", currency.as_str())],
        )
        .await?;

        let rates = body
            .get_mut("data")
            .and_then(|data| data.get_mut("rates"))
            .map(Value::take)
            .unwrap_or(Value::Null);
        Ok(rates_from_value(rates))
    }

    fn name(&self) -> &str {
        "coinbase"
    }
}
