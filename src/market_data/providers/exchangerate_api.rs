//! ExchangeRate-API open endpoint (`/v4/latest/{base}`). No key required;
//! rates refresh roughly daily.

use std::collections::HashMap;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

use super::get_json;
use crate::market_data::sources::FxRateSource;

const EXCHANGERATE_API_BASE: &str = "https://api.exchangerate-api.com";

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct ExchangeRateApiSource {
    client: Client,
    base_url: String,
}

impl ExchangeRateApiSource {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: EXCHANGERATE_API_BASE.to_string(),
        }
    }

    /// Override API base URL (useful for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for ExchangeRateApiSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FxRateSource for ExchangeRateApiSource {
    async fn fetch_rate(&self, base: &str, quote: &str) -> Result<Option<f64>> {
        let base = base.to_uppercase();
        let quote = quote.to_uppercase();
        if base == quote {
            return Ok(Some(1.0));
        }

        let path = format!("/v4/latest/{base}");
        let body = get_json(&self.client, "ExchangeRate-API", &self.base_url, &path, &[]).await?;
        let response: LatestResponse =
            serde_json::from_value(body).context("Unexpected ExchangeRate-API response")?;

        Ok(response.rates.get(&quote).copied())
    }

    fn name(&self) -> &str {
        "exchangerate-api"
    }
}
