//! Frankfurter FX rate provider using ECB daily reference rates.
//!
//! Used as the secondary USD->KRW source. ECB publishes rates against EUR;
//! Frankfurter does the cross-rate server side when `from` is not EUR.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use super::get_json;
use crate::market_data::sources::FxRateSource;

const FRANKFURTER_BASE_URL: &str = "https://api.frankfurter.app";

#[derive(Debug, Deserialize)]
struct FrankfurterResponse {
    #[allow(dead_code)]
    base: String,
    /// Publication date of the rates (ECB does not publish on weekends).
    #[allow(dead_code)]
    date: NaiveDate,
    rates: HashMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct FrankfurterRateSource {
    client: Client,
    base_url: String,
}

impl FrankfurterRateSource {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: FRANKFURTER_BASE_URL.to_string(),
        }
    }

    /// Override API base URL (useful for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for FrankfurterRateSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FxRateSource for FrankfurterRateSource {
    async fn fetch_rate(&self, base: &str, quote: &str) -> Result<Option<f64>> {
        let base_upper = base.to_uppercase();
        let quote_upper = quote.to_uppercase();

        if base_upper == quote_upper {
            return Ok(Some(1.0));
        }

        let body = get_json(
            &self.client,
            "Frankfurter",
            &self.base_url,
            "/latest",
            &[("from", base_upper.as_str()), ("to", quote_upper.as_str())],
        )
        .await?;
        let response: FrankfurterResponse =
            serde_json::from_value(body).context("Unexpected Frankfurter response")?;

        Ok(response.rates.get(&quote_upper).copied())
    }

    fn name(&self) -> &str {
        "frankfurter"
    }
}
