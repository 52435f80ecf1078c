//! CoinGecko registry and global market provider.
//!
//! `/coins/markets` supplies the ranked asset list the rest of the pipeline
//! joins on; `/global` supplies market cap dominance and
//! `/coins/{id}/market_chart` the price history chart. No API key is required
//! for the public tier, but rate limits are tight, so callers should cache.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;

use super::get_json;
use crate::market_data::chart::{ChartQuery, MarketChart};
use crate::market_data::dominance::GlobalMarket;
use crate::market_data::models::{rows_from_value, AssetMeta};
use crate::market_data::sources::{CoinRegistrySource, GlobalMarketSource, MarketChartSource};

const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Deserialize)]
struct GlobalResponse {
    data: GlobalData,
}

#[derive(Debug, Deserialize)]
struct GlobalData {
    #[serde(default)]
    market_cap_percentage: HashMap<String, f64>,
    #[serde(default)]
    total_market_cap: HashMap<String, f64>,
    #[serde(default)]
    market_cap_change_percentage_24h_usd: Option<f64>,
}

/// CoinGecko market data provider.
#[derive(Debug, Clone)]
pub struct CoinGeckoSource {
    client: Client,
    base_url: String,
    /// Currency market caps are ranked in (e.g. "usd").
    vs_currency: String,
}

impl CoinGeckoSource {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: COINGECKO_API_BASE.to_string(),
            vs_currency: "usd".to_string(),
        }
    }

    /// Override API base URL (useful for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_vs_currency(mut self, currency: impl Into<String>) -> Self {
        self.vs_currency = currency.into().to_lowercase();
        self
    }
}

impl Default for CoinGeckoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CoinRegistrySource for CoinGeckoSource {
    async fn fetch_top_assets(&self, limit: usize) -> Result<Vec<AssetMeta>> {
        let per_page = limit.clamp(1, 250).to_string();
        let body = get_json(
            &self.client,
            "CoinGecko",
            &self.base_url,
            "/coins/markets",
            &[
                ("vs_currency", self.vs_currency.as_str()),
                ("order", "market_cap_desc"),
                ("per_page", per_page.as_str()),
                ("page", "1"),
                ("sparkline", "false"),
            ],
        )
        .await?;

        if !body.is_array() {
            return Err(anyhow!("CoinGecko markets response was not a list"));
        }

        let mut assets: Vec<AssetMeta> = rows_from_value(body);
        assets.retain(|a| !a.symbol.trim().is_empty());
        assets.truncate(limit);
        Ok(assets)
    }

    fn name(&self) -> &str {
        "coingecko"
    }
}

#[async_trait::async_trait]
impl GlobalMarketSource for CoinGeckoSource {
    async fn fetch_global(&self) -> Result<GlobalMarket> {
        let body = get_json(&self.client, "CoinGecko", &self.base_url, "/global", &[]).await?;
        let response: GlobalResponse = serde_json::from_value(body)
            .map_err(|e| anyhow!("Unexpected CoinGecko global response: {e}"))?;

        let data = response.data;
        Ok(GlobalMarket {
            market_cap_percentage: data.market_cap_percentage,
            total_market_cap_usd: data.total_market_cap.get("usd").copied().unwrap_or(0.0),
            market_cap_change_24h: data.market_cap_change_percentage_24h_usd.unwrap_or(0.0),
        })
    }

    fn name(&self) -> &str {
        "coingecko"
    }
}

#[async_trait::async_trait]
impl MarketChartSource for CoinGeckoSource {
    async fn fetch_chart(&self, query: &ChartQuery) -> Result<MarketChart> {
        let path = format!("/coins/{}/market_chart", query.coin_id);
        let days = query.days.to_string();
        let body = get_json(
            &self.client,
            "CoinGecko",
            &self.base_url,
            &path,
            &[("vs_currency", self.vs_currency.as_str()), ("days", days.as_str())],
        )
        .await?;

        if !body.is_object() {
            return Err(anyhow!("CoinGecko market chart response was not an object"));
        }
        Ok(MarketChart::from_value(body))
    }

    fn name(&self) -> &str {
        "coingecko"
    }
}
