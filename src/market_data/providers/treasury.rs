//! US Treasury Fiscal Data: average interest rate on marketable debt.

use anyhow::Result;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::get_json;
use crate::market_data::macro_indicators::TreasuryRate;
use crate::market_data::models::rows_from_value;
use crate::market_data::sources::MacroRateSource;

const TREASURY_API_BASE: &str = "https://api.fiscaldata.treasury.gov";
const AVG_INTEREST_RATES_PATH: &str =
    "/services/api/fiscal_service/v1/accounting/od/avg_interest_rates";

/// Fiscal Data returns every field as a string.
#[derive(Debug, Deserialize)]
struct RateRow {
    #[serde(default)]
    record_date: Option<String>,
    avg_interest_rate_amt: String,
}

impl RateRow {
    fn into_rate(self) -> Option<TreasuryRate> {
        let rate: f64 = self.avg_interest_rate_amt.trim().parse().ok()?;
        let record_date = self
            .record_date
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok());
        Some(TreasuryRate { rate, record_date })
    }
}

#[derive(Debug, Clone)]
pub struct TreasuryRateSource {
    client: Client,
    base_url: String,
}

impl TreasuryRateSource {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: TREASURY_API_BASE.to_string(),
        }
    }

    /// Override API base URL (useful for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for TreasuryRateSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MacroRateSource for TreasuryRateSource {
    async fn fetch_latest_rate(&self) -> Result<Option<TreasuryRate>> {
        let mut body = get_json(
            &self.client,
            "Treasury",
            &self.base_url,
            AVG_INTEREST_RATES_PATH,
            &[("sort", "-record_date"), ("limit", "1")],
        )
        .await?;

        let data = body.get_mut("data").map(Value::take).unwrap_or(Value::Null);
        let rows: Vec<RateRow> = rows_from_value(data);
        Ok(rows
            .into_iter()
            .filter_map(RateRow::into_rate)
            .find(|r| r.rate.is_finite() && r.rate > 0.0))
    }

    fn name(&self) -> &str {
        "treasury"
    }
}
