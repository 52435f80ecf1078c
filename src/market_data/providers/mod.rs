pub mod alternative_me;
pub mod binance;
pub mod coinbase;
pub mod coingecko;
pub mod exchangerate_api;
pub mod frankfurter;
pub mod treasury;
pub mod upbit;

pub use alternative_me::AlternativeMeSentimentSource;
pub use binance::BinanceVenue;
pub use coinbase::CoinbaseRateSource;
pub use coingecko::CoinGeckoSource;
pub use exchangerate_api::ExchangeRateApiSource;
pub use frankfurter::FrankfurterRateSource;
pub use treasury::TreasuryRateSource;
pub use upbit::UpbitVenue;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde_json::Value;

/// GET `{base_url}{path}` and return the JSON body.
///
/// Non-2xx statuses become errors carrying the status and body. The body is
/// returned as a raw [`Value`] so callers can decode it leniently.
pub(crate) async fn get_json(
    client: &Client,
    api: &str,
    base_url: &str,
    path: &str,
    query: &[(&str, &str)],
) -> Result<Value> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), path);

    let response = client
        .get(&url)
        .header("Accept", "application/json")
        .query(query)
        .send()
        .await
        .with_context(|| format!("{api} HTTP request failed"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("{api} API error: {status} - {body}"));
    }

    response
        .json::<Value>()
        .await
        .with_context(|| format!("Failed to parse {api} JSON response"))
}
