use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Registry row for one asset, as returned by CoinGecko `/coins/markets`.
///
/// `symbol` is the join key into every venue. It is stored as received and
/// normalized to uppercase at join time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMeta {
    #[serde(default)]
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub market_cap: f64,
    #[serde(
        default,
        rename = "price_change_percentage_24h",
        deserialize_with = "number_or_zero"
    )]
    pub change_24h: f64,
    #[serde(
        default,
        rename = "market_cap_change_percentage_24h",
        deserialize_with = "number_or_zero"
    )]
    pub market_cap_change_24h: f64,
}

impl AssetMeta {
    /// A registry row with zeroed market statistics.
    pub fn placeholder(
        id: impl Into<String>,
        symbol: impl Into<String>,
        name: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
            image: image.into(),
            market_cap: 0.0,
            change_24h: 0.0,
            market_cap_change_24h: 0.0,
        }
    }
}

/// Upbit `/v1/ticker` row. `market` is encoded as `KRW-BTC`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpbitTicker {
    pub market: String,
    pub trade_price: f64,
}

/// Binance `/api/v3/ticker/price` row. `symbol` is encoded as `BTCUSDT`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinanceTicker {
    pub symbol: String,
    pub price: String,
}

/// Coinbase exchange rates keyed by currency code: units of that currency
/// bought by one USD.
pub type ReferenceRates = HashMap<String, String>;

/// USD quote rates. A missing or unreadable `KRW` reads as 0, which the
/// engine replaces with its fallback rate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FxRates {
    #[serde(rename = "KRW", default, deserialize_with = "number_or_numeric_string")]
    pub krw: f64,
}

/// Everything one refresh cycle gathered, in the shape served to clients.
///
/// Venue fields are empty when that venue contributed nothing this cycle.
/// Deserialization is lenient: a field of the wrong shape, or a single
/// malformed row, is dropped rather than failing the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataPayload {
    pub success: bool,
    #[serde(default, deserialize_with = "lenient_list")]
    pub coins: Vec<AssetMeta>,
    #[serde(default, deserialize_with = "lenient_fx")]
    pub rates: FxRates,
    #[serde(default, deserialize_with = "lenient_list")]
    pub upbit: Vec<UpbitTicker>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub binance: Vec<BinanceTicker>,
    #[serde(default, deserialize_with = "lenient_rates")]
    pub coinbase: ReferenceRates,
}

/// One normalized row of the premium table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledAsset {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: String,
    pub change24h: f64,
    pub market_cap: f64,
    pub market_cap_change24h: f64,
    /// USD, from the global spot venue.
    pub binance_price: f64,
    /// KRW, from the Korean venue.
    pub upbit_price: f64,
    /// USD, inverted from the reference rate.
    pub coinbase_price: f64,
    pub kimchi_premium: f64,
    pub coinbase_premium: f64,
}

impl ReconciledAsset {
    /// Whether both operands of the kimchi premium were usable.
    pub fn has_kimchi_premium(&self) -> bool {
        self.upbit_price > 0.0 && self.binance_price > 0.0
    }

    /// Whether both operands of the coinbase premium were usable.
    pub fn has_coinbase_premium(&self) -> bool {
        self.coinbase_price > 0.0 && self.binance_price > 0.0
    }
}

/// Where a dependency's value came from this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Fetched successfully (or served from a cache entry that is still fresh).
    Live,
    /// Last known value reused after the fetch failed.
    Cached,
    /// Hardcoded default; no value has ever been fetched.
    Fallback,
}

/// A dependency value plus whether it is stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub value: T,
    pub stale: bool,
    pub origin: Origin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> Sourced<T> {
    pub fn live(value: T, fetched_at: DateTime<Utc>) -> Self {
        Self {
            value,
            stale: false,
            origin: Origin::Live,
            fetched_at: Some(fetched_at),
        }
    }

    pub fn cached(value: T, fetched_at: DateTime<Utc>) -> Self {
        Self {
            value,
            stale: true,
            origin: Origin::Cached,
            fetched_at: Some(fetched_at),
        }
    }

    pub fn fallback(value: T) -> Self {
        Self {
            value,
            stale: true,
            origin: Origin::Fallback,
            fetched_at: None,
        }
    }
}

fn number_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()).unwrap_or(0.0))
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

/// Decode a JSON array into rows, skipping rows that do not decode.
/// Anything other than an array yields no rows.
pub fn rows_from_value<T: DeserializeOwned>(value: serde_json::Value) -> Vec<T> {
    let items = match value {
        serde_json::Value::Array(items) => items,
        other => {
            debug!(shape = json_shape(&other), "expected a JSON array, treating as empty");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

/// Decode a JSON object of string (or numeric) values.
/// Anything other than an object yields an empty map.
pub fn rates_from_value(value: serde_json::Value) -> ReferenceRates {
    let entries = match value {
        serde_json::Value::Object(entries) => entries,
        other => {
            debug!(shape = json_shape(&other), "expected a JSON object, treating as empty");
            return ReferenceRates::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|(code, rate)| match rate {
            serde_json::Value::String(s) => Some((code, s)),
            serde_json::Value::Number(n) => Some((code, n.to_string())),
            _ => None,
        })
        .collect()
}

fn json_shape(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(rows_from_value(value))
}

fn lenient_fx<'de, D>(deserializer: D) -> Result<FxRates, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_rates<'de, D>(deserializer: D) -> Result<ReferenceRates, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(rates_from_value(value))
}
