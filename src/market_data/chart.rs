//! Price history for one asset, as plotted by the dashboard chart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_CHART_COIN: &str = "bitcoin";
pub const DEFAULT_CHART_DAYS: u32 = 7;
/// CoinGecko serves at most a year of history on the public tier.
pub const MAX_CHART_DAYS: u32 = 365;

/// One `[timestamp_ms, value]` sample. Serializes in the same pair shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint(pub i64, pub f64);

impl ChartPoint {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.0)
    }

    pub fn value(&self) -> f64 {
        self.1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketChart {
    pub prices: Vec<ChartPoint>,
    #[serde(default)]
    pub market_caps: Vec<ChartPoint>,
    #[serde(default)]
    pub total_volumes: Vec<ChartPoint>,
}

impl MarketChart {
    /// Decode a `/coins/{id}/market_chart` body. Series that are missing or
    /// not arrays read as empty; samples that are not numeric pairs are
    /// skipped.
    pub fn from_value(mut body: Value) -> Self {
        let mut series = |name: &str| {
            body.get_mut(name)
                .map(Value::take)
                .map(points_from_value)
                .unwrap_or_default()
        };
        Self {
            prices: series("prices"),
            market_caps: series("market_caps"),
            total_volumes: series("total_volumes"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn latest_price(&self) -> Option<f64> {
        self.prices.last().map(ChartPoint::value)
    }

    /// Percent change from the first to the last price sample.
    pub fn change_percent(&self) -> Option<f64> {
        let first = self.prices.first()?.value();
        let last = self.prices.last()?.value();
        if first > 0.0 {
            Some((last - first) / first * 100.0)
        } else {
            None
        }
    }
}

/// A validated chart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartQuery {
    pub coin_id: String,
    pub days: u32,
}

impl ChartQuery {
    /// CoinGecko ids are lowercase slugs (`bitcoin`, `matic-network`). Anything
    /// else is rejected before it reaches the URL path.
    pub fn new(coin_id: &str, days: u32) -> anyhow::Result<Self> {
        let coin_id = coin_id.trim().to_lowercase();
        let valid = !coin_id.is_empty()
            && coin_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
        if !valid || coin_id.starts_with('.') {
            anyhow::bail!("invalid coin id: {coin_id:?}");
        }
        if days == 0 || days > MAX_CHART_DAYS {
            anyhow::bail!("days must be between 1 and {MAX_CHART_DAYS}, got {days}");
        }
        Ok(Self { coin_id, days })
    }
}

impl Default for ChartQuery {
    fn default() -> Self {
        Self {
            coin_id: DEFAULT_CHART_COIN.to_string(),
            days: DEFAULT_CHART_DAYS,
        }
    }
}

fn points_from_value(value: Value) -> Vec<ChartPoint> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let pair = item.as_array()?;
            let (ts, v) = (pair.first()?.as_f64()?, pair.get(1)?.as_f64()?);
            (ts.is_finite() && v.is_finite()).then_some(ChartPoint(ts as i64, v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_series_and_skips_bad_samples() {
        let chart = MarketChart::from_value(json!({
            "prices": [[1717200000000_i64, 67000.5], [1717203600000_i64, null], "x", [1717207200000_i64, 68340.51]],
            "market_caps": [[1717200000000_i64, 1.3e12]],
            "total_volumes": {"error": "n/a"}
        }));

        assert_eq!(chart.prices.len(), 2);
        assert_eq!(chart.market_caps.len(), 1);
        assert!(chart.total_volumes.is_empty());
        assert_eq!(chart.latest_price(), Some(68340.51));
        assert_eq!(
            chart.prices[0].timestamp().map(|t| t.timestamp()),
            Some(1_717_200_000)
        );
        let change = chart.change_percent().unwrap();
        assert!((change - 2.0).abs() < 1e-9);
    }

    #[test]
    fn serializes_points_as_pairs() {
        let chart = MarketChart {
            prices: vec![ChartPoint(1, 2.5)],
            ..MarketChart::default()
        };
        let value = serde_json::to_value(&chart).unwrap();
        assert_eq!(value["prices"], json!([[1, 2.5]]));
    }

    #[test]
    fn query_rejects_path_like_ids_and_bad_ranges() {
        assert!(ChartQuery::new("../coins", 7).is_err());
        assert!(ChartQuery::new("", 7).is_err());
        assert!(ChartQuery::new("bitcoin", 0).is_err());
        assert!(ChartQuery::new("bitcoin", 366).is_err());

        let query = ChartQuery::new(" Matic-Network ", 30).unwrap();
        assert_eq!(query.coin_id, "matic-network");
        assert_eq!(query.days, 30);
    }
}
