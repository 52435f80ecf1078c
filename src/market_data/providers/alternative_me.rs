//! Alternative.me Crypto Fear & Greed index.

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::get_json;
use crate::market_data::models::rows_from_value;
use crate::market_data::sentiment::SentimentReading;
use crate::market_data::sources::SentimentSource;

const ALTERNATIVE_ME_API_BASE: &str = "https://api.alternative.me";

/// Numeric fields arrive as strings (`"value": "45"`).
#[derive(Debug, Deserialize)]
struct FngRow {
    value: String,
    #[serde(default)]
    value_classification: String,
    timestamp: String,
}

impl FngRow {
    fn into_reading(self) -> Option<SentimentReading> {
        let value: u32 = self.value.trim().parse().ok()?;
        let secs: i64 = self.timestamp.trim().parse().ok()?;
        let timestamp = DateTime::<Utc>::from_timestamp(secs, 0)?;
        Some(SentimentReading {
            value: value.min(100),
            classification: self.value_classification,
            timestamp,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AlternativeMeSentimentSource {
    client: Client,
    base_url: String,
}

impl AlternativeMeSentimentSource {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: ALTERNATIVE_ME_API_BASE.to_string(),
        }
    }

    /// Override API base URL (useful for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for AlternativeMeSentimentSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SentimentSource for AlternativeMeSentimentSource {
    async fn fetch_history(&self, limit: usize) -> Result<Vec<SentimentReading>> {
        let limit = limit.max(1).to_string();
        let mut body = get_json(
            &self.client,
            "Alternative.me",
            &self.base_url,
            "/fng/",
            &[("limit", limit.as_str())],
        )
        .await?;

        let data = body.get_mut("data").map(Value::take).unwrap_or(Value::Null);
        let rows: Vec<FngRow> = rows_from_value(data);
        let total = rows.len();
        let readings: Vec<SentimentReading> =
            rows.into_iter().filter_map(FngRow::into_reading).collect();
        if readings.len() < total {
            debug!(skipped = total - readings.len(), "skipped malformed Fear & Greed rows");
        }
        Ok(readings)
    }

    fn name(&self) -> &str {
        "alternative.me"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_string_fields() {
        let row = FngRow {
            value: "72".to_string(),
            value_classification: "Greed".to_string(),
            timestamp: "1717200000".to_string(),
        };
        let reading = row.into_reading().unwrap();
        assert_eq!(reading.value, 72);
        assert_eq!(reading.timestamp.timestamp(), 1_717_200_000);
    }

    #[test]
    fn rejects_unparseable_rows() {
        let row = FngRow {
            value: "n/a".to_string(),
            value_classification: String::new(),
            timestamp: "1717200000".to_string(),
        };
        assert!(row.into_reading().is_none());
    }
}
