//! Fear & Greed index readings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Index value shown when no reading is available.
pub const NEUTRAL_SENTIMENT: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentReading {
    /// 0 (extreme fear) to 100 (extreme greed).
    pub value: u32,
    pub classification: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentBand {
    ExtremeFear,
    Fear,
    Greed,
    ExtremeGreed,
}

impl SentimentBand {
    pub fn for_value(value: u32) -> Self {
        match value {
            75.. => SentimentBand::ExtremeGreed,
            50..=74 => SentimentBand::Greed,
            25..=49 => SentimentBand::Fear,
            _ => SentimentBand::ExtremeFear,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SentimentBand::ExtremeFear => "Extreme Fear",
            SentimentBand::Fear => "Fear",
            SentimentBand::Greed => "Greed",
            SentimentBand::ExtremeGreed => "Extreme Greed",
        }
    }
}

/// Latest reading plus recent history, newest first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentIndex {
    pub history: Vec<SentimentReading>,
}

impl SentimentIndex {
    pub fn new(mut history: Vec<SentimentReading>) -> Self {
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Self { history }
    }

    pub fn latest(&self) -> Option<&SentimentReading> {
        self.history.first()
    }

    /// Latest value, or [`NEUTRAL_SENTIMENT`] when there is none.
    pub fn value(&self) -> u32 {
        self.latest().map_or(NEUTRAL_SENTIMENT, |r| r.value)
    }

    pub fn band(&self) -> SentimentBand {
        SentimentBand::for_value(self.value())
    }

    /// History oldest first, for sparklines.
    pub fn chronological(&self) -> impl Iterator<Item = &SentimentReading> {
        self.history.iter().rev()
    }

    /// The reading published on the same UTC day as `at`.
    pub fn on_day(&self, at: DateTime<Utc>) -> Option<&SentimentReading> {
        let day = at.date_naive();
        self.history.iter().find(|r| r.timestamp.date_naive() == day)
    }
}
