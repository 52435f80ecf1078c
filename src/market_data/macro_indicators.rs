//! Macro backdrop shown beside the crypto figures.
//!
//! Only the Treasury average interest rate has a live source. Every other
//! figure is a fixed baseline, and the whole reading falls back to the
//! baseline when the Treasury feed is unavailable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroIndicator {
    pub value: f64,
    pub change: f64,
    pub label: String,
}

impl MacroIndicator {
    fn new(value: f64, change: f64, label: &str) -> Self {
        Self {
            value,
            change,
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroIndicators {
    pub us10y: MacroIndicator,
    pub us2y: MacroIndicator,
    pub dxy: MacroIndicator,
    pub sp500: MacroIndicator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FedOutlook {
    pub forecast: String,
    pub sentiment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroAnalysis {
    pub impact: String,
    pub correlation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroSnapshot {
    pub indicators: MacroIndicators,
    pub fed: FedOutlook,
    pub analysis: MacroAnalysis,
    /// Record date of the Treasury rate, when one was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treasury_record_date: Option<NaiveDate>,
}

impl MacroSnapshot {
    pub fn baseline() -> Self {
        Self {
            indicators: MacroIndicators {
                us10y: MacroIndicator::new(4.12, -0.05, "US 10Y Yield"),
                us2y: MacroIndicator::new(4.35, -0.02, "US 2Y Yield"),
                dxy: MacroIndicator::new(103.52, 0.12, "US Dollar Index"),
                sp500: MacroIndicator::new(5120.40, 12.5, "S&P 500"),
            },
            fed: FedOutlook {
                forecast: "72% Chance of 25bps Cut".to_string(),
                sentiment: "Cautiously Optimistic".to_string(),
            },
            analysis: MacroAnalysis {
                impact: "Stable liquidity environment. Positive for BTC as long as DXY stays below 104."
                    .to_string(),
                correlation: "BTC/DXY Inverse Correlation (-0.85)".to_string(),
            },
            treasury_record_date: None,
        }
    }

    /// Baseline with the 10Y figure replaced by a usable Treasury rate.
    pub fn with_treasury_rate(mut self, rate: TreasuryRate) -> Self {
        if rate.rate.is_finite() && rate.rate > 0.0 {
            self.indicators.us10y.value = rate.rate;
            self.treasury_record_date = rate.record_date;
        }
        self
    }
}

impl Default for MacroSnapshot {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Latest average interest rate on Treasury debt, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreasuryRate {
    pub rate: f64,
    pub record_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn treasury_rate_replaces_ten_year_yield() {
        let date = NaiveDate::from_ymd_opt(2026, 9, 30);
        let snapshot = MacroSnapshot::baseline().with_treasury_rate(TreasuryRate {
            rate: 3.35,
            record_date: date,
        });

        assert_eq!(snapshot.indicators.us10y.value, 3.35);
        assert_eq!(snapshot.indicators.us2y.value, 4.35);
        assert_eq!(snapshot.treasury_record_date, date);
    }

    #[test]
    fn unusable_rate_keeps_baseline() {
        for rate in [0.0, -1.0, f64::NAN] {
            let snapshot = MacroSnapshot::baseline().with_treasury_rate(TreasuryRate {
                rate,
                record_date: None,
            });
            assert_eq!(snapshot, MacroSnapshot::baseline());
        }
    }

    #[test]
    fn serializes_in_dashboard_shape() {
        let value = serde_json::to_value(MacroSnapshot::baseline()).unwrap();
        assert_eq!(value["indicators"]["dxy"]["label"], "US Dollar Index");
        assert_eq!(value["fed"]["sentiment"], "Cautiously Optimistic");
        assert!(value.get("treasuryRecordDate").is_none());
    }
}
