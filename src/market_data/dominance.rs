//! Market cycle phase from BTC dominance.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Above this BTC dominance (percent) capital is concentrated in BTC.
pub const BTC_HEAVY_DOMINANCE: f64 = 55.0;
/// Below this BTC dominance (percent) capital has rotated into alts.
pub const ALT_HEAVY_DOMINANCE: f64 = 45.0;

/// Aggregate market figures from CoinGecko `/global`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GlobalMarket {
    /// Share of total market cap per lowercase symbol, in percent.
    pub market_cap_percentage: HashMap<String, f64>,
    #[serde(default)]
    pub total_market_cap_usd: f64,
    #[serde(default)]
    pub market_cap_change_24h: f64,
}

impl GlobalMarket {
    pub fn dominance(&self, symbol: &str) -> Option<f64> {
        self.market_cap_percentage
            .get(&symbol.to_lowercase())
            .copied()
            .filter(|v| v.is_finite())
    }

    pub fn btc_dominance(&self) -> Option<f64> {
        self.dominance("btc")
    }

    /// Everything that is not BTC.
    pub fn alt_dominance(&self) -> Option<f64> {
        self.btc_dominance().map(|btc| (100.0 - btc).max(0.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DominancePhase {
    /// BTC dominant and rising.
    BtcLead,
    /// BTC dominant while falling: capital hiding in BTC.
    BtcSafeHaven,
    /// Alts dominant and BTC rising.
    AltSeason,
    /// Alts dominant while BTC falls.
    MarketRebound,
    Neutral,
}

impl DominancePhase {
    pub fn classify(btc_dominance: f64, btc_change_24h: f64) -> Self {
        let rising = btc_change_24h > 0.0;
        if btc_dominance > BTC_HEAVY_DOMINANCE {
            if rising {
                DominancePhase::BtcLead
            } else {
                DominancePhase::BtcSafeHaven
            }
        } else if btc_dominance < ALT_HEAVY_DOMINANCE {
            if rising {
                DominancePhase::AltSeason
            } else {
                DominancePhase::MarketRebound
            }
        } else {
            DominancePhase::Neutral
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DominancePhase::BtcLead => "BTC lead",
            DominancePhase::BtcSafeHaven => "BTC safe haven",
            DominancePhase::AltSeason => "Alt season",
            DominancePhase::MarketRebound => "Market rebound",
            DominancePhase::Neutral => "Neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DominanceReading {
    pub btc_dominance: f64,
    pub alt_dominance: f64,
    pub btc_change24h: f64,
    pub phase: DominancePhase,
}

impl DominanceReading {
    /// `None` when the global figures carry no BTC dominance.
    pub fn from_global(global: &GlobalMarket, btc_change_24h: f64) -> Option<Self> {
        let btc_dominance = global.btc_dominance()?;
        let btc_change24h = if btc_change_24h.is_finite() {
            btc_change_24h
        } else {
            0.0
        };
        Some(Self {
            btc_dominance,
            alt_dominance: (100.0 - btc_dominance).max(0.0),
            btc_change24h,
            phase: DominancePhase::classify(btc_dominance, btc_change24h),
        })
    }
}
