//! Re-sorting of reconciled rows for display.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};

use super::models::ReconciledAsset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Symbol,
    #[default]
    MarketCap,
    MarketCapChange24h,
    BinancePrice,
    Change24h,
    UpbitPrice,
    KimchiPremium,
    CoinbasePremium,
}

impl SortKey {
    pub const ALL: [SortKey; 8] = [
        SortKey::Symbol,
        SortKey::MarketCap,
        SortKey::MarketCapChange24h,
        SortKey::BinancePrice,
        SortKey::Change24h,
        SortKey::UpbitPrice,
        SortKey::KimchiPremium,
        SortKey::CoinbasePremium,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Symbol => "symbol",
            SortKey::MarketCap => "marketCap",
            SortKey::MarketCapChange24h => "marketCapChange24h",
            SortKey::BinancePrice => "binancePrice",
            SortKey::Change24h => "change24h",
            SortKey::UpbitPrice => "upbitPrice",
            SortKey::KimchiPremium => "kimchiPremium",
            SortKey::CoinbasePremium => "coinbasePremium",
        }
    }

    fn number(self, asset: &ReconciledAsset) -> f64 {
        match self {
            SortKey::Symbol => 0.0,
            SortKey::MarketCap => asset.market_cap,
            SortKey::MarketCapChange24h => asset.market_cap_change24h,
            SortKey::BinancePrice => asset.binance_price,
            SortKey::Change24h => asset.change24h,
            SortKey::UpbitPrice => asset.upbit_price,
            SortKey::KimchiPremium => asset.kimchi_premium,
            SortKey::CoinbasePremium => asset.coinbase_premium,
        }
    }

    fn compare(self, a: &ReconciledAsset, b: &ReconciledAsset) -> Ordering {
        match self {
            SortKey::Symbol => a.symbol.cmp(&b.symbol),
            key => key.number(a).total_cmp(&key.number(b)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = Error;

    /// Accepts the camelCase field name, case-insensitively, with `-`/`_`
    /// separators ignored (`market-cap`, `kimchi_premium`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str().to_ascii_lowercase() == wanted)
            .ok_or_else(|| anyhow!("Unknown sort key: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(anyhow!("Unknown sort direction: {other}")),
        }
    }
}

/// Current table ordering. Selecting the active key flips direction; a new
/// key starts descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortOrder {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    pub fn select(self, key: SortKey) -> Self {
        if key == self.key {
            Self::new(key, self.direction.toggled())
        } else {
            Self::new(key, SortDirection::Desc)
        }
    }

    /// Stable sort: ties keep their registry order in either direction.
    pub fn apply(self, assets: &mut [ReconciledAsset]) {
        assets.sort_by(|a, b| {
            let ord = self.key.compare(a, b);
            match self.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }
}
