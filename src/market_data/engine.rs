//! Cross-venue reconciliation and premium derivation.
//!
//! A pure transformation: registry rows plus three venue ticker sets plus a
//! USD->KRW rate become one [`ReconciledAsset`] per priced asset. Nothing in
//! here fails; every lookup has a zero/absent fallback and both premium ratios
//! are guarded so the output never carries NaN, infinity or negative prices.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::filter::MarketConvention;
use super::models::{AssetMeta, MarketDataPayload, ReconciledAsset};

/// USD->KRW rate used whenever the FX provider has nothing usable.
pub const DEFAULT_FALLBACK_FX_RATE: f64 = 1400.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Quote currency of the Korean venue (`KRW-BTC`).
    pub krw_quote: String,
    /// Quote asset of the global spot venue (`BTCUSDT`).
    pub usd_quote_asset: String,
    /// USD-pegged symbol whose spot price is pinned to 1.
    pub stablecoin: String,
    pub fallback_fx_rate: f64,
    /// Registry id -> ticker the venues list that asset under.
    pub id_overrides: HashMap<String, String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            krw_quote: "KRW".to_string(),
            usd_quote_asset: "USDT".to_string(),
            stablecoin: "USDT".to_string(),
            fallback_fx_rate: DEFAULT_FALLBACK_FX_RATE,
            id_overrides: HashMap::new(),
        }
    }
}

impl EngineSettings {
    pub fn krw_convention(&self) -> MarketConvention {
        MarketConvention::QuotePrefix(self.krw_quote.trim().to_uppercase())
    }

    pub fn usd_convention(&self) -> MarketConvention {
        MarketConvention::QuoteSuffix(self.usd_quote_asset.trim().to_uppercase())
    }

    /// The symbol used to look `coin` up on every venue.
    pub fn venue_symbol(&self, coin: &AssetMeta) -> String {
        self.id_overrides
            .get(&coin.id)
            .map(String::as_str)
            .unwrap_or(&coin.symbol)
            .trim()
            .to_uppercase()
    }
}

/// Two or more registry rows that resolved to the same venue symbol.
///
/// Venues key tickers by symbol only, so only the first (highest ranked) row
/// can be priced honestly; the rest are dropped and reported here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolCollision {
    pub symbol: String,
    pub kept_id: String,
    pub dropped_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub assets: Vec<ReconciledAsset>,
    /// The USD->KRW rate actually applied.
    pub exchange_rate: f64,
    pub fx_fallback_used: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbol_collisions: Vec<SymbolCollision>,
    /// Symbols dropped because no venue priced them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unpriced: Vec<String>,
}

impl Reconciliation {
    pub fn summary(&self) -> PremiumSummary {
        PremiumSummary::from_assets(&self.assets)
    }

    pub fn asset(&self, symbol: &str) -> Option<&ReconciledAsset> {
        self.assets
            .iter()
            .find(|a| a.symbol.eq_ignore_ascii_case(symbol))
    }
}

/// Aggregate of one premium over the assets where it was computable.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PremiumStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl PremiumStats {
    fn from_values(values: impl Iterator<Item = f64>) -> Self {
        let mut stats = Self::default();
        let mut total = 0.0;
        for value in values {
            if stats.count == 0 {
                stats.min = value;
                stats.max = value;
            } else {
                stats.min = stats.min.min(value);
                stats.max = stats.max.max(value);
            }
            total += value;
            stats.count += 1;
        }
        if stats.count > 0 {
            stats.mean = total / stats.count as f64;
        }
        stats
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumSummary {
    pub kimchi: PremiumStats,
    pub coinbase: PremiumStats,
}

impl PremiumSummary {
    pub fn from_assets(assets: &[ReconciledAsset]) -> Self {
        Self {
            kimchi: PremiumStats::from_values(
                assets
                    .iter()
                    .filter(|a| a.has_kimchi_premium())
                    .map(|a| a.kimchi_premium),
            ),
            coinbase: PremiumStats::from_values(
                assets
                    .iter()
                    .filter(|a| a.has_coinbase_premium())
                    .map(|a| a.coinbase_premium),
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PremiumEngine {
    settings: EngineSettings,
}

impl PremiumEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The FX rate to apply: `rate` when usable, otherwise the configured
    /// fallback, or [`DEFAULT_FALLBACK_FX_RATE`] when that is unusable too.
    pub fn effective_fx_rate(&self, rate: f64) -> (f64, bool) {
        if usable(rate) > 0.0 {
            return (rate, false);
        }
        let fallback = match usable(self.settings.fallback_fx_rate) {
            f if f > 0.0 => f,
            _ => DEFAULT_FALLBACK_FX_RATE,
        };
        (fallback, true)
    }

    pub fn reconcile(&self, payload: &MarketDataPayload) -> Reconciliation {
        let (exchange_rate, fx_fallback_used) = self.effective_fx_rate(payload.rates.krw);
        let krw = self.settings.krw_convention();
        let usd = self.settings.usd_convention();
        let stablecoin = self.settings.stablecoin.trim().to_uppercase();

        let upbit: HashMap<String, f64> = payload
            .upbit
            .iter()
            .map(|t| (t.market.trim().to_uppercase(), t.trade_price))
            .collect();
        let binance: HashMap<String, &str> = payload
            .binance
            .iter()
            .map(|t| (t.symbol.trim().to_uppercase(), t.price.as_str()))
            .collect();
        let coinbase: HashMap<String, &str> = payload
            .coinbase
            .iter()
            .map(|(code, rate)| (code.trim().to_uppercase(), rate.as_str()))
            .collect();

        let mut assets = Vec::with_capacity(payload.coins.len());
        let mut first_by_symbol: HashMap<String, &str> = HashMap::new();
        let mut symbol_collisions: Vec<SymbolCollision> = Vec::new();
        let mut unpriced = Vec::new();

        for coin in &payload.coins {
            let symbol = self.settings.venue_symbol(coin);
            if symbol.is_empty() {
                continue;
            }

            if let Some(kept_id) = first_by_symbol.get(&symbol) {
                warn!(symbol = %symbol, kept = %kept_id, dropped = %coin.id, "registry symbol collision");
                match symbol_collisions.iter_mut().find(|c| c.symbol == symbol) {
                    Some(collision) => collision.dropped_ids.push(coin.id.clone()),
                    None => symbol_collisions.push(SymbolCollision {
                        symbol: symbol.clone(),
                        kept_id: kept_id.to_string(),
                        dropped_ids: vec![coin.id.clone()],
                    }),
                }
                continue;
            }
            first_by_symbol.insert(symbol.clone(), coin.id.as_str());

            let upbit_price = upbit
                .get(&krw.market_key(&symbol))
                .copied()
                .map(usable)
                .unwrap_or(0.0);

            let binance_price = if symbol == stablecoin {
                1.0
            } else {
                binance
                    .get(&usd.market_key(&symbol))
                    .and_then(|price| parse_price(price))
                    .unwrap_or(0.0)
            };

            if upbit_price <= 0.0 && binance_price <= 0.0 {
                debug!(symbol = %symbol, "no venue priced asset, dropping");
                unpriced.push(symbol);
                continue;
            }

            let coinbase_price = coinbase
                .get(&symbol)
                .and_then(|rate| invert_rate(rate))
                .unwrap_or(0.0);

            assets.push(ReconciledAsset {
                id: coin.id.clone(),
                name: coin.name.clone(),
                image: coin.image.clone(),
                change24h: finite_or_zero(coin.change_24h),
                market_cap: finite_or_zero(coin.market_cap),
                market_cap_change24h: finite_or_zero(coin.market_cap_change_24h),
                binance_price,
                upbit_price,
                coinbase_price,
                kimchi_premium: kimchi_premium(upbit_price, binance_price, exchange_rate),
                coinbase_premium: coinbase_premium(coinbase_price, binance_price),
                symbol,
            });
        }

        Reconciliation {
            assets,
            exchange_rate,
            fx_fallback_used,
            symbol_collisions,
            unpriced,
        }
    }
}

/// Percentage by which the KRW venue price exceeds the FX-converted USD
/// venue price. Zero unless both prices and the rate are positive.
pub fn kimchi_premium(upbit_krw: f64, binance_usd: f64, usd_krw: f64) -> f64 {
    let global_krw = usable(binance_usd) * usable(usd_krw);
    if global_krw > 0.0 && usable(upbit_krw) > 0.0 {
        finite_or_zero((upbit_krw - global_krw) / global_krw * 100.0)
    } else {
        0.0
    }
}

/// Percentage by which the reference venue's derived USD price exceeds the
/// global spot price. Zero unless both are positive.
pub fn coinbase_premium(coinbase_usd: f64, binance_usd: f64) -> f64 {
    if usable(coinbase_usd) > 0.0 && usable(binance_usd) > 0.0 {
        finite_or_zero((coinbase_usd - binance_usd) / binance_usd * 100.0)
    } else {
        0.0
    }
}

/// Parse a venue price string. Unparseable, non-finite or non-positive
/// values are unknown.
pub fn parse_price(raw: &str) -> Option<f64> {
    let price = raw.trim().parse::<f64>().ok()?;
    (usable(price) > 0.0).then_some(price)
}

/// Turn a reference rate (asset units per USD) into a USD price.
pub fn invert_rate(raw: &str) -> Option<f64> {
    let rate = parse_price(raw)?;
    let price = 1.0 / rate;
    (usable(price) > 0.0).then_some(price)
}

fn usable(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
