use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use super::chart::{ChartQuery, MarketChart};
use super::dominance::GlobalMarket;
use super::filter::{MarketConvention, VenueListing};
use super::macro_indicators::TreasuryRate;
use super::models::{AssetMeta, ReferenceRates};
use super::sentiment::SentimentReading;

/// Ranked asset metadata (the coin registry).
#[async_trait::async_trait]
pub trait CoinRegistrySource: Send + Sync {
    /// Top `limit` assets by market capitalization, highest first.
    async fn fetch_top_assets(&self, limit: usize) -> Result<Vec<AssetMeta>>;

    fn name(&self) -> &str;
}

#[async_trait::async_trait]
pub trait FxRateSource: Send + Sync {
    /// Units of `quote` per one `base`. `Ok(None)` when the source does not
    /// carry the pair.
    async fn fetch_rate(&self, base: &str, quote: &str) -> Result<Option<f64>>;

    fn name(&self) -> &str;
}

/// A spot exchange queried in batches by market key.
#[async_trait::async_trait]
pub trait SpotVenue: Send + Sync {
    type Ticker: Send;

    /// How this venue spells `{base}/{quote}` market keys.
    fn convention(&self) -> &MarketConvention;

    /// Base symbols currently tradable against this venue's quote.
    async fn fetch_listing(&self) -> Result<VenueListing>;

    /// Last price for each requested market key. Keys the venue does not know
    /// are absent from the result.
    async fn fetch_tickers(&self, market_keys: &[String]) -> Result<Vec<Self::Ticker>>;

    fn name(&self) -> &str;
}

/// Venue publishing exchange rates against a base currency, including crypto
/// assets (`BTC -> 0.00001` per USD).
#[async_trait::async_trait]
pub trait ReferenceRateSource: Send + Sync {
    async fn fetch_rates(&self, base_currency: &str) -> Result<ReferenceRates>;

    fn name(&self) -> &str;
}

#[async_trait::async_trait]
pub trait SentimentSource: Send + Sync {
    /// Most recent readings, newest first.
    async fn fetch_history(&self, limit: usize) -> Result<Vec<SentimentReading>>;

    fn name(&self) -> &str;
}

#[async_trait::async_trait]
pub trait GlobalMarketSource: Send + Sync {
    async fn fetch_global(&self) -> Result<GlobalMarket>;

    fn name(&self) -> &str;
}

/// Price history for one asset.
#[async_trait::async_trait]
pub trait MarketChartSource: Send + Sync {
    async fn fetch_chart(&self, query: &ChartQuery) -> Result<MarketChart>;

    fn name(&self) -> &str;
}

/// Live rate feeding the macro backdrop.
#[async_trait::async_trait]
pub trait MacroRateSource: Send + Sync {
    /// `Ok(None)` when the feed answered without a usable rate.
    async fn fetch_latest_rate(&self) -> Result<Option<TreasuryRate>>;

    fn name(&self) -> &str;
}

/// A usable FX rate and the source that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct FxQuote {
    pub rate: f64,
    pub source: String,
}

/// Tries FX sources in order until one returns a usable rate.
///
/// Errors and non-positive or non-finite rates move on to the next source.
/// The last error is returned only if no source produced a rate.
pub struct FxRateRouter {
    sources: Vec<Arc<dyn FxRateSource>>,
}

impl FxRateRouter {
    pub fn new(sources: Vec<Arc<dyn FxRateSource>>) -> Self {
        Self { sources }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub async fn fetch_rate(&self, base: &str, quote: &str) -> Result<Option<FxQuote>> {
        let mut last_err = None;
        for source in &self.sources {
            match source.fetch_rate(base, quote).await {
                Ok(Some(rate)) if rate.is_finite() && rate > 0.0 => {
                    return Ok(Some(FxQuote {
                        rate,
                        source: source.name().to_string(),
                    }));
                }
                Ok(Some(rate)) => {
                    warn!(source = source.name(), rate, "FX source returned unusable rate");
                }
                Ok(None) => {
                    debug!(source = source.name(), base, quote, "FX source has no rate for pair");
                }
                Err(err) => {
                    warn!(source = source.name(), error = %err, "FX source failed");
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct Fixed(&'static str, Result<Option<f64>, &'static str>);

    #[async_trait::async_trait]
    impl FxRateSource for Fixed {
        async fn fetch_rate(&self, _base: &str, _quote: &str) -> Result<Option<f64>> {
            self.1.map_err(|msg| anyhow!(msg))
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    fn router(sources: Vec<Fixed>) -> FxRateRouter {
        FxRateRouter::new(
            sources
                .into_iter()
                .map(|s| Arc::new(s) as Arc<dyn FxRateSource>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn first_usable_rate_wins() {
        let router = router(vec![
            Fixed("down", Err("connection refused")),
            Fixed("zero", Ok(Some(0.0))),
            Fixed("nan", Ok(Some(f64::NAN))),
            Fixed("missing", Ok(None)),
            Fixed("good", Ok(Some(1385.5))),
            Fixed("later", Ok(Some(1.0))),
        ]);

        let quote = router.fetch_rate("USD", "KRW").await.unwrap().unwrap();
        assert_eq!(quote.rate, 1385.5);
        assert_eq!(quote.source, "good");
    }

    #[tokio::test]
    async fn error_surfaces_only_when_nothing_succeeded() {
        let failing = router(vec![Fixed("a", Err("boom")), Fixed("b", Ok(Some(-1.0)))]);
        assert!(failing.fetch_rate("USD", "KRW").await.is_err());

        let empty = router(vec![Fixed("a", Ok(None))]);
        assert_eq!(empty.fetch_rate("USD", "KRW").await.unwrap(), None);
    }
}
