use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};

use super::cache::{CacheKey, TtlCache};
use super::chart::{ChartQuery, MarketChart};
use super::dominance::{DominanceReading, GlobalMarket};
use super::engine::{PremiumEngine, PremiumSummary, Reconciliation};
use super::fetch::{bounded, FetchError, DEFAULT_FETCH_TIMEOUT};
use super::filter::{market_keys, ListingFailurePolicy, VenueListing};
use super::fx::FxRateProvider;
use super::macro_indicators::{MacroSnapshot, TreasuryRate};
use super::models::{
    AssetMeta, BinanceTicker, FxRates, MarketDataPayload, Origin, ReferenceRates, Sourced,
    UpbitTicker,
};
use super::registry::CoinRegistryLoader;
use super::sentiment::SentimentIndex;
use super::sources::{
    GlobalMarketSource, MacroRateSource, MarketChartSource, ReferenceRateSource, SentimentSource,
    SpotVenue,
};

const DEFAULT_LISTING_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_REFERENCE_TTL: Duration = Duration::from_secs(10);
const DEFAULT_SENTIMENT_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_GLOBAL_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_CHART_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_MACRO_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_MACRO_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_SENTIMENT_HISTORY: usize = 30;

/// Freshness of one dependency in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyStatus {
    pub origin: Origin,
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> From<&Sourced<T>> for DependencyStatus {
    fn from(sourced: &Sourced<T>) -> Self {
        Self {
            origin: sourced.origin,
            stale: sourced.stale,
            fetched_at: sourced.fetched_at,
        }
    }
}

/// What one venue contributed to a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueReport {
    pub venue: String,
    /// Base symbols in the venue's listing, when the listing was available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listed: Option<usize>,
    /// Market keys (or rates) requested.
    pub requested: usize,
    /// Rows received.
    pub received: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VenueReport {
    fn new(venue: &str) -> Self {
        Self {
            venue: venue.to_string(),
            listed: None,
            requested: 0,
            received: 0,
            timed_out: false,
            error: None,
        }
    }

    fn record_error(&mut self, err: &FetchError) {
        warn!(venue = err.venue(), error = %err, "venue contributed nothing this cycle");
        self.timed_out = err.is_timeout();
        self.error = Some(err.to_string());
    }

    pub fn contributed(&self) -> bool {
        self.received > 0
    }
}

/// One full refresh: reconciled rows plus the provenance of every input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub taken_at: DateTime<Utc>,
    pub reconciliation: Reconciliation,
    pub summary: PremiumSummary,
    pub registry: DependencyStatus,
    pub fx: DependencyStatus,
    pub venues: Vec<VenueReport>,
}

impl DashboardSnapshot {
    pub fn venue(&self, name: &str) -> Option<&VenueReport> {
        self.venues.iter().find(|v| v.venue == name)
    }
}

struct Cycle {
    payload: MarketDataPayload,
    registry: DependencyStatus,
    fx: DependencyStatus,
    venues: Vec<VenueReport>,
}

/// Runs refresh cycles: registry and FX, venue listings, then the three
/// ticker fetches fanned out concurrently, each bounded by a timeout.
///
/// Nothing here returns an error. An upstream that fails or times out is
/// logged and contributes nothing (or its last known value) to the cycle.
pub struct MarketDataService {
    registry: CoinRegistryLoader,
    fx: FxRateProvider,
    upbit: Arc<dyn SpotVenue<Ticker = UpbitTicker>>,
    binance: Arc<dyn SpotVenue<Ticker = BinanceTicker>>,
    reference: Arc<dyn ReferenceRateSource>,
    sentiment: Option<Arc<dyn SentimentSource>>,
    global: Option<Arc<dyn GlobalMarketSource>>,
    chart: Option<Arc<dyn MarketChartSource>>,
    macro_rate: Option<Arc<dyn MacroRateSource>>,
    engine: PremiumEngine,
    listing_policy: ListingFailurePolicy,
    reference_currency: String,
    sentiment_history: usize,
    fetch_timeout: Duration,
    macro_timeout: Duration,
    listings: TtlCache<VenueListing>,
    reference_cache: TtlCache<ReferenceRates>,
    sentiment_cache: TtlCache<SentimentIndex>,
    global_cache: TtlCache<GlobalMarket>,
    chart_cache: TtlCache<MarketChart>,
    macro_cache: TtlCache<TreasuryRate>,
    clock: Arc<dyn Clock>,
}

impl MarketDataService {
    pub fn new(
        registry: CoinRegistryLoader,
        fx: FxRateProvider,
        upbit: Arc<dyn SpotVenue<Ticker = UpbitTicker>>,
        binance: Arc<dyn SpotVenue<Ticker = BinanceTicker>>,
        reference: Arc<dyn ReferenceRateSource>,
    ) -> Self {
        Self {
            registry,
            fx,
            upbit,
            binance,
            reference,
            sentiment: None,
            global: None,
            chart: None,
            macro_rate: None,
            engine: PremiumEngine::default(),
            listing_policy: ListingFailurePolicy::default(),
            reference_currency: "USD".to_string(),
            sentiment_history: DEFAULT_SENTIMENT_HISTORY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            macro_timeout: DEFAULT_MACRO_TIMEOUT,
            listings: TtlCache::new(DEFAULT_LISTING_TTL),
            reference_cache: TtlCache::new(DEFAULT_REFERENCE_TTL),
            sentiment_cache: TtlCache::new(DEFAULT_SENTIMENT_TTL),
            global_cache: TtlCache::new(DEFAULT_GLOBAL_TTL),
            chart_cache: TtlCache::new(DEFAULT_CHART_TTL),
            macro_cache: TtlCache::new(DEFAULT_MACRO_TTL),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_engine(mut self, engine: PremiumEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_listing_policy(mut self, policy: ListingFailurePolicy) -> Self {
        self.listing_policy = policy;
        self
    }

    pub fn with_reference_currency(mut self, currency: impl Into<String>) -> Self {
        self.reference_currency = currency.into().to_uppercase();
        self
    }

    pub fn with_sentiment_source(mut self, source: Arc<dyn SentimentSource>) -> Self {
        self.sentiment = Some(source);
        self
    }

    pub fn with_sentiment_history(mut self, readings: usize) -> Self {
        self.sentiment_history = readings.max(1);
        self
    }

    pub fn with_global_source(mut self, source: Arc<dyn GlobalMarketSource>) -> Self {
        self.global = Some(source);
        self
    }

    pub fn with_chart_source(mut self, source: Arc<dyn MarketChartSource>) -> Self {
        self.chart = Some(source);
        self
    }

    pub fn with_macro_source(mut self, source: Arc<dyn MacroRateSource>) -> Self {
        self.macro_rate = Some(source);
        self
    }

    /// Upper bound on the macro feed, which is shorter than the venue bound.
    pub fn with_macro_timeout(mut self, timeout: Duration) -> Self {
        self.macro_timeout = timeout;
        self
    }

    /// Per-venue upper bound for listing, ticker and rate requests.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_listing_ttl(mut self, ttl: Duration) -> Self {
        self.listings = TtlCache::new(ttl);
        self
    }

    pub fn with_reference_ttl(mut self, ttl: Duration) -> Self {
        self.reference_cache = TtlCache::new(ttl);
        self
    }

    pub fn with_sentiment_ttl(mut self, ttl: Duration) -> Self {
        self.sentiment_cache = TtlCache::new(ttl);
        self
    }

    pub fn with_global_ttl(mut self, ttl: Duration) -> Self {
        self.global_cache = TtlCache::new(ttl);
        self
    }

    pub fn with_chart_ttl(mut self, ttl: Duration) -> Self {
        self.chart_cache = TtlCache::new(ttl);
        self
    }

    pub fn with_macro_ttl(mut self, ttl: Duration) -> Self {
        self.macro_cache = TtlCache::new(ttl);
        self
    }

    /// Clock for snapshot timestamps and the service's own caches. The
    /// registry loader and FX provider carry their own.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn engine(&self) -> &PremiumEngine {
        &self.engine
    }

    /// Gather every input for one cycle, in the shape served to clients.
    pub async fn collect(&self) -> MarketDataPayload {
        self.gather().await.payload
    }

    /// Gather inputs and reconcile them.
    pub async fn refresh(&self) -> DashboardSnapshot {
        let cycle = self.gather().await;
        let reconciliation = self.engine.reconcile(&cycle.payload);
        let summary = reconciliation.summary();

        info!(
            assets = reconciliation.assets.len(),
            exchange_rate = reconciliation.exchange_rate,
            fx_fallback = reconciliation.fx_fallback_used,
            collisions = reconciliation.symbol_collisions.len(),
            kimchi_mean = summary.kimchi.mean,
            "refresh complete"
        );

        DashboardSnapshot {
            taken_at: self.clock.now(),
            reconciliation,
            summary,
            registry: cycle.registry,
            fx: cycle.fx,
            venues: cycle.venues,
        }
    }

    async fn gather(&self) -> Cycle {
        let (registry, fx) = tokio::join!(self.registry.load(), self.fx.usd_krw());

        let symbols: Vec<String> = registry
            .value
            .iter()
            .map(|coin| self.engine.settings().venue_symbol(coin))
            .collect();

        let (upbit_listing, binance_listing) = tokio::join!(
            self.listing(self.upbit.as_ref()),
            self.listing(self.binance.as_ref()),
        );

        let upbit_keys = market_keys(
            &symbols,
            upbit_listing.as_ref(),
            self.listing_policy,
            self.upbit.convention(),
        );
        let binance_keys = market_keys(
            &symbols,
            binance_listing.as_ref(),
            self.listing_policy,
            self.binance.convention(),
        );
        debug!(
            symbols = symbols.len(),
            upbit = upbit_keys.len(),
            binance = binance_keys.len(),
            "filtered symbols to listed markets"
        );

        let ((upbit, mut upbit_report), (binance, mut binance_report), (coinbase, coinbase_report)) = tokio::join!(
            self.tickers(self.upbit.as_ref(), &upbit_keys),
            self.tickers(self.binance.as_ref(), &binance_keys),
            self.reference_rates(),
        );
        upbit_report.listed = upbit_listing.as_ref().map(VenueListing::len);
        binance_report.listed = binance_listing.as_ref().map(VenueListing::len);

        Cycle {
            registry: DependencyStatus::from(&registry),
            fx: DependencyStatus::from(&fx),
            venues: vec![upbit_report, binance_report, coinbase_report],
            payload: MarketDataPayload {
                success: true,
                coins: registry.value,
                rates: FxRates { krw: fx.value },
                upbit,
                binance,
                coinbase,
            },
        }
    }

    async fn listing<T: Send>(&self, venue: &dyn SpotVenue<Ticker = T>) -> Option<VenueListing> {
        let key = CacheKey::new(venue.name(), "listing");
        self.listings
            .get_or_fetch(&key, self.clock.as_ref(), || async {
                bounded(venue.name(), self.fetch_timeout, venue.fetch_listing())
                    .await
                    .map_err(anyhow::Error::from)
            })
            .await
            .map(|listing| listing.value)
    }

    async fn tickers<T: Send>(
        &self,
        venue: &dyn SpotVenue<Ticker = T>,
        keys: &[String],
    ) -> (Vec<T>, VenueReport) {
        let mut report = VenueReport::new(venue.name());
        report.requested = keys.len();

        if keys.is_empty() {
            debug!(venue = venue.name(), "no listed markets to query");
            return (Vec::new(), report);
        }

        match bounded(venue.name(), self.fetch_timeout, venue.fetch_tickers(keys)).await {
            Ok(tickers) => {
                report.received = tickers.len();
                (tickers, report)
            }
            Err(err) => {
                report.record_error(&err);
                (Vec::new(), report)
            }
        }
    }

    async fn reference_rates(&self) -> (ReferenceRates, VenueReport) {
        let name = self.reference.name();
        let mut report = VenueReport::new(name);
        report.requested = 1;

        let key = CacheKey::new(name, self.reference_currency.as_str());
        let mut failure = None;
        let rates = self
            .reference_cache
            .get_or_fetch(&key, self.clock.as_ref(), || async {
                bounded(
                    name,
                    self.fetch_timeout,
                    self.reference.fetch_rates(&self.reference_currency),
                )
                .await
                .map_err(|err| {
                    let message = anyhow::anyhow!("{err}");
                    failure = Some(err);
                    message
                })
            })
            .await;

        if let Some(err) = &failure {
            report.timed_out = err.is_timeout();
            report.error = Some(err.to_string());
        }

        let rates = rates.map(|r| r.value).unwrap_or_default();
        report.received = rates.len();
        (rates, report)
    }

    /// Fear & Greed index, cached. Empty (reads neutral) when unavailable.
    pub async fn sentiment(&self) -> Sourced<SentimentIndex> {
        let Some(source) = &self.sentiment else {
            return Sourced::fallback(SentimentIndex::default());
        };

        let key = CacheKey::new(source.name(), format!("history:{}", self.sentiment_history));
        self.sentiment_cache
            .get_or_fetch(&key, self.clock.as_ref(), || async {
                let history = bounded(
                    source.name(),
                    self.fetch_timeout,
                    source.fetch_history(self.sentiment_history),
                )
                .await?;
                anyhow::Ok(SentimentIndex::new(history))
            })
            .await
            .unwrap_or_else(|| Sourced::fallback(SentimentIndex::default()))
    }

    /// Global market figures, cached. `None` when never available.
    pub async fn global(&self) -> Option<Sourced<GlobalMarket>> {
        let source = self.global.as_ref()?;
        let key = CacheKey::new(source.name(), "global");
        self.global_cache
            .get_or_fetch(&key, self.clock.as_ref(), || async {
                bounded(source.name(), self.fetch_timeout, source.fetch_global())
                    .await
                    .map_err(anyhow::Error::from)
            })
            .await
    }

    /// Price history for one asset, cached per `(coin, days)`. An empty price
    /// series counts as a failure. `None` when never available.
    pub async fn market_chart(&self, query: &ChartQuery) -> Option<Sourced<MarketChart>> {
        let source = self.chart.as_ref()?;
        let key = CacheKey::new(source.name(), format!("chart:{}:{}", query.coin_id, query.days));
        self.chart_cache
            .get_or_fetch(&key, self.clock.as_ref(), || async {
                let chart =
                    bounded(source.name(), self.fetch_timeout, source.fetch_chart(query)).await?;
                if chart.is_empty() {
                    anyhow::bail!("{} returned no prices for {}", source.name(), query.coin_id);
                }
                anyhow::Ok(chart)
            })
            .await
    }

    /// Macro backdrop. The Treasury rate is cached; without one (ever) the
    /// baseline figures are served as a fallback.
    pub async fn macro_snapshot(&self) -> Sourced<MacroSnapshot> {
        let Some(source) = &self.macro_rate else {
            return Sourced::fallback(MacroSnapshot::baseline());
        };

        let key = CacheKey::new(source.name(), "latest");
        let rate = self
            .macro_cache
            .get_or_fetch(&key, self.clock.as_ref(), || async {
                bounded(source.name(), self.macro_timeout, source.fetch_latest_rate())
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("{} returned no usable rate", source.name()))
            })
            .await;

        match rate {
            Some(rate) => Sourced {
                value: MacroSnapshot::baseline().with_treasury_rate(rate.value),
                stale: rate.stale,
                origin: rate.origin,
                fetched_at: rate.fetched_at,
            },
            None => {
                warn!("macro feed unavailable, serving baseline figures");
                Sourced::fallback(MacroSnapshot::baseline())
            }
        }
    }

    /// Market phase from BTC dominance and BTC's 24h change in the registry.
    pub async fn dominance(&self) -> Option<DominanceReading> {
        let (global, registry) = tokio::join!(self.global(), self.registry.load());
        let btc_change = btc_change_24h(&registry.value);
        DominanceReading::from_global(&global?.value, btc_change)
    }
}

fn btc_change_24h(assets: &[AssetMeta]) -> f64 {
    assets
        .iter()
        .find(|a| a.symbol.eq_ignore_ascii_case("btc"))
        .map_or(0.0, |a| a.change_24h)
}
