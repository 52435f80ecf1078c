mod cache;
mod chart;
mod dominance;
mod engine;
mod fetch;
mod filter;
mod fx;
mod macro_indicators;
mod models;
pub mod providers;
mod registry;
mod sentiment;
mod service;
mod sort;
mod sources;

pub use cache::{CacheEntry, CacheKey, TtlCache};
pub use chart::{
    ChartPoint, ChartQuery, MarketChart, DEFAULT_CHART_COIN, DEFAULT_CHART_DAYS, MAX_CHART_DAYS,
};
pub use dominance::{
    DominancePhase, DominanceReading, GlobalMarket, ALT_HEAVY_DOMINANCE, BTC_HEAVY_DOMINANCE,
};
pub use engine::{
    coinbase_premium, invert_rate, kimchi_premium, parse_price, EngineSettings, PremiumEngine,
    PremiumStats, PremiumSummary, Reconciliation, SymbolCollision, DEFAULT_FALLBACK_FX_RATE,
};
pub use fetch::{bounded, FetchError, DEFAULT_FETCH_TIMEOUT};
pub use filter::{market_keys, ListingFailurePolicy, MarketConvention, VenueListing};
pub use fx::{FxRateProvider, DEFAULT_FX_TTL};
pub use macro_indicators::{
    FedOutlook, MacroAnalysis, MacroIndicator, MacroIndicators, MacroSnapshot, TreasuryRate,
};
pub use models::{
    rates_from_value, rows_from_value, AssetMeta, BinanceTicker, FxRates, MarketDataPayload,
    Origin, ReconciledAsset, ReferenceRates, Sourced, UpbitTicker,
};
pub use registry::{
    fallback_assets, CoinRegistryLoader, DEFAULT_REGISTRY_LIMIT, DEFAULT_REGISTRY_TTL,
};
pub use sentiment::{SentimentBand, SentimentIndex, SentimentReading, NEUTRAL_SENTIMENT};
pub use service::{DashboardSnapshot, DependencyStatus, MarketDataService, VenueReport};
pub use sort::{SortDirection, SortKey, SortOrder};
pub use sources::{
    CoinRegistrySource, FxQuote, FxRateRouter, FxRateSource, GlobalMarketSource,
    MacroRateSource, MarketChartSource, ReferenceRateSource, SentimentSource, SpotVenue,
};
