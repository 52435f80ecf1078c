use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::debug;

use crate::config::{Config, FxSourceKind};
use crate::market_data::providers::{
    AlternativeMeSentimentSource, BinanceVenue, CoinGeckoSource, CoinbaseRateSource,
    ExchangeRateApiSource, FrankfurterRateSource, TreasuryRateSource, UpbitVenue,
};
use crate::market_data::{
    CoinRegistryLoader, FxRateProvider, FxRateRouter, FxRateSource, MarketDataService,
    PremiumEngine,
};

fn with_endpoint<T>(source: T, url: &Option<String>, apply: impl FnOnce(T, String) -> T) -> T {
    match url {
        Some(url) => apply(source, url.clone()),
        None => source,
    }
}

/// Wire every provider from config into a ready-to-run service.
///
/// All providers share one HTTP client so connection pools and the user
/// agent are common.
pub fn build_service(config: &Config) -> Result<MarketDataService> {
    config.validate()?;
    let client = Client::builder()
        .timeout(config.http.timeout)
        .user_agent(config.http.user_agent.as_str())
        .build()
        .context("Failed to build HTTP client")?;
    let endpoints = &config.endpoints;

    let coingecko = Arc::new(with_endpoint(
        CoinGeckoSource::with_client(client.clone())
            .with_vs_currency(config.registry.vs_currency.as_str()),
        &endpoints.coingecko,
        |s, url| s.with_base_url(url),
    ));
    let upbit = with_endpoint(
        UpbitVenue::with_client(client.clone())
            .with_quote_currency(config.venues.krw_quote.as_str()),
        &endpoints.upbit,
        |s, url| s.with_base_url(url),
    );
    let binance = with_endpoint(
        BinanceVenue::with_client(client.clone())
            .with_quote_asset(config.venues.usd_quote_asset.as_str()),
        &endpoints.binance,
        |s, url| s.with_base_url(url),
    );
    let coinbase = with_endpoint(
        CoinbaseRateSource::with_client(client.clone()),
        &endpoints.coinbase,
        |s, url| s.with_base_url(url),
    );
    let sentiment = with_endpoint(
        AlternativeMeSentimentSource::with_client(client.clone()),
        &endpoints.alternative_me,
        |s, url| s.with_base_url(url),
    );
    let treasury = with_endpoint(
        TreasuryRateSource::with_client(client.clone()),
        &endpoints.treasury,
        |s, url| s.with_base_url(url),
    );

    let fx_sources: Vec<Arc<dyn FxRateSource>> = config
        .fx
        .sources
        .iter()
        .map(|kind| -> Arc<dyn FxRateSource> {
            match kind {
                FxSourceKind::ExchangerateApi => Arc::new(with_endpoint(
                    ExchangeRateApiSource::with_client(client.clone()),
                    &endpoints.exchangerate_api,
                    |s, url| s.with_base_url(url),
                )),
                FxSourceKind::Frankfurter => Arc::new(with_endpoint(
                    FrankfurterRateSource::with_client(client.clone()),
                    &endpoints.frankfurter,
                    |s, url| s.with_base_url(url),
                )),
            }
        })
        .collect();
    debug!(fx_sources = fx_sources.len(), "configured FX sources");

    let registry = CoinRegistryLoader::new(coingecko.clone())
        .with_limit(config.registry.limit)
        .with_ttl(config.registry.ttl)
        .with_timeout(config.http.timeout);

    let fx = FxRateProvider::new(FxRateRouter::new(fx_sources))
        .with_ttl(config.fx.ttl)
        .with_timeout(config.http.timeout)
        .with_fallback_rate(config.fx.fallback_rate);

    Ok(MarketDataService::new(
        registry,
        fx,
        Arc::new(upbit),
        Arc::new(binance),
        Arc::new(coinbase),
    )
    .with_engine(PremiumEngine::new(config.engine_settings()))
    .with_listing_policy(config.venues.listing_failure)
    .with_reference_currency(config.venues.reference_currency.as_str())
    .with_sentiment_source(Arc::new(sentiment))
    .with_sentiment_history(config.refresh.sentiment_history)
    .with_global_source(coingecko.clone())
    .with_chart_source(coingecko)
    .with_macro_source(Arc::new(treasury))
    .with_macro_timeout(config.refresh.macro_timeout)
    .with_fetch_timeout(config.http.timeout)
    .with_listing_ttl(config.venues.listing_ttl)
    .with_reference_ttl(config.venues.reference_ttl)
    .with_sentiment_ttl(config.refresh.sentiment_ttl)
    .with_global_ttl(config.refresh.global_ttl)
    .with_chart_ttl(config.refresh.chart_ttl)
    .with_macro_ttl(config.refresh.macro_ttl))
}
