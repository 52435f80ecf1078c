//! Coin registry loading.
//!
//! Pulls the top assets by market cap through a TTL cache. When the upstream
//! is unavailable the last known list is served stale, and before anything
//! has ever loaded a built-in list of large caps keeps the pipeline running
//! with zeroed market statistics.

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use tracing::{info, warn};

use super::cache::{CacheKey, TtlCache};
use super::fetch::{bounded, DEFAULT_FETCH_TIMEOUT};
use super::models::{AssetMeta, Origin, Sourced};
use super::sources::CoinRegistrySource;
use crate::clock::{Clock, SystemClock};

pub const DEFAULT_REGISTRY_LIMIT: usize = 30;
pub const DEFAULT_REGISTRY_TTL: Duration = Duration::from_secs(60);

const FALLBACK_ASSETS: &[(&str, &str, &str, &str)] = &[
    ("bitcoin", "btc", "Bitcoin", "https://assets.coingecko.com/coins/images/1/large/bitcoin.png"),
    ("ethereum", "eth", "Ethereum", "https://assets.coingecko.com/coins/images/279/large/ethereum.png"),
    ("solana", "sol", "Solana", "https://assets.coingecko.com/coins/images/4128/large/solana.png"),
    ("ripple", "xrp", "XRP", "https://assets.coingecko.com/coins/images/44/large/xrp.png"),
    ("dogecoin", "doge", "Dogecoin", "https://assets.coingecko.com/coins/images/5/large/dogecoin.png"),
    ("cardano", "ada", "Cardano", "https://assets.coingecko.com/coins/images/975/large/cardano.png"),
    (
        "avalanche-2",
        "avax",
        "Avalanche",
        "https://assets.coingecko.com/coins/images/12559/large/Avalanche_Circle_RedWhite_Trans.png",
    ),
    ("chainlink", "link", "Chainlink", "https://assets.coingecko.com/coins/images/877/large/chainlink-new-logo.png"),
    ("polkadot", "dot", "Polkadot", "https://assets.coingecko.com/coins/images/12171/large/polkadot.png"),
    ("near", "near", "NEAR Protocol", "https://assets.coingecko.com/coins/images/10365/large/near.png"),
    ("tron", "trx", "TRON", "https://assets.coingecko.com/coins/images/1094/large/tron.png"),
    ("shiba-inu", "shib", "Shiba Inu", "https://assets.coingecko.com/coins/images/11939/large/shiba.png"),
];

/// Built-in registry used before any upstream list has loaded.
pub fn fallback_assets() -> Vec<AssetMeta> {
    FALLBACK_ASSETS
        .iter()
        .map(|(id, symbol, name, image)| AssetMeta::placeholder(*id, *symbol, *name, *image))
        .collect()
}

pub struct CoinRegistryLoader {
    source: Arc<dyn CoinRegistrySource>,
    cache: TtlCache<Vec<AssetMeta>>,
    limit: usize,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl CoinRegistryLoader {
    pub fn new(source: Arc<dyn CoinRegistrySource>) -> Self {
        Self {
            source,
            cache: TtlCache::new(DEFAULT_REGISTRY_TTL),
            limit: DEFAULT_REGISTRY_LIMIT,
            timeout: DEFAULT_FETCH_TIMEOUT,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache = TtlCache::new(ttl);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Top assets by market cap, highest first. Never fails.
    pub async fn load(&self) -> Sourced<Vec<AssetMeta>> {
        let key = CacheKey::new(self.source.name(), format!("top:{}", self.limit));
        let loaded = self
            .cache
            .get_or_fetch(&key, self.clock.as_ref(), || async {
                let name = self.source.name();
                let assets =
                    bounded(name, self.timeout, self.source.fetch_top_assets(self.limit)).await?;
                if assets.is_empty() {
                    bail!("{name} returned an empty asset list");
                }
                anyhow::Ok(assets)
            })
            .await;

        match loaded {
            Some(assets) => {
                if assets.origin == Origin::Cached {
                    warn!(source = self.source.name(), "serving last known coin registry");
                }
                assets
            }
            None => {
                info!(source = self.source.name(), "using built-in coin registry");
                Sourced::fallback(fallback_assets())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use anyhow::{anyhow, Result};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Toggle {
        up: AtomicBool,
    }

    #[async_trait::async_trait]
    impl CoinRegistrySource for Toggle {
        async fn fetch_top_assets(&self, limit: usize) -> Result<Vec<AssetMeta>> {
            if !self.up.load(Ordering::SeqCst) {
                return Err(anyhow!("503 Service Unavailable"));
            }
            Ok(vec![AssetMeta::placeholder("bitcoin", "btc", "Bitcoin", ""); limit.min(2)])
        }

        fn name(&self) -> &str {
            "toggle"
        }
    }

    fn loader(up: bool) -> (CoinRegistryLoader, Arc<Toggle>, Arc<ManualClock>) {
        let source = Arc::new(Toggle {
            up: AtomicBool::new(up),
        });
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()));
        let loader = CoinRegistryLoader::new(source.clone()).with_clock(clock.clone());
        (loader, source, clock)
    }

    #[test]
    fn fallback_covers_twelve_large_caps_with_zeroed_stats() {
        let assets = fallback_assets();
        assert_eq!(assets.len(), 12);
        assert_eq!(assets[0].symbol, "btc");
        assert_eq!(assets[1].symbol, "eth");
        assert!(assets.iter().all(|a| a.market_cap == 0.0 && a.change_24h == 0.0));
    }

    #[tokio::test]
    async fn unavailable_source_uses_builtin_list() {
        let (loader, _, _) = loader(false);
        let registry = loader.load().await;
        assert_eq!(registry.origin, Origin::Fallback);
        assert!(registry.stale);
        assert_eq!(registry.value.len(), 12);
    }

    #[tokio::test]
    async fn outage_after_success_serves_last_known() {
        let (loader, source, clock) = loader(true);
        let first = loader.load().await;
        assert_eq!(first.origin, Origin::Live);
        assert_eq!(first.value.len(), 2);

        source.up.store(false, Ordering::SeqCst);
        clock.advance(Duration::from_secs(120));

        let second = loader.load().await;
        assert_eq!(second.origin, Origin::Cached);
        assert!(second.stale);
        assert_eq!(second.value, first.value);
    }
}
