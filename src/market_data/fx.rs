//! USD->KRW conversion rate with cache and fallback.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tracing::{debug, warn};

use super::cache::{CacheKey, TtlCache};
use super::engine::DEFAULT_FALLBACK_FX_RATE;
use super::fetch::{bounded, DEFAULT_FETCH_TIMEOUT};
use super::models::{Origin, Sourced};
use super::sources::FxRateRouter;
use crate::clock::{Clock, SystemClock};

pub const DEFAULT_FX_TTL: Duration = Duration::from_secs(60 * 60);

pub struct FxRateProvider {
    router: FxRateRouter,
    cache: TtlCache<f64>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    fallback_rate: f64,
}

impl FxRateProvider {
    pub fn new(router: FxRateRouter) -> Self {
        Self {
            router,
            cache: TtlCache::new(DEFAULT_FX_TTL),
            clock: Arc::new(SystemClock),
            timeout: DEFAULT_FETCH_TIMEOUT,
            fallback_rate: DEFAULT_FALLBACK_FX_RATE,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache = TtlCache::new(ttl);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Upper bound on one pass through the FX sources.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_fallback_rate(mut self, rate: f64) -> Self {
        if rate.is_finite() && rate > 0.0 {
            self.fallback_rate = rate;
        }
        self
    }

    pub fn fallback_rate(&self) -> f64 {
        self.fallback_rate
    }

    /// KRW per USD. Never fails: a fresh or cached rate when one exists,
    /// otherwise the fallback.
    pub async fn usd_krw(&self) -> Sourced<f64> {
        let key = CacheKey::new("fx", "USD/KRW");
        let fetched = self
            .cache
            .get_or_fetch(&key, self.clock.as_ref(), || async {
                let quote = bounded("fx", self.timeout, self.router.fetch_rate("USD", "KRW"))
                    .await?
                    .ok_or_else(|| anyhow!("no FX source had a USD/KRW rate"))?;
                debug!(source = %quote.source, rate = quote.rate, "fetched USD/KRW");
                anyhow::Ok(quote.rate)
            })
            .await;

        match fetched {
            Some(rate) => {
                if rate.origin == Origin::Cached {
                    warn!(rate = rate.value, "serving last known USD/KRW rate");
                }
                rate
            }
            None => {
                warn!(rate = self.fallback_rate, "using fallback USD/KRW rate");
                Sourced::fallback(self.fallback_rate)
            }
        }
    }
}
