use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::duration::{deserialize_duration, serialize_duration};
use crate::market_data::{EngineSettings, ListingFailurePolicy, DEFAULT_FALLBACK_FX_RATE};

fn default_registry_ttl() -> Duration {
    Duration::from_secs(60)
}

fn default_fx_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_listing_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_reference_ttl() -> Duration {
    Duration::from_secs(10)
}

fn default_ticker_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_jitter() -> Duration {
    Duration::from_millis(500)
}

fn default_sentiment_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_global_ttl() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_chart_ttl() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_macro_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_macro_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Coin registry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// How many assets to track, ranked by market cap.
    pub limit: usize,

    /// Currency the registry ranks market caps in.
    pub vs_currency: String,

    #[serde(
        default = "default_registry_ttl",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub ttl: Duration,

    /// Registry id -> ticker symbol the exchanges list that asset under.
    ///
    /// Use when an asset was renamed on the venues but not in the registry,
    /// or to steer two assets sharing a symbol apart.
    pub id_overrides: HashMap<String, String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            limit: 30,
            vs_currency: "usd".to_string(),
            ttl: default_registry_ttl(),
            id_overrides: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FxSourceKind {
    ExchangerateApi,
    Frankfurter,
}

/// USD->KRW rate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxConfig {
    /// Rate used when no source has ever produced one.
    pub fallback_rate: f64,

    /// Sources to try, in order.
    pub sources: Vec<FxSourceKind>,

    #[serde(
        default = "default_fx_ttl",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub ttl: Duration,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            fallback_rate: DEFAULT_FALLBACK_FX_RATE,
            sources: vec![FxSourceKind::ExchangerateApi, FxSourceKind::Frankfurter],
            ttl: default_fx_ttl(),
        }
    }
}

/// Exchange conventions and listing behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VenuesConfig {
    /// Quote currency of the Korean venue.
    pub krw_quote: String,

    /// Quote asset of the global spot venue.
    pub usd_quote_asset: String,

    /// Symbol whose USD price is pinned to 1.
    pub stablecoin: String,

    /// Base currency the reference rates are requested against. Reference
    /// prices are compared with USD spot prices, so only `USD` is accepted.
    pub reference_currency: String,

    /// What to do when a venue's market listing cannot be fetched.
    pub listing_failure: ListingFailurePolicy,

    #[serde(
        default = "default_listing_ttl",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub listing_ttl: Duration,

    #[serde(
        default = "default_reference_ttl",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub reference_ttl: Duration,
}

impl Default for VenuesConfig {
    fn default() -> Self {
        Self {
            krw_quote: "KRW".to_string(),
            usd_quote_asset: "USDT".to_string(),
            stablecoin: "USDT".to_string(),
            reference_currency: "USD".to_string(),
            listing_failure: ListingFailurePolicy::default(),
            listing_ttl: default_listing_ttl(),
            reference_ttl: default_reference_ttl(),
        }
    }
}

/// Poll cadence and caching of the slower dashboard feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Interval between refresh cycles in `watch` mode.
    #[serde(
        default = "default_ticker_interval",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub ticker_interval: Duration,

    /// Random delay added to each interval.
    #[serde(
        default = "default_jitter",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub jitter: Duration,

    #[serde(
        default = "default_sentiment_ttl",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub sentiment_ttl: Duration,

    #[serde(
        default = "default_global_ttl",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub global_ttl: Duration,

    /// Price history chart, per coin and range.
    #[serde(
        default = "default_chart_ttl",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub chart_ttl: Duration,

    #[serde(
        default = "default_macro_ttl",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub macro_ttl: Duration,

    /// Upper bound on the Treasury rate request.
    #[serde(
        default = "default_macro_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub macro_timeout: Duration,

    /// Number of daily Fear & Greed readings to keep.
    pub sentiment_history: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            ticker_interval: default_ticker_interval(),
            jitter: default_jitter(),
            sentiment_ttl: default_sentiment_ttl(),
            global_ttl: default_global_ttl(),
            chart_ttl: default_chart_ttl(),
            macro_ttl: default_macro_ttl(),
            macro_timeout: default_macro_timeout(),
            sentiment_history: 30,
        }
    }
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Upper bound on each upstream call. A venue that misses it contributes
    /// nothing to that cycle.
    #[serde(
        default = "default_fetch_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub timeout: Duration,

    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            user_agent: format!("coinboard/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Base URL overrides, mostly for pointing at mock servers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub coingecko: Option<String>,
    pub upbit: Option<String>,
    pub binance: Option<String>,
    pub coinbase: Option<String>,
    pub exchangerate_api: Option<String>,
    pub frankfurter: Option<String>,
    pub alternative_me: Option<String>,
    pub treasury: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,

    /// Send permissive CORS headers so a browser dashboard on another origin
    /// can call the API.
    pub allow_any_origin: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            allow_any_origin: true,
        }
    }
}

/// Display/output formatting configuration.
///
/// Presentation only; nothing here affects calculations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Decimal places for USD prices.
    pub usd_decimals: u32,

    /// Decimal places for premiums and 24h changes.
    pub percent_decimals: u32,

    /// Render prices with thousands separators.
    pub grouping: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            usd_decimals: 2,
            percent_decimals: 2,
            grouping: true,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub fx: FxConfig,
    pub venues: VenuesConfig,
    pub refresh: RefreshConfig,
    pub http: HttpConfig,
    pub endpoints: EndpointsConfig,
    pub server: ServerConfig,
    pub display: DisplayConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Reject settings that would break the price units the engine relies on.
    pub fn validate(&self) -> Result<()> {
        if !self.venues.reference_currency.trim().eq_ignore_ascii_case("USD") {
            bail!(
                "venues.reference_currency must be USD, got {:?}",
                self.venues.reference_currency
            );
        }
        if !(self.fx.fallback_rate.is_finite() && self.fx.fallback_rate > 0.0) {
            bail!(
                "fx.fallback_rate must be a positive number, got {}",
                self.fx.fallback_rate
            );
        }
        Ok(())
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Render as TOML, in the same shape [`Config::load`] reads.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            krw_quote: self.venues.krw_quote.clone(),
            usd_quote_asset: self.venues.usd_quote_asset.clone(),
            stablecoin: self.venues.stablecoin.clone(),
            fallback_fx_rate: self.fx.fallback_rate,
            id_overrides: self.registry.id_overrides.clone(),
        }
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./coinboard.toml` if it exists in current directory
/// 2. `~/.config/coinboard/coinboard.toml` (XDG config directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("coinboard.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("coinboard").join("coinboard.toml");
    }

    local_config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_load_empty_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("coinboard.toml");

        std::fs::File::create(&config_path)?;

        let config = Config::load(&config_path)?;
        assert_eq!(config, Config::default());

        Ok(())
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.registry.limit, 30);
        assert_eq!(config.registry.ttl, Duration::from_secs(60));
        assert_eq!(config.fx.fallback_rate, 1400.0);
        assert_eq!(config.fx.ttl, Duration::from_secs(3600));
        assert_eq!(config.venues.listing_ttl, Duration::from_secs(3600));
        assert_eq!(config.venues.reference_ttl, Duration::from_secs(10));
        assert_eq!(config.venues.listing_failure, ListingFailurePolicy::SkipVenue);
        assert_eq!(config.refresh.sentiment_ttl, Duration::from_secs(3600));
        assert_eq!(config.refresh.global_ttl, Duration::from_secs(300));
        assert_eq!(config.refresh.chart_ttl, Duration::from_secs(300));
        assert_eq!(config.refresh.macro_ttl, Duration::from_secs(3600));
        assert_eq!(config.refresh.macro_timeout, Duration::from_secs(3));
        assert_eq!(config.http.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_load_rejects_non_usd_reference_currency() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("coinboard.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[venues]")?;
        writeln!(file, "reference_currency = \"EUR\"")?;

        let err = Config::load(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("reference_currency must be USD"));

        Ok(())
    }

    #[test]
    fn test_load_rejects_non_positive_fallback_rate() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("coinboard.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[fx]")?;
        writeln!(file, "fallback_rate = 0.0")?;

        let err = Config::load(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("fallback_rate"));

        Ok(())
    }

    #[test]
    fn test_lowercase_usd_reference_currency_is_accepted() {
        let mut config = Config::default();
        config.venues.reference_currency = "usd".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_refresh_and_http_durations() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("coinboard.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[refresh]")?;
        writeln!(file, "ticker_interval = \"10s\"")?;
        writeln!(file, "jitter = \"250ms\"")?;
        writeln!(file, "[http]")?;
        writeln!(file, "timeout = \"2s\"")?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.refresh.ticker_interval, Duration::from_secs(10));
        assert_eq!(config.refresh.jitter, Duration::from_millis(250));
        assert_eq!(config.refresh.global_ttl, Duration::from_secs(300));
        assert_eq!(config.http.timeout, Duration::from_secs(2));

        Ok(())
    }

    #[test]
    fn test_load_venue_and_registry_settings() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("coinboard.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[venues]")?;
        writeln!(file, "listing_failure = \"query_all\"")?;
        writeln!(file, "usd_quote_asset = \"FDUSD\"")?;
        writeln!(file, "[registry]")?;
        writeln!(file, "limit = 50")?;
        writeln!(file, "[registry.id_overrides]")?;
        writeln!(file, "matic-network = \"POL\"")?;
        writeln!(file, "[fx]")?;
        writeln!(file, "sources = [\"frankfurter\"]")?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.venues.listing_failure, ListingFailurePolicy::QueryAll);
        assert_eq!(config.registry.limit, 50);
        assert_eq!(config.fx.sources, vec![FxSourceKind::Frankfurter]);

        let settings = config.engine_settings();
        assert_eq!(settings.usd_quote_asset, "FDUSD");
        assert_eq!(
            settings.id_overrides.get("matic-network").map(String::as_str),
            Some("POL")
        );

        Ok(())
    }

    #[test]
    fn test_rejects_bad_duration() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("coinboard.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[http]")?;
        writeln!(file, "timeout = \"soon\"")?;

        assert!(Config::load(&config_path).is_err());

        Ok(())
    }

    #[test]
    fn test_toml_round_trip() -> Result<()> {
        let mut config = Config::default();
        config.endpoints.upbit = Some("http://localhost:9000".to_string());
        config.refresh.ticker_interval = Duration::from_millis(1500);

        let parsed: Config = toml::from_str(&config.to_toml()?)?;
        assert_eq!(parsed, config);

        Ok(())
    }

    #[test]
    fn test_config_load_or_default_missing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("missing.toml");

        let config = Config::load_or_default(&config_path)?;
        assert_eq!(config, Config::default());

        Ok(())
    }
}
