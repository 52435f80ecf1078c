//! Market validity filtering.
//!
//! Venues reject or silently ignore batched ticker queries that name
//! unsupported pairs, so symbols are narrowed to what each venue actually
//! lists before tickers are requested.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// How a venue encodes a base symbol into a market key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "quote")]
pub enum MarketConvention {
    /// `{quote}-{base}`, e.g. `KRW-BTC`.
    QuotePrefix(String),
    /// `{base}{quote}`, e.g. `BTCUSDT`.
    QuoteSuffix(String),
}

impl MarketConvention {
    pub fn quote(&self) -> &str {
        match self {
            Self::QuotePrefix(quote) | Self::QuoteSuffix(quote) => quote,
        }
    }

    /// Encode an (already uppercased) base symbol.
    pub fn market_key(&self, base: &str) -> String {
        match self {
            Self::QuotePrefix(quote) => format!("{quote}-{base}"),
            Self::QuoteSuffix(quote) => format!("{base}{quote}"),
        }
    }

    /// Recover the base symbol from a market key in this convention.
    pub fn base_of<'a>(&self, market_key: &'a str) -> Option<&'a str> {
        let base = match self {
            Self::QuotePrefix(quote) => market_key
                .strip_prefix(quote.as_str())
                .and_then(|rest| rest.strip_prefix('-')),
            Self::QuoteSuffix(quote) => market_key.strip_suffix(quote.as_str()),
        }?;
        (!base.is_empty()).then_some(base)
    }
}

/// What to do when a venue's market listing could not be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingFailurePolicy {
    /// Treat the venue as unavailable for this cycle.
    #[default]
    SkipVenue,
    /// Query every symbol and let unsupported ones be absent from the response.
    QueryAll,
}

/// Base symbols a venue lists against its quote currency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VenueListing {
    bases: HashSet<String>,
}

impl VenueListing {
    pub fn new<I, S>(bases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            bases: bases
                .into_iter()
                .map(|b| b.as_ref().trim().to_uppercase())
                .filter(|b| !b.is_empty())
                .collect(),
        }
    }

    /// Build from raw market keys, keeping those in `convention`.
    pub fn from_market_keys<I, S>(keys: I, convention: &MarketConvention) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let bases: Vec<String> = keys
            .into_iter()
            .filter_map(|key| {
                let key = key.as_ref().trim().to_uppercase();
                convention.base_of(&key).map(str::to_string)
            })
            .collect();
        Self::new(bases)
    }

    pub fn contains(&self, base: &str) -> bool {
        self.bases.contains(&base.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}

/// Market keys to request from a venue.
///
/// Symbols are uppercased and de-duplicated, keeping first-seen order. With
/// no listing, `policy` decides between querying everything and nothing.
pub fn market_keys<S: AsRef<str>>(
    symbols: &[S],
    listing: Option<&VenueListing>,
    policy: ListingFailurePolicy,
    convention: &MarketConvention,
) -> Vec<String> {
    if listing.is_none() && policy == ListingFailurePolicy::SkipVenue {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    symbols
        .iter()
        .map(|s| s.as_ref().trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .filter(|s| listing.map_or(true, |l| l.contains(s)))
        .filter(|s| seen.insert(s.clone()))
        .map(|s| convention.market_key(&s))
        .collect()
}
