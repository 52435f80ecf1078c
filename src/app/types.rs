use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::market_data::{
    DashboardSnapshot, DependencyStatus, DominanceReading, GlobalMarket, MacroSnapshot,
    MarketChart, PremiumSummary, ReconciledAsset, SentimentBand, SentimentReading, SortOrder,
    SymbolCollision, VenueReport,
};

/// JSON output for the premium table
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrageOutput {
    pub taken_at: DateTime<Utc>,
    pub exchange_rate: f64,
    pub fx_fallback_used: bool,
    pub sort: SortOrder,
    pub assets: Vec<ReconciledAsset>,
    pub summary: PremiumSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub collisions: Vec<SymbolCollision>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unpriced: Vec<String>,
    pub registry: DependencyStatus,
    pub fx: DependencyStatus,
    pub venues: Vec<VenueReport>,
}

impl ArbitrageOutput {
    pub fn from_snapshot(snapshot: DashboardSnapshot, sort: SortOrder) -> Self {
        let reconciliation = snapshot.reconciliation;
        let mut assets = reconciliation.assets;
        sort.apply(&mut assets);

        Self {
            taken_at: snapshot.taken_at,
            exchange_rate: reconciliation.exchange_rate,
            fx_fallback_used: reconciliation.fx_fallback_used,
            sort,
            assets,
            summary: snapshot.summary,
            collisions: reconciliation.symbol_collisions,
            unpriced: reconciliation.unpriced,
            registry: snapshot.registry,
            fx: snapshot.fx,
            venues: snapshot.venues,
        }
    }
}

/// JSON output for the Fear & Greed index
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FearGreedOutput {
    pub value: u32,
    pub band: SentimentBand,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<SentimentReading>,
    /// Oldest first.
    pub history: Vec<SentimentReading>,
    pub status: DependencyStatus,
}

/// JSON output for global market figures and the dominance phase
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalOutput {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalMarket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominance: Option<DominanceReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DependencyStatus>,
}

/// JSON output for one asset's price history
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOutput {
    pub coin_id: String,
    pub days: u32,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_price: Option<f64>,
    /// Percent change across the range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<MarketChart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DependencyStatus>,
}

/// JSON output for the macro backdrop
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroOutput {
    #[serde(flatten)]
    pub snapshot: MacroSnapshot,
    pub last_updated: DateTime<Utc>,
    pub status: DependencyStatus,
}
