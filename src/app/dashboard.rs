use std::fmt::Write as _;

use chrono::Utc;

use crate::config::DisplayConfig;
use crate::format::{format_krw, format_percent, format_premium, format_usd};

use crate::market_data::{ChartQuery, DependencyStatus, MarketDataService, Origin, SortOrder};

use super::types::{ArbitrageOutput, ChartOutput, FearGreedOutput, GlobalOutput, MacroOutput};

/// Refresh once and return the reconciled rows in `sort` order.
pub async fn arbitrage(service: &MarketDataService, sort: SortOrder) -> ArbitrageOutput {
    let snapshot = service.refresh().await;
    ArbitrageOutput::from_snapshot(snapshot, sort)
}

pub async fn fear_greed(service: &MarketDataService) -> FearGreedOutput {
    let sourced = service.sentiment().await;
    let status = DependencyStatus::from(&sourced);
    let index = sourced.value;
    let band = index.band();

    FearGreedOutput {
        value: index.value(),
        band,
        label: band.label().to_string(),
        latest: index.latest().cloned(),
        history: index.chronological().cloned().collect(),
        status,
    }
}

pub async fn global_market(service: &MarketDataService) -> GlobalOutput {
    let (global, dominance) = tokio::join!(service.global(), service.dominance());
    match global {
        Some(sourced) => GlobalOutput {
            available: true,
            status: Some(DependencyStatus::from(&sourced)),
            global: Some(sourced.value),
            dominance,
        },
        None => GlobalOutput {
            available: false,
            global: None,
            dominance: None,
            status: None,
        },
    }
}

pub async fn market_chart(service: &MarketDataService, query: &ChartQuery) -> ChartOutput {
    let sourced = service.market_chart(query).await;
    let mut output = ChartOutput {
        coin_id: query.coin_id.clone(),
        days: query.days,
        available: false,
        latest_price: None,
        change_percent: None,
        chart: None,
        status: None,
    };
    if let Some(sourced) = sourced {
        output.available = true;
        output.status = Some(DependencyStatus::from(&sourced));
        output.latest_price = sourced.value.latest_price();
        output.change_percent = sourced.value.change_percent();
        output.chart = Some(sourced.value);
    }
    output
}

pub async fn macro_indicators(service: &MarketDataService) -> MacroOutput {
    let sourced = service.macro_snapshot().await;
    MacroOutput {
        status: DependencyStatus::from(&sourced),
        snapshot: sourced.value,
        last_updated: Utc::now(),
    }
}

fn origin_note(status: &DependencyStatus) -> &'static str {
    match status.origin {
        Origin::Live => "",
        Origin::Cached => " (cached)",
        Origin::Fallback => " (fallback)",
    }
}

/// Plain-text premium table for terminal output.
pub fn render_table(output: &ArbitrageOutput, display: &DisplayConfig) -> String {
    let usd_dp = display.usd_decimals;
    let pct_dp = display.percent_decimals;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{:<8} {:>18} {:>14} {:>14} {:>9} {:>9} {:>9}",
        "SYMBOL", "UPBIT", "BINANCE", "COINBASE", "KIMCHI", "CB PREM", "24H"
    );
    for asset in &output.assets {
        let _ = writeln!(
            out,
            "{:<8} {:>18} {:>14} {:>14} {:>9} {:>9} {:>9}",
            asset.symbol,
            format_krw(asset.upbit_price),
            format_usd(asset.binance_price, usd_dp, display.grouping),
            format_usd(asset.coinbase_price, usd_dp, display.grouping),
            format_premium(asset.kimchi_premium, asset.has_kimchi_premium(), pct_dp),
            format_premium(asset.coinbase_premium, asset.has_coinbase_premium(), pct_dp),
            format_percent(asset.change24h, pct_dp),
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "USD/KRW {}{}",
        format_krw(output.exchange_rate),
        if output.fx_fallback_used {
            " (fallback)"
        } else {
            origin_note(&output.fx)
        }
    );

    let kimchi = &output.summary.kimchi;
    if kimchi.count > 0 {
        let _ = writeln!(
            out,
            "Kimchi premium: mean {} (min {}, max {}) over {} assets",
            format_percent(kimchi.mean, pct_dp),
            format_percent(kimchi.min, pct_dp),
            format_percent(kimchi.max, pct_dp),
            kimchi.count
        );
    }
    let coinbase = &output.summary.coinbase;
    if coinbase.count > 0 {
        let _ = writeln!(
            out,
            "Coinbase premium: mean {} over {} assets",
            format_percent(coinbase.mean, pct_dp),
            coinbase.count
        );
    }

    if output.registry.origin != Origin::Live {
        let _ = writeln!(out, "Registry{}", origin_note(&output.registry));
    }
    for venue in output.venues.iter().filter(|v| v.error.is_some()) {
        let reason = if venue.timed_out { "timed out" } else { "failed" };
        let _ = writeln!(out, "{} {reason}", venue.venue);
    }
    for collision in &output.collisions {
        let _ = writeln!(
            out,
            "{} shared by {} and {}; kept {}",
            collision.symbol,
            collision.kept_id,
            collision.dropped_ids.join(", "),
            collision.kept_id
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::{
        DashboardSnapshot, ReconciledAsset, Reconciliation, SortDirection, SortKey, VenueReport,
    };
    use chrono::{TimeZone, Utc};

    fn asset(symbol: &str, upbit: f64, binance: f64, kimchi: f64) -> ReconciledAsset {
        ReconciledAsset {
            id: symbol.to_lowercase(),
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            image: String::new(),
            change24h: 1.5,
            market_cap: binance * 1000.0,
            market_cap_change24h: 0.0,
            binance_price: binance,
            upbit_price: upbit,
            coinbase_price: 0.0,
            kimchi_premium: kimchi,
            coinbase_premium: 0.0,
        }
    }

    fn snapshot() -> DashboardSnapshot {
        let live = DependencyStatus {
            origin: Origin::Live,
            stale: false,
            fetched_at: None,
        };
        let reconciliation = Reconciliation {
            assets: vec![
                asset("XRP", 0.0, 0.5, 0.0),
                asset("BTC", 150_000_000.0, 100_000.0, 7.142857),
            ],
            exchange_rate: 1400.0,
            fx_fallback_used: true,
            symbol_collisions: Vec::new(),
            unpriced: vec!["XYZ".to_string()],
        };
        let summary = reconciliation.summary();
        DashboardSnapshot {
            taken_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            reconciliation,
            summary,
            registry: live,
            fx: DependencyStatus {
                origin: Origin::Fallback,
                stale: true,
                fetched_at: None,
            },
            venues: vec![VenueReport {
                venue: "upbit".to_string(),
                listed: None,
                requested: 2,
                received: 0,
                timed_out: true,
                error: Some("upbit timed out after 5s".to_string()),
            }],
        }
    }

    #[test]
    fn output_applies_sort_order() {
        let output = ArbitrageOutput::from_snapshot(
            snapshot(),
            SortOrder::new(SortKey::MarketCap, SortDirection::Desc),
        );
        let symbols: Vec<_> = output.assets.iter().map(|a| a.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "XRP"]);
        assert_eq!(output.unpriced, vec!["XYZ".to_string()]);
    }

    #[test]
    fn table_shows_dash_for_missing_premium() {
        let output = ArbitrageOutput::from_snapshot(snapshot(), SortOrder::default());
        let table = render_table(&output, &DisplayConfig::default());

        let btc = table.lines().find(|l| l.starts_with("BTC")).unwrap();
        assert!(btc.contains("₩150,000,000"));
        assert!(btc.contains("$100,000.00"));
        assert!(btc.contains("+7.14%"));

        let xrp = table.lines().find(|l| l.starts_with("XRP")).unwrap();
        assert!(xrp.contains("$0.5000"));
        assert!(!xrp.contains("0.00%"));

        assert!(table.contains("USD/KRW ₩1,400 (fallback)"));
        assert!(table.contains("upbit timed out"));
    }

    #[test]
    fn output_serializes_camel_case() {
        let output = ArbitrageOutput::from_snapshot(snapshot(), SortOrder::default());
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["exchangeRate"], 1400.0);
        assert_eq!(json["fxFallbackUsed"], true);
        assert_eq!(json["assets"][0]["kimchiPremium"], 7.142857);
        assert!(json.get("collisions").is_none());
    }
}
