mod config;
mod dashboard;
mod service;
mod types;

pub use config::config_output;
pub use dashboard::{
    arbitrage, fear_greed, global_market, macro_indicators, market_chart, render_table,
};
pub use service::build_service;
pub use types::{ArbitrageOutput, ChartOutput, FearGreedOutput, GlobalOutput, MacroOutput};
