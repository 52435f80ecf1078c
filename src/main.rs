use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use coinboard::app::{self, ArbitrageOutput};
use coinboard::config::{default_config_path, Config};
use coinboard::market_data::{MarketDataService, SortDirection, SortKey, SortOrder};
use rand::Rng;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "coinboard")]
#[command(about = "Cross-exchange crypto price and premium dashboard")]
struct Cli {
    /// Path to config file (defaults to ./coinboard.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Copy)]
struct TableArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Column to sort by (e.g. marketCap, kimchiPremium, symbol)
    #[arg(long, default_value = "marketCap")]
    sort: SortKey,

    /// Sort ascending instead of descending
    #[arg(long)]
    asc: bool,
}

impl TableArgs {
    fn order(self) -> SortOrder {
        let direction = if self.asc {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        };
        SortOrder::new(self.sort, direction)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Fetch once and print the premium table
    Snapshot(TableArgs),
    /// Refresh on the configured interval until ctrl-c
    Watch(TableArgs),
    /// Serve the JSON API
    #[cfg(feature = "http")]
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Show the resolved configuration
    Config,
}

fn compute_next_delay(interval: Duration, jitter: Duration) -> Duration {
    if jitter.is_zero() {
        return interval;
    }

    let base_ms = interval.as_millis().min(u128::from(u64::MAX)) as i128;
    let jitter_ms = jitter.as_millis().min(u128::from(u64::MAX)) as i128;
    let offset = rand::thread_rng().gen_range(-jitter_ms..=jitter_ms);

    let min_ms = 1_000_i128;
    let max_ms = i128::from(u64::MAX);
    let delay_ms = (base_ms + offset).clamp(min_ms, max_ms) as u64;
    Duration::from_millis(delay_ms)
}

fn print_output(output: &ArbitrageOutput, args: TableArgs, config: &Config) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string(output)?);
    } else {
        print!("{}", app::render_table(output, &config.display));
    }
    Ok(())
}

async fn watch(service: &MarketDataService, args: TableArgs, config: &Config) -> Result<()> {
    let interval = config.refresh.ticker_interval;
    let jitter = config.refresh.jitter;
    info!(
        interval_ms = interval.as_millis() as u64,
        jitter_ms = jitter.as_millis() as u64,
        "watching"
    );

    let order = args.order();
    let mut next_delay = Duration::ZERO;
    loop {
        let sleep = tokio::time::sleep(next_delay);
        tokio::pin!(sleep);

        tokio::select! {
            _ = &mut sleep => {
                let output = app::arbitrage(service, order).await;
                print_output(&output, args, config)?;
                next_delay = compute_next_delay(interval, jitter);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received, stopping");
                break;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .json(),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = Config::load_or_default(&config_path)?;

    match cli.command {
        Command::Snapshot(args) => {
            let service = app::build_service(&config)?;
            let output = app::arbitrage(&service, args.order()).await;
            print_output(&output, args, &config)?;
        }
        Command::Watch(args) => {
            let service = app::build_service(&config)?;
            watch(&service, args, &config).await?;
        }
        #[cfg(feature = "http")]
        Command::Serve { bind } => {
            let mut config = config;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            coinboard::server::serve(&config).await?;
        }
        Command::Config => {
            let output = app::config_output(&config_path, &config)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
