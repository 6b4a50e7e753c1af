//! SolYield CLI
//!
//! Run with: cargo run -- yields --limit 10 --stable

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use solyield::portfolio::JsonFilePortfolioSource;
use solyield::{Config, PoolFilters, Pool, Priority, RiskTier, YieldService};

#[derive(Parser)]
#[command(name = "solyield")]
#[command(about = "Solana yield explorer and portfolio recommendations")]
struct Cli {
    /// TOML config file (defaults to environment / .env)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Highest-APY pools
    Yields {
        #[arg(short, long, default_value_t = 20, allow_negative_numbers = true)]
        limit: i64,

        /// Stablecoin pools only
        #[arg(long)]
        stable: bool,

        /// Only this project (e.g. kamino-lend)
        #[arg(short, long)]
        project: Option<String>,

        /// Exclude pools with impermanent-loss risk
        #[arg(long)]
        no_il: bool,

        /// Minimum TVL in USD
        #[arg(long)]
        min_tvl: Option<f64>,
    },

    /// Find pools by symbol or project
    Search { query: String },

    /// Per-protocol rollup with Marinade detail
    Protocols,

    /// Recommendations for a saved wallet portfolio
    Recommend {
        /// Wallet address; reads <dir>/<wallet>.json
        wallet: String,

        /// Directory of portfolio snapshots
        #[arg(short, long, default_value = "portfolios")]
        dir: PathBuf,

        /// low, medium or high
        #[arg(short, long, default_value = "medium")]
        risk: String,
    },

    /// Marinade staking stats
    Marinade,

    /// Show (and optionally save) the active configuration
    Config {
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!("{}", style(" 🌾 SOLYIELD - Solana Yield Explorer").cyan().bold());
    println!(
        "{}",
        style("    DefiLlama pools | Marinade | Risk-tiered recommendations").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

async fn with_spinner<T>(message: &str, work: impl Future<Output = T>) -> T {
    let pb = create_spinner(message);
    let out = work.await;
    pb.finish_and_clear();
    out
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fmt_apy(apy: Option<f64>) -> String {
    apy.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v))
}

fn fmt_usd(value: f64) -> String {
    if value >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else if value >= 1e3 {
        format!("${:.1}K", value / 1e3)
    } else {
        format!("${:.2}", value)
    }
}

fn print_pools(pools: &[Pool]) {
    if pools.is_empty() {
        println!("{}", style("No pools matched.").yellow());
        return;
    }

    println!(
        "{}",
        style(format!("{:<4} {:<22} {:<24} {:>10} {:>12}", "#", "PROJECT", "SYMBOL", "APY", "TVL")).bold()
    );
    for (i, pool) in pools.iter().enumerate() {
        let il = if pool.has_il_risk() { style(" IL").red().to_string() } else { String::new() };
        let stable = if pool.stablecoin { style(" $").green().to_string() } else { String::new() };
        println!(
            "{:<4} {:<22} {:<24} {:>10} {:>12}{}{}",
            i + 1,
            pool.project,
            pool.symbol,
            fmt_apy(pool.apy),
            fmt_usd(pool.tvl_usd),
            stable,
            il
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("solyield=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file or --config");
        return Err(e);
    }

    if !cli.json {
        print_banner();
    }

    let service = YieldService::from_config(&config);

    match cli.command {
        Commands::Yields { limit, stable, project, no_il, min_tvl } => {
            let filters = PoolFilters {
                stable_only: stable,
                project,
                no_impermanent_loss: no_il,
                min_tvl_usd: min_tvl,
            };
            let pools = with_spinner("Fetching Solana pools...", service.get_top_yields(limit, &filters)).await?;

            if cli.json {
                print_json(&pools)?;
            } else {
                println!("{}", style("═══ TOP YIELDS ═══").blue().bold());
                print_pools(&pools);
            }
        }

        Commands::Search { query } => {
            let pools = with_spinner("Searching pools...", service.search(&query)).await?;

            if cli.json {
                print_json(&pools)?;
            } else {
                println!(
                    "{} {} matches for '{}'",
                    style("✓").green(),
                    pools.len(),
                    style(&query).cyan()
                );
                print_pools(&pools);
            }
        }

        Commands::Protocols => {
            let overview = with_spinner("Aggregating protocols...", service.get_protocol_overview()).await?;

            if cli.json {
                print_json(&overview)?;
            } else {
                println!("{}", style("═══ PROTOCOLS ═══").magenta().bold());
                println!(
                    "{}",
                    style(format!("{:<26} {:>6} {:>12} {:>10} {:>10}", "PROJECT", "POOLS", "TVL", "AVG APY", "MAX APY")).bold()
                );
                for rollup in &overview.protocols {
                    println!(
                        "{:<26} {:>6} {:>12} {:>9.2}% {:>9.2}%",
                        rollup.project,
                        rollup.pool_count,
                        fmt_usd(rollup.total_tvl),
                        rollup.avg_apy,
                        rollup.max_apy
                    );
                }
                println!();
                println!(
                    "{} Marinade mSOL APY: {}",
                    style("•").cyan(),
                    fmt_apy(overview.marinade_detail.apy)
                );
                println!("{} Data as of {}", style("•").cyan(), overview.fetched_at);
            }
        }

        Commands::Recommend { wallet, dir, risk } => {
            let tier: RiskTier = risk.parse()?;
            let source = JsonFilePortfolioSource::new(dir);
            let set = with_spinner(
                "Matching portfolio against pools...",
                service.recommend_for_wallet(&source, &wallet, tier),
            )
            .await?;

            if cli.json {
                print_json(&set)?;
            } else {
                println!(
                    "{}",
                    style(format!("═══ RECOMMENDATIONS ({} risk) ═══", set.risk_tier)).green().bold()
                );
                if set.recommendations.is_empty() {
                    println!("{}", style("Nothing to suggest right now.").yellow());
                }
                for rec in &set.recommendations {
                    let badge = match rec.priority {
                        Priority::High => style("HIGH  ").red().bold(),
                        Priority::Medium => style("MEDIUM").yellow().bold(),
                        Priority::Low => style("LOW   ").dim(),
                    };
                    println!("{} {}", badge, style(&rec.title).bold());
                    println!("       {}", rec.description);
                    if let Some(action) = &rec.action {
                        println!("       → {}", style(action).cyan());
                    }
                }
                println!();
                println!(
                    "{} Potential annual gain: {}",
                    style("💰").green(),
                    style(format!("${:.2}", set.total_potential_annual_gain)).green().bold()
                );
            }
        }

        Commands::Marinade => {
            let stats = with_spinner("Fetching Marinade stats...", service.marinade_stats()).await;

            if cli.json {
                print_json(&stats)?;
            } else {
                println!("{}", style(format!("═══ {} ({}) ═══", stats.protocol, stats.token)).cyan().bold());
                println!("APY (30d): {}", fmt_apy(stats.apy));
                println!(
                    "TVL:       {}",
                    stats.tvl.map_or_else(|| "n/a".to_string(), |t| format!("{:.0} SOL", t))
                );
                println!("{}", stats.description);
                if let Some(err) = &stats.error {
                    println!("{}", style(err).yellow());
                }
            }
        }

        Commands::Config { save } => {
            config.print_summary();
            if let Some(path) = save {
                config.save_to_file(&path)?;
                println!("{} Saved to {}", style("✓").green(), path.display());
            }
        }
    }

    Ok(())
}
