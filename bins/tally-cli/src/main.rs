//! tally-cli: operator tool for the Tally commission engine.
//!
//! Reads a portfolio snapshot (`{"consultants": [...], "sales": [...]}`) and
//! prints settlements, fidelity statements, incentive status and portfolio
//! summaries as JSON.

mod config;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tally_core::rates::{IncentiveTier, RewardOption};
use tally_core::store::{InMemoryStore, SaleStore, TeamDirectory};
use tally_core::{ConsultantId, Period, RateSchedule, Rank, TallyError};
use tally_engine::summary::round_currency;
use tally_engine::{CommissionEngine, QuickStartStatus};
use tracing::{debug, info};

use crate::config::TallyConfig;

/// Commission, fidelity and incentive calculations for a reseller network.
#[derive(Parser)]
#[command(name = "tally-cli", version, about)]
struct Cli {
    /// Config file (default: <config dir>/tally/tally.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Rate book JSON; overrides `rates_path` from the config
    #[arg(long, global = true)]
    rates: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format ("text" or "json")
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Commission, clawback and upline payouts for one sale.
    Settle(SaleArgs),
    /// Fidelity ledger entries for one sale and month.
    Fidelity(FidelityArgs),
    /// ASP total, tier progress and Personal Quick Start for a consultant.
    Incentives(ConsultantArgs),
    /// Portfolio overview for a consultant.
    Summary(ConsultantArgs),
    /// Reward options at a tier for a rank.
    Rewards(RewardsArgs),
    /// Print the rate book versions in use.
    Rates,
}

#[derive(Args)]
struct PortfolioArgs {
    /// Portfolio snapshot JSON
    #[arg(short, long)]
    portfolio: PathBuf,

    /// Evaluation date, YYYY-MM-DD (default: today)
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

#[derive(Args)]
struct SaleArgs {
    #[command(flatten)]
    portfolio: PortfolioArgs,

    /// Sale id
    #[arg(short, long)]
    sale: String,
}

#[derive(Args)]
struct FidelityArgs {
    #[command(flatten)]
    portfolio: PortfolioArgs,

    /// Sale id
    #[arg(short, long)]
    sale: String,

    /// Month, YYYY-MM
    #[arg(long, value_parser = parse_period)]
    period: Period,
}

#[derive(Args)]
struct ConsultantArgs {
    #[command(flatten)]
    portfolio: PortfolioArgs,

    /// Consultant id
    #[arg(short, long)]
    consultant: String,
}

#[derive(Args)]
struct RewardsArgs {
    /// Tier name, e.g. GOLD
    #[arg(long)]
    tier: String,

    /// Rank, e.g. SC
    #[arg(long)]
    rank: Rank,
}

fn parse_period(s: &str) -> Result<Period, String> {
    let first = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM: {e}"))?;
    Period::containing(first).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = TallyConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(rates) = cli.rates {
        cfg.rates_path = Some(rates);
    }
    if let Some(level) = cli.log_level {
        cfg.log_level = level;
    }
    if let Some(format) = cli.log_format {
        cfg.log_format = format;
    }

    init_logging(&cfg.log_level, &cfg.log_format);
    debug!(?cfg, "configuration loaded");

    let engine = CommissionEngine::new(load_schedule(cfg.rates_path.as_deref())?);

    match cli.command {
        Commands::Settle(args) => settle(&engine, args),
        Commands::Fidelity(args) => fidelity(&engine, args),
        Commands::Incentives(args) => incentives(&engine, args),
        Commands::Summary(args) => summary(&engine, args, cfg.round_output),
        Commands::Rewards(args) => rewards(&engine, args),
        Commands::Rates => print_json(&engine.schedule().versions()),
    }
}

fn load_schedule(path: Option<&Path>) -> Result<RateSchedule> {
    match path {
        Some(path) => {
            let schedule = RateSchedule::from_path(path)
                .with_context(|| format!("Failed to load rates from {}", path.display()))?;
            info!(
                path = %path.display(),
                versions = schedule.versions().len(),
                "rate schedule loaded"
            );
            Ok(schedule)
        }
        None => Ok(RateSchedule::default()),
    }
}

fn load_portfolio(path: &Path) -> Result<InMemoryStore> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read portfolio: {}", path.display()))?;
    InMemoryStore::from_json_str(&json)
        .with_context(|| format!("Invalid portfolio snapshot: {}", path.display()))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Surface only the sanitized message; details are already logged.
fn user_error(e: TallyError) -> anyhow::Error {
    anyhow!(e.public_message())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{out}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn settle(engine: &CommissionEngine, args: SaleArgs) -> Result<()> {
    let store = load_portfolio(&args.portfolio.portfolio)?;
    let as_of = args.portfolio.as_of.unwrap_or_else(today);
    let settlement = engine
        .settle_stored(&store, &store, &args.sale, as_of)
        .map_err(user_error)?;
    print_json(&settlement)
}

#[derive(Serialize)]
struct FidelityStatement {
    period: Period,
    entries: Vec<tally_core::FidelityLedgerEntry>,
    accrued_to_date: rust_decimal::Decimal,
}

fn fidelity(engine: &CommissionEngine, args: FidelityArgs) -> Result<()> {
    let store = load_portfolio(&args.portfolio.portfolio)?;
    let sale = store
        .get_sale(&args.sale)
        .map_err(user_error)?
        .ok_or_else(|| anyhow!("sale not found: {}", args.sale))?;
    let chain = store.sponsor_chain(&sale.consultant).map_err(user_error)?;

    let entries = engine
        .fidelity_for_month(&sale, &chain, args.period)
        .map_err(user_error)?;
    let accrued_to_date = engine
        .accrued_fidelity(&sale, args.period)
        .map_err(user_error)?;
    print_json(&FidelityStatement {
        period: args.period,
        entries,
        accrued_to_date,
    })
}

#[derive(Serialize)]
struct IncentiveStatus<'a> {
    consultant: ConsultantId,
    rank: Rank,
    total_points: rust_decimal::Decimal,
    unlocked_tiers: Vec<&'a IncentiveTier>,
    next_tier: Option<&'a IncentiveTier>,
    points_to_next_tier: rust_decimal::Decimal,
    quick_start: QuickStartStatus,
}

fn incentives(engine: &CommissionEngine, args: ConsultantArgs) -> Result<()> {
    let store = load_portfolio(&args.portfolio.portfolio)?;
    let consultant = ConsultantId::new(args.consultant);
    let profile = store.profile(&consultant).map_err(user_error)?;
    let sales = store.sales_for(&consultant).map_err(user_error)?;

    let ledger = engine.ledger_for(&consultant, &sales).map_err(user_error)?;
    let quick_start = engine
        .quick_start(profile.start_date, &sales)
        .map_err(user_error)?;
    let tiers = engine.schedule().latest().tiers();

    print_json(&IncentiveStatus {
        consultant,
        rank: profile.rank,
        total_points: ledger.total_points,
        unlocked_tiers: ledger.unlocked_tiers(tiers),
        next_tier: ledger.next_tier(tiers),
        points_to_next_tier: ledger.points_to_next_tier(tiers),
        quick_start,
    })
}

fn summary(engine: &CommissionEngine, args: ConsultantArgs, round: bool) -> Result<()> {
    let store = load_portfolio(&args.portfolio.portfolio)?;
    let consultant = ConsultantId::new(args.consultant);
    let sales = store.sales_for(&consultant).map_err(user_error)?;
    let as_of = args.portfolio.as_of.unwrap_or_else(today);

    let summary = engine.summarize(&sales, as_of).map_err(user_error)?;
    if round {
        print_json(&summary.rounded())
    } else {
        print_json(&summary)
    }
}

#[derive(Serialize)]
struct RewardsView {
    tier: String,
    rank: Rank,
    options: Vec<RewardOption>,
}

fn rewards(engine: &CommissionEngine, args: RewardsArgs) -> Result<()> {
    let options = engine
        .rewards_for(&args.tier, args.rank)
        .map_err(user_error)?
        .into_iter()
        .map(|o| match o {
            RewardOption::CashBonus(amount) => RewardOption::CashBonus(round_currency(amount)),
            gift => gift,
        })
        .collect();
    print_json(&RewardsView {
        tier: args.tier.to_uppercase(),
        rank: args.rank,
        options,
    })
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Logs go to stderr so stdout stays valid JSON. Pass `format = "json"` for
/// structured output; any other value gives human-readable text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn period_parsing() {
        let p = parse_period("2025-02").unwrap();
        assert_eq!(p.to_string(), "2025-02");
        assert!(parse_period("2025-13").is_err());
        assert!(parse_period("February").is_err());
    }

    #[test]
    fn portfolio_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portfolio.json");
        std::fs::write(
            &path,
            r#"{"consultants": [], "sales": [{"id": "S-1", "consultant": "a",
                "sale_date": "2025-01-01", "items": []}]}"#,
        )
        .unwrap();
        let store = load_portfolio(&path).unwrap();
        assert!(store.get_sale("S-1").unwrap().is_some());
        assert!(load_portfolio(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn builtin_schedule_when_no_path() {
        let schedule = load_schedule(None).unwrap();
        assert_eq!(schedule.versions().len(), 1);
    }
}
