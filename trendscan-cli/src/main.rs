//! TrendScan CLI: backtest, optimize and profile commands.
//!
//! Commands:
//! - `backtest`: run one profile on CSV or synthetic candles and save artifacts
//! - `optimize`: grid search with single, train/test or walk-forward validation
//! - `profiles`: list profiles and their resolved parameters

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use trendscan_core::data::Interval;
use trendscan_core::{AccountConfig, BacktestResult, ProfileBook, StrategyParams, StrategyVariant};
use trendscan_runner::export::{save_backtest, save_json};
use trendscan_runner::{
    load_candles, run_optimization, run_profile_backtest, LoadOptions, LoadedCandles, ModeResult,
    Objective, OptimizationReport, OptimizeConfig, OptimizeMode, RunStats,
};

#[derive(Parser)]
#[command(name = "trendscan", about = "TrendScan CLI: trend-following backtests and parameter search")]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct DataArgs {
    /// Candle CSV file (timestamp,open,high,low,close,volume).
    #[arg(long, conflicts_with = "synthetic")]
    csv: Option<PathBuf>,

    /// Generate N synthetic candles instead of reading a file.
    #[arg(long)]
    synthetic: Option<usize>,

    /// Candle interval: 15m, 1h, 4h or 1d (default 1h).
    #[arg(long)]
    interval: Option<Interval>,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one profile and save result.json, trades.csv and equity.csv.
    Backtest {
        #[arg(long, default_value = "BTC")]
        symbol: String,

        /// Profile name. Defaults to the book's default profile.
        #[arg(long)]
        profile: Option<String>,

        /// Profile book TOML. Defaults to the built-in profiles.
        #[arg(long)]
        profiles: Option<PathBuf>,

        #[command(flatten)]
        data: DataArgs,

        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Search parameters and validate them out of sample.
    Optimize {
        /// Optimisation TOML config. Flags below override it.
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        symbol: Option<String>,

        /// single, train-test or walk-forward.
        #[arg(long)]
        mode: Option<OptimizeMode>,

        /// win-rate or return.
        #[arg(long)]
        objective: Option<Objective>,

        /// trend-cross or regime-oscillator.
        #[arg(long, value_parser = parse_variant)]
        variant: Option<StrategyVariant>,

        #[arg(long)]
        min_trades: Option<usize>,

        /// Train/test split date (YYYY-MM-DD); overrides the train ratio.
        #[arg(long)]
        train_end: Option<String>,

        #[arg(long)]
        profiles: Option<PathBuf>,

        /// Evaluate candidates sequentially.
        #[arg(long, default_value_t = false)]
        serial: bool,

        #[command(flatten)]
        data: DataArgs,

        /// Print the full report as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Also write the JSON report to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List profiles and their resolved parameters.
    Profiles {
        #[arg(long)]
        profiles: Option<PathBuf>,

        /// Show parameters resolved for this symbol.
        #[arg(long, default_value = "BTC")]
        symbol: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Backtest {
            symbol,
            profile,
            profiles,
            data,
            output_dir,
        } => run_backtest_cmd(&symbol, profile, profiles.as_deref(), &data, &output_dir),
        Commands::Optimize {
            config,
            symbol,
            mode,
            objective,
            variant,
            min_trades,
            train_end,
            profiles,
            serial,
            data,
            json,
            output,
        } => {
            let mut cfg = match config {
                Some(path) => OptimizeConfig::from_file(&path)
                    .with_context(|| format!("failed to load {}", path.display()))?,
                None => OptimizeConfig::default(),
            };
            if let Some(s) = symbol {
                cfg.symbol = s;
            }
            if let Some(m) = mode {
                cfg.mode = m;
            }
            if let Some(o) = objective {
                cfg.objective = o;
            }
            if let Some(v) = variant {
                cfg.variant = v;
            }
            if min_trades.is_some() {
                cfg.min_trades = min_trades;
            }
            if let Some(d) = train_end {
                cfg.train_end = Some(
                    NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                        .with_context(|| format!("invalid --train-end '{d}'"))?,
                );
            }
            if serial {
                cfg.parallel = false;
            }
            if let Some(i) = data.interval {
                cfg.interval = i;
            }
            run_optimize_cmd(&cfg, profiles.as_deref(), &data, json, output.as_deref())
        }
        Commands::Profiles { profiles, symbol } => run_profiles_cmd(profiles.as_deref(), &symbol),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_variant(s: &str) -> Result<StrategyVariant, String> {
    match s.replace('-', "_").as_str() {
        "trend_cross" | "trend" => Ok(StrategyVariant::TrendCross),
        "regime_oscillator" | "regime" | "nfi" => Ok(StrategyVariant::RegimeOscillator),
        other => Err(format!(
            "unknown variant '{other}' (expected trend-cross or regime-oscillator)"
        )),
    }
}

fn load_book(path: Option<&Path>) -> Result<ProfileBook> {
    match path {
        Some(p) => ProfileBook::from_file(p).with_context(|| format!("failed to load profiles from {}", p.display())),
        None => Ok(ProfileBook::builtin()),
    }
}

fn load_data(symbol: &str, interval: Interval, data: &DataArgs) -> Result<LoadedCandles> {
    if data.csv.is_none() && data.synthetic.is_none() {
        bail!("one of --csv or --synthetic is required");
    }
    let opts = LoadOptions {
        symbol: symbol.to_string(),
        interval,
        csv: data.csv.clone(),
        range_ms: None,
        synthetic: data.synthetic,
    };
    let loaded = load_candles(&opts, None)?;
    if loaded.is_synthetic() {
        eprintln!("WARNING: using synthetic candles for {symbol}; results are not market data");
    }
    Ok(loaded)
}

fn run_backtest_cmd(
    symbol: &str,
    profile: Option<String>,
    profiles: Option<&Path>,
    data: &DataArgs,
    output_dir: &Path,
) -> Result<()> {
    let book = load_book(profiles)?;
    let profile = profile.unwrap_or_else(|| book.default_profile.clone());
    let loaded = load_data(symbol, data.interval.unwrap_or_default(), data)?;

    let account = AccountConfig::default();
    let (params, result) = run_profile_backtest(&loaded, &book, &profile, &account)?;
    print_backtest(&loaded, &profile, &params, &result);

    let name = format!("{}_{}_{}", loaded.symbol, profile, &loaded.dataset_hash.as_str()[..8]);
    let run_dir = save_backtest(&result, output_dir, &name)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_optimize_cmd(
    cfg: &OptimizeConfig,
    profiles: Option<&Path>,
    data: &DataArgs,
    json: bool,
    output: Option<&Path>,
) -> Result<()> {
    let book = load_book(profiles)?;
    debug!(run_id = %cfg.run_id(), mode = %cfg.mode, "optimize config");
    let loaded = load_data(&cfg.symbol, cfg.interval, data)?;
    let report = run_optimization(cfg, &loaded, &book)?;

    if json {
        println!("{}", trendscan_runner::export::export_json(&report)?);
    } else {
        print_report(&report);
    }
    if let Some(path) = output {
        save_json(&report, path)?;
        println!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn run_profiles_cmd(profiles: Option<&Path>, symbol: &str) -> Result<()> {
    let book = load_book(profiles)?;
    println!("Default profile: {}", book.default_profile);
    for (name, profile) in &book.profiles {
        let params = book.resolve(name, symbol)?;
        println!();
        println!("{name} ({}): {}", profile.variant(), profile.description);
        println!("  {symbol}: {}", params.label());
        for sym in profile.symbol_overrides.keys() {
            println!("  override: {sym}");
        }
    }
    Ok(())
}

// ─── Output ──────────────────────────────────────────────────────────

fn stats_line(s: &RunStats) -> String {
    format!(
        "return {:+.2}%  win {:.1}%  trades {}  dd {:.2}%",
        s.return_pct, s.win_rate, s.trade_count, s.max_drawdown_pct
    )
}

fn print_backtest(data: &LoadedCandles, profile: &str, params: &StrategyParams, r: &BacktestResult) {
    println!("=== Backtest {} / {profile} ===", data.symbol);
    println!("Params:   {}", params.label());
    println!("Candles:  {} ({:?})", data.candles.len(), data.origin);
    println!("Dataset:  {}", data.dataset_hash);
    println!("Capital:  {:.2} -> {:.2}", r.initial_capital, r.final_balance);
    println!("{}", stats_line(&RunStats::from(r)));
    println!(
        "Wins / losses: {} / {}",
        r.winning_trades(),
        r.losing_trades()
    );
}

fn print_report(report: &OptimizationReport) {
    println!(
        "=== Optimize {} [{}] objective={} ===",
        report.symbol, report.variant, report.objective
    );
    println!("Candles: {} ({:?}), dataset {}", report.candles, report.origin, report.dataset_hash);

    match &report.result {
        ModeResult::Single(s) => {
            println!("Evaluated {} combinations, {} with >= {} trades", s.evaluated, s.valid, s.min_trades);
            for (i, c) in s.top.iter().enumerate() {
                println!("{:>3}. {:<44} {}", i + 1, c.label(), stats_line(&c.stats));
            }
            println!("Best by return:   {}", s.best_by_return.label());
            println!("Best by win rate: {}", s.best_by_win_rate.label());
        }
        ModeResult::TrainTest(t) => {
            println!("Train {} candles / test {} candles", t.train_candles, t.test_candles);
            for (name, c) in [("train-best", &t.train_best), ("test-best", &t.test_best), ("stable", &t.stable)] {
                println!("{name:>10}: {}", c.params.label());
                println!("            train {}", stats_line(&c.train));
                println!("            test  {}", stats_line(&c.test));
            }
        }
        ModeResult::WalkForward(w) => {
            println!(
                "Windows: {} valid, {} skipped",
                w.results.len(),
                w.skipped.len()
            );
            for r in &w.results {
                println!(
                    "  #{:<3} {:<44} test {}",
                    r.window.index,
                    r.stable.params.label(),
                    stats_line(&r.stable.test)
                );
            }
            println!(
                "Adaptive: avg test return {:+.2}%, win {:.1}%, {} / {} positive",
                w.adaptive.avg_test_return,
                w.adaptive.avg_test_win_rate,
                w.adaptive.positive_windows,
                w.adaptive.windows
            );
            let rec = &w.recommendation;
            println!(
                "Recommended ({:?}): {}  [positive {:.0}%, avg return {:+.2}%, avg win {:.1}%]",
                rec.source,
                rec.params.label(),
                rec.positive_rate * 100.0,
                rec.avg_test_return,
                rec.avg_test_win_rate
            );
        }
    }

    println!("Benchmarks:");
    for b in &report.benchmarks {
        match (&b.stats, &b.error) {
            (Some(s), _) => println!("  {:<10} {:<36} {}", b.profile, b.label, stats_line(s)),
            (None, Some(e)) => println!("  {:<10} error: {e}", b.profile),
            (None, None) => println!("  {:<10} -", b.profile),
        }
    }
}
