//! Export: trade ledger CSV, equity curve CSV and pretty JSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use trendscan_core::{BacktestResult, Trade};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: side, entry_index, entry_timestamp, entry_price, exit_index,
/// exit_timestamp, exit_price, exit_reason, size_usd, fees, pnl, balance
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "side",
        "entry_index",
        "entry_timestamp",
        "entry_price",
        "exit_index",
        "exit_timestamp",
        "exit_price",
        "exit_reason",
        "size_usd",
        "fees",
        "pnl",
        "balance",
    ])?;

    for t in trades {
        wtr.write_record([
            t.side.to_string(),
            t.entry_index.to_string(),
            t.entry_timestamp.to_string(),
            format!("{:.6}", t.entry_price),
            t.exit_index.to_string(),
            t.exit_timestamp.to_string(),
            format!("{:.6}", t.exit_price),
            t.exit_reason.to_string(),
            format!("{:.2}", t.size_usd),
            format!("{:.6}", t.fees),
            format!("{:.6}", t.pnl),
            format!("{:.2}", t.balance),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: step, equity. Step 0 is the initial balance.
pub fn export_equity_csv(equity_curve: &[f64]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["step", "equity"])?;
    for (i, eq) in equity_curve.iter().enumerate() {
        wtr.write_record([i.to_string(), format!("{eq:.2}")])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `result.json`, `trades.csv` and `equity.csv` for one backtest into
/// `{output_dir}/{name}/` and return that directory.
pub fn save_backtest(result: &BacktestResult, output_dir: &Path, name: &str) -> Result<PathBuf> {
    let run_dir = output_dir.join(name);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create output dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("result.json"), export_json(result)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&result.trades)?)?;
    std::fs::write(run_dir.join("equity.csv"), export_equity_csv(&result.equity_curve)?)?;

    Ok(run_dir)
}

/// Write any serialisable report as pretty JSON.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, export_json(value)?)
        .with_context(|| format!("failed to write {}", path.display()))
}
