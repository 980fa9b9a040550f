//! Artifact export — CSV and JSON writers for the persistence sink.
//!
//! Three artifacts: the trade tape, the per-run equity curve, and the
//! optimization leaderboard. Each has a to-string form and a to-path form;
//! the storage medium beyond that is the persistence collaborator's
//! concern. Undefined metric values export as empty cells, never as 0.

use std::path::Path;

use anyhow::{Context, Result};

use quantlab_core::domain::{EquityPoint, TradeRecord};

use crate::metrics::Metrics;
use crate::optimizer::OptimizationReport;
use crate::space::ParamSpace;
use crate::store::{EvalStatus, OptimizationResult};

// ─── Trade tape ─────────────────────────────────────────────────────

/// Columns: symbol, entry_date, entry_price, entry_reason, exit_date,
/// exit_price, exit_reason, quantity, realized_pnl, days_held, return_frac
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "entry_date",
        "entry_price",
        "entry_reason",
        "exit_date",
        "exit_price",
        "exit_reason",
        "quantity",
        "realized_pnl",
        "days_held",
        "return_frac",
    ])?;
    for t in trades {
        wtr.write_record([
            t.symbol.as_str(),
            &t.entry_date.to_string(),
            &format!("{:.6}", t.entry_price),
            &format!("{:?}", t.entry_reason),
            &t.exit_date.to_string(),
            &format!("{:.6}", t.exit_price),
            &format!("{:?}", t.exit_reason),
            &format!("{:.6}", t.quantity),
            &format!("{:.6}", t.realized_pnl),
            &t.days_held.to_string(),
            &format!("{:.6}", t.return_frac()),
        ])?;
    }
    finish(wtr)
}

// ─── Equity curve ───────────────────────────────────────────────────

pub fn export_equity_csv(curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "equity"])?;
    for p in curve {
        wtr.write_record([p.date.to_string(), format!("{:.6}", p.equity)])?;
    }
    finish(wtr)
}

// ─── Leaderboard ────────────────────────────────────────────────────

/// One row per explored candidate, already in leaderboard order: the
/// space's parameter columns, universe-mean metric columns, score, status.
pub fn export_leaderboard_csv(
    results: &[OptimizationResult],
    space: &ParamSpace,
) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header: Vec<String> = space.keys().map(|k| k.name().to_string()).collect();
    header.extend(
        [
            "mean_total_return",
            "mean_annualized_return",
            "mean_max_drawdown",
            "mean_sharpe",
            "mean_win_rate",
            "total_trades",
            "score",
            "status",
        ]
        .map(String::from),
    );
    wtr.write_record(&header)?;

    for result in results {
        let mut row: Vec<String> = space
            .extract(&result.params)
            .iter()
            .map(|v| format!("{v:.6}"))
            .collect();

        let metrics: Vec<&Metrics> = result.per_symbol.iter().map(|(_, m)| m).collect();
        row.push(fmt_mean(metrics.iter().map(|m| Some(m.total_return))));
        row.push(fmt_mean(metrics.iter().map(|m| m.annualized_return)));
        row.push(fmt_mean(metrics.iter().map(|m| Some(m.max_drawdown))));
        row.push(fmt_mean(metrics.iter().map(|m| m.sharpe)));
        row.push(fmt_mean(metrics.iter().map(|m| m.win_rate)));
        row.push(
            metrics
                .iter()
                .map(|m| m.trade_count)
                .sum::<usize>()
                .to_string(),
        );
        row.push(
            result
                .score
                .map(|s| format!("{s:.6}"))
                .unwrap_or_default(),
        );
        row.push(match result.status {
            EvalStatus::Completed => "COMPLETED".to_string(),
            EvalStatus::Failed { kind } => format!("FAILED_{kind:?}").to_uppercase(),
        });
        wtr.write_record(&row)?;
    }
    finish(wtr)
}

// ─── Report JSON ────────────────────────────────────────────────────

/// Full optimization report, round-trip serializable.
pub fn export_report_json(report: &OptimizationReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize OptimizationReport")
}

pub fn import_report_json(json: &str) -> Result<OptimizationReport> {
    serde_json::from_str(json).context("failed to deserialize OptimizationReport")
}

// ─── File writers ───────────────────────────────────────────────────

pub fn write_trades_csv(path: impl AsRef<Path>, trades: &[TradeRecord]) -> Result<()> {
    write(path, &export_trades_csv(trades)?)
}

pub fn write_equity_csv(path: impl AsRef<Path>, curve: &[EquityPoint]) -> Result<()> {
    write(path, &export_equity_csv(curve)?)
}

pub fn write_leaderboard_csv(
    path: impl AsRef<Path>,
    results: &[OptimizationResult],
    space: &ParamSpace,
) -> Result<()> {
    write(path, &export_leaderboard_csv(results, space)?)
}

pub fn write_report_json(path: impl AsRef<Path>, report: &OptimizationReport) -> Result<()> {
    write(path, &export_report_json(report)?)
}

fn write(path: impl AsRef<Path>, contents: &str) -> Result<()> {
    std::fs::write(path.as_ref(), contents)
        .with_context(|| format!("failed to write {}", path.as_ref().display()))
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not UTF-8")
}

/// Mean over the defined values; empty string when none are defined.
fn fmt_mean(values: impl Iterator<Item = Option<f64>>) -> String {
    let defined: Vec<f64> = values.flatten().collect();
    if defined.is_empty() {
        return String::new();
    }
    let mean = defined.iter().sum::<f64>() / defined.len() as f64;
    format!("{mean:.6}")
}
