//! The backtest state machine: Flat ⇄ Holding, one symbol per run.
//!
//! Each date is processed atomically: exits are evaluated before entries, so
//! when both fire on the same date the exit wins and the freed capital is
//! not reused until the next eligible date. Fills execute at the evaluation
//! date's close, which keeps the conservation invariant
//! (cash + position value == equity-curve value) exact on every date.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::domain::{EquityPoint, IndicatorSeries, TradeRecord};
use crate::engine::signals::{entry_signal, exit_signal};
use crate::ledger::{EntrySize, LedgerError, PortfolioLedger};
use crate::params::{ParamError, ParameterSet};

/// Cooperative wall-clock budget for one evaluation. Checked between
/// batches of dates; exceeding it aborts the run without corrupting
/// anything outside it.
#[derive(Debug, Clone)]
pub struct EvalDeadline {
    started: Instant,
    budget: Duration,
}

impl EvalDeadline {
    pub fn new(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn exceeded(&self) -> bool {
        self.started.elapsed() >= self.budget
    }
}

/// Errors that abort a single simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A parameter violated its declared domain; rejected before any date
    /// is processed.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ParamError),
    /// Ledger invariant violated — a simulator logic defect, fatal for
    /// this evaluation only.
    #[error("ledger invariant violated: {0}")]
    Invariant(#[from] LedgerError),
    /// The evaluation exceeded its wall-clock budget.
    #[error("evaluation deadline exceeded")]
    DeadlineExceeded,
}

/// Output of one completed simulation run.
#[derive(Debug, Clone)]
pub struct BacktestOutput {
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    /// Dates whose signal evaluation was skipped for missing indicator
    /// fields. Marking still happened on those dates.
    pub skipped_dates: usize,
}

/// Replay `series` under `params`, producing the equity curve and trade
/// ledger.
///
/// An empty series yields an empty curve and zero trades — degenerate but
/// valid. Missing indicator fields skip that date's signal evaluation only.
pub fn run_backtest(
    series: &IndicatorSeries,
    params: &ParameterSet,
) -> Result<BacktestOutput, SimulationError> {
    run_backtest_with_deadline(series, params, None)
}

/// `run_backtest` with an optional cooperative deadline, checked every 256
/// dates.
pub fn run_backtest_with_deadline(
    series: &IndicatorSeries,
    params: &ParameterSet,
    deadline: Option<&EvalDeadline>,
) -> Result<BacktestOutput, SimulationError> {
    params.validate()?;

    let symbol = series.symbol().to_string();
    let mut ledger = PortfolioLedger::new(params.initial_capital);
    let mut equity_curve = Vec::with_capacity(series.len());
    let mut skipped_dates = 0usize;
    // Fallback mark price for dates with an unusable close.
    let mut last_valid_close: Option<f64> = None;

    let entry_size = EntrySize {
        spec: params.sizing,
        lot_size: params.position_size,
        lots: params.positions_per_entry,
    };

    for (i, snap) in series.iter().enumerate() {
        if i % 256 == 0 {
            if let Some(d) = deadline {
                if d.exceeded() {
                    return Err(SimulationError::DeadlineExceeded);
                }
            }
        }

        let close_usable = snap.close > 0.0 && snap.close.is_finite();
        if close_usable {
            last_valid_close = Some(snap.close);
        }

        let signal_ready = snap.has_signal_fields() && close_usable;
        if !signal_ready {
            skipped_dates += 1;
        }

        // ── Holding → Flat ──
        let mut exited_today = false;
        if let Some(position) = ledger.position(&symbol).cloned() {
            let days_held = i - position.entry_index;
            // Horizon and stop checks only need a usable close; the signal
            // exit additionally needs its indicator field, which
            // `exit_signal` handles per rule.
            if close_usable && days_held >= params.min_hold_days as usize {
                if let Some(reason) = exit_signal(snap, &position, days_held, params) {
                    ledger.close(&symbol, snap.date, i, snap.close, reason)?;
                    exited_today = true;
                }
            }
        }

        // ── Flat → Holding ──
        // Exit precedence: capital freed this date is not re-deployed until
        // the next eligible date.
        if !exited_today && ledger.position(&symbol).is_none() && signal_ready {
            if let Some(reason) = entry_signal(snap, params) {
                ledger.open(&symbol, snap.date, i, snap.close, entry_size, reason)?;
            }
        }

        // ── Mark to market ──
        let mark_price = if close_usable {
            snap.close
        } else {
            // No usable close: mark the position (if any) at the last
            // known price, falling back to its entry price.
            last_valid_close.unwrap_or_else(|| {
                ledger
                    .position(&symbol)
                    .map(|p| p.entry_price)
                    .unwrap_or(0.0)
            })
        };
        equity_curve.push(EquityPoint {
            date: snap.date,
            equity: ledger.mark_single(&symbol, mark_price),
        });
    }

    Ok(BacktestOutput {
        equity_curve,
        trades: ledger.into_trades(),
        skipped_dates,
    })
}
