//! Performance metrics — pure functions over equity curve and trade list.
//!
//! Mathematically undefined values stay `None` instead of collapsing to
//! 0.0: a zero-trade run has an *undefined* win rate, not a 0% one, and a
//! zero-variance curve has an undefined Sharpe, not an infinite or zero
//! one. Ranking code downstream can then distinguish "bad" from "no
//! signal".

use serde::{Deserialize, Serialize};

use quantlab_core::domain::{equity_values, EquityPoint, TradeRecord};

/// Trading days per year, the annualization base for returns and Sharpe.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Configuration for metric computation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Annual risk-free rate used by the Sharpe ratio.
    pub risk_free_rate: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
        }
    }
}

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    /// Total return as a fraction: final / initial − 1. Zero for empty or
    /// single-point curves.
    pub total_return: f64,
    /// Compounded to a 252-day year; None when the curve has fewer than
    /// two points.
    pub annualized_return: Option<f64>,
    /// Largest peak-to-trough decline, as a positive fraction.
    pub max_drawdown: f64,
    /// Annualized Sharpe; None on zero variance or fewer than two periods.
    pub sharpe: Option<f64>,
    /// Fraction of trades with positive realized P&L; None on zero trades.
    pub win_rate: Option<f64>,
    pub trade_count: usize,
}

impl Metrics {
    /// Compute all metrics from an equity curve and trade list.
    pub fn summarize(curve: &[EquityPoint], trades: &[TradeRecord], config: MetricsConfig) -> Self {
        let values = equity_values(curve);
        Self {
            total_return: total_return(&values),
            annualized_return: annualized_return(&values),
            max_drawdown: max_drawdown(&values),
            sharpe: sharpe_ratio(&values, config.risk_free_rate),
            win_rate: win_rate(trades),
            trade_count: trades.len(),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final − initial) / initial.
pub fn total_return(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let initial = values[0];
    let last = *values.last().unwrap();
    if initial <= 0.0 {
        return 0.0;
    }
    (last - initial) / initial
}

/// Annualized return: (1 + total)^(252 / n_days) − 1 over `len − 1`
/// elapsed periods. None when fewer than two points.
pub fn annualized_return(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n_days = (values.len() - 1) as f64;
    let total = total_return(values);
    if total <= -1.0 {
        // Total wipeout: the compounding power is undefined below -100%.
        return Some(-1.0);
    }
    Some((1.0 + total).powf(TRADING_DAYS_PER_YEAR / n_days) - 1.0)
}

/// Maximum drawdown as a positive fraction (0.15 = 15% decline).
pub fn max_drawdown(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mut peak = values[0];
    let mut max_dd = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            let dd = (peak - v) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Annualized Sharpe ratio from per-period returns.
///
/// Sharpe = mean(excess) / std(excess) · √252. None when there are fewer
/// than two periods or the return variance is (numerically) zero.
pub fn sharpe_ratio(values: &[f64], risk_free_rate: f64) -> Option<f64> {
    let returns = period_returns(values);
    if returns.len() < 2 {
        return None;
    }
    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
    let mean = mean_f64(&excess);
    let std = std_dev(&excess);
    if std < 1e-15 {
        return None;
    }
    Some((mean / std) * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Win rate: fraction of winning trades. None when there are no trades.
pub fn win_rate(trades: &[TradeRecord]) -> Option<f64> {
    if trades.is_empty() {
        return None;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    Some(winners as f64 / trades.len() as f64)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Per-period returns from consecutive curve values.
pub fn period_returns(values: &[f64]) -> Vec<f64> {
    if values.len() < 2 {
        return Vec::new();
    }
    values
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
