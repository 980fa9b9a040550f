//! Scoring — collapse per-symbol metrics into one scalar for ranking.
//!
//! A score of `None` means the candidate produced no defined signal at all
//! (every symbol's Sharpe undefined, or too few trades for the composite).
//! None ranks below every defined score but stays distinguishable from a
//! legitimately terrible number.

use serde::{Deserialize, Serialize};

use crate::metrics::Metrics;

/// Worst-possible sentinel for contexts that need a numeric value for an
/// undefined or failed score.
pub const WORST_SCORE: f64 = f64::NEG_INFINITY;

/// How per-symbol metrics aggregate into a candidate score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregation {
    /// Mean of the defined per-symbol Sharpe ratios, minus
    /// `drawdown_penalty × mean max-drawdown`. The default.
    MeanSharpe { drawdown_penalty: f64 },
    /// Mean per-symbol total return, drawdown-penalized the same way.
    MeanReturn { drawdown_penalty: f64 },
    /// Composite of mean return and mean win rate with a minimum total
    /// trade-count gate (candidates below the gate score None).
    ReturnWinRate {
        return_weight: f64,
        win_rate_weight: f64,
        min_trades: usize,
    },
}

impl Default for Aggregation {
    fn default() -> Self {
        Self::MeanSharpe {
            drawdown_penalty: 1.0,
        }
    }
}

impl Aggregation {
    /// Aggregate per-symbol metrics to a scalar. None when the score is
    /// undefined under this aggregation.
    pub fn score(&self, per_symbol: &[Metrics]) -> Option<f64> {
        if per_symbol.is_empty() {
            return None;
        }
        match *self {
            Aggregation::MeanSharpe { drawdown_penalty } => {
                let sharpes: Vec<f64> = per_symbol.iter().filter_map(|m| m.sharpe).collect();
                if sharpes.is_empty() {
                    return None;
                }
                let mean_sharpe = mean(&sharpes);
                Some(mean_sharpe - drawdown_penalty * mean_drawdown(per_symbol))
            }
            Aggregation::MeanReturn { drawdown_penalty } => {
                let returns: Vec<f64> = per_symbol.iter().map(|m| m.total_return).collect();
                Some(mean(&returns) - drawdown_penalty * mean_drawdown(per_symbol))
            }
            Aggregation::ReturnWinRate {
                return_weight,
                win_rate_weight,
                min_trades,
            } => {
                let total_trades: usize = per_symbol.iter().map(|m| m.trade_count).sum();
                if total_trades < min_trades {
                    return None;
                }
                let returns: Vec<f64> = per_symbol.iter().map(|m| m.total_return).collect();
                let win_rates: Vec<f64> = per_symbol.iter().filter_map(|m| m.win_rate).collect();
                if win_rates.is_empty() {
                    return None;
                }
                Some(
                    mean(&returns) * 100.0 * return_weight
                        + mean(&win_rates) * 100.0 * win_rate_weight,
                )
            }
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn mean_drawdown(per_symbol: &[Metrics]) -> f64 {
    let dds: Vec<f64> = per_symbol.iter().map(|m| m.max_drawdown).collect();
    mean(&dds)
}
