//! Candidate evaluation — one ParameterSet across the whole universe.
//!
//! Data is loaded once, up front, and held read-only; nothing in the hot
//! path touches I/O. A failed symbol fails the whole candidate (recorded,
//! not propagated), and a deadline is threaded through so a runaway
//! candidate aborts without touching any other evaluation.

use std::collections::BTreeMap;

use quantlab_core::domain::IndicatorSeries;
use quantlab_core::engine::{
    run_backtest, run_backtest_with_deadline, BacktestOutput, EvalDeadline, SimulationError,
};
use quantlab_core::params::ParameterSet;

use crate::metrics::{Metrics, MetricsConfig};
use crate::score::Aggregation;
use crate::store::{EvalStatus, FailureKind, OptimizationResult};

/// The read-only universe: symbol → indicator series, iterated in symbol
/// order for determinism.
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    series: BTreeMap<String, IndicatorSeries>,
}

impl MarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_series(all: impl IntoIterator<Item = IndicatorSeries>) -> Self {
        let series = all
            .into_iter()
            .map(|s| (s.symbol().to_string(), s))
            .collect();
        Self { series }
    }

    pub fn insert(&mut self, series: IndicatorSeries) {
        self.series.insert(series.symbol().to_string(), series);
    }

    pub fn get(&self, symbol: &str) -> Option<&IndicatorSeries> {
        self.series.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndicatorSeries)> {
        self.series.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Evaluate one candidate over every symbol. Never panics, never
/// propagates: failures come back as a Failed `OptimizationResult`.
pub fn evaluate_candidate(
    data: &MarketData,
    params: &ParameterSet,
    aggregation: Aggregation,
    metrics_config: MetricsConfig,
    deadline: Option<&EvalDeadline>,
) -> OptimizationResult {
    if let Err(_e) = params.validate() {
        return failed(params, FailureKind::InvalidParams);
    }

    let mut per_symbol = Vec::with_capacity(data.len());
    for (symbol, series) in data.iter() {
        match run_backtest_with_deadline(series, params, deadline) {
            Ok(output) => {
                let metrics =
                    Metrics::summarize(&output.equity_curve, &output.trades, metrics_config);
                per_symbol.push((symbol.to_string(), metrics));
            }
            Err(SimulationError::DeadlineExceeded) => {
                return failed(params, FailureKind::Timeout);
            }
            Err(SimulationError::Invariant(_)) => {
                return failed(params, FailureKind::Invariant);
            }
            Err(SimulationError::InvalidConfiguration(_)) => {
                return failed(params, FailureKind::InvalidParams);
            }
        }
    }

    let metrics_only: Vec<Metrics> = per_symbol.iter().map(|(_, m)| m.clone()).collect();
    let score = aggregation.score(&metrics_only);
    OptimizationResult {
        params: params.clone(),
        per_symbol,
        score,
        status: EvalStatus::Completed,
    }
}

fn failed(params: &ParameterSet, kind: FailureKind) -> OptimizationResult {
    OptimizationResult {
        params: params.clone(),
        per_symbol: Vec::new(),
        score: None,
        status: EvalStatus::Failed { kind },
    }
}

/// One symbol's full single-run artifacts.
#[derive(Debug, Clone)]
pub struct SymbolRun {
    pub symbol: String,
    pub output: BacktestOutput,
    pub metrics: Metrics,
}

/// A direct backtest across the universe, surfacing errors as hard
/// failures (no partial result) — the single-run mode contract.
pub fn run_portfolio_backtest(
    data: &MarketData,
    params: &ParameterSet,
    metrics_config: MetricsConfig,
) -> Result<Vec<SymbolRun>, SimulationError> {
    params.validate()?;
    let mut runs = Vec::with_capacity(data.len());
    for (symbol, series) in data.iter() {
        let output = run_backtest(series, params)?;
        let metrics = Metrics::summarize(&output.equity_curve, &output.trades, metrics_config);
        runs.push(SymbolRun {
            symbol: symbol.to_string(),
            output,
            metrics,
        });
    }
    Ok(runs)
}
