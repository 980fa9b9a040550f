//! QuantLab Core — backtest engine for daily-bar indicator strategies.
//!
//! This crate owns the deterministic half of the platform:
//! - Domain types: `IndicatorSnapshot`/`IndicatorSeries` (the input
//!   contract), `Position`, `TradeRecord`, `EquityPoint`
//! - `ParameterSet`: the validated strategy configuration value object,
//!   content-addressed via BLAKE3
//! - `PortfolioLedger`: cash + at-most-one open position per symbol
//! - The Flat/Holding backtest state machine (`engine::run_backtest`)
//!
//! Search strategies, metrics, and parallel orchestration live in
//! `quantlab-runner`.

pub mod domain;
pub mod engine;
pub mod ledger;
pub mod params;

pub use domain::{
    equity_values, EntryReason, EquityPoint, ExitReason, IndicatorSeries, IndicatorSnapshot,
    Position, SeriesError, TradeRecord,
};
pub use engine::{
    run_backtest, run_backtest_with_deadline, BacktestOutput, EvalDeadline, SimulationError,
};
pub use ledger::{EntrySize, LedgerError, PortfolioLedger};
pub use params::{ParamError, ParamSetId, ParameterSet, SizeSpec};
