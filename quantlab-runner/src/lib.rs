//! QuantLab Runner — parameter optimization over the core engine.
//!
//! This crate builds on `quantlab-core` to provide:
//! - Performance metrics with explicit "undefined" semantics
//! - Parameter-space definition (discrete, continuous, stepped-integer)
//! - Three interchangeable search strategies: grid, Bayesian (TPE), genetic
//! - Parallel candidate evaluation with per-candidate deadlines
//! - A deduplicating result store and leaderboard
//! - Train/validation overfitting guard
//! - CSV/JSON artifact export

pub mod config;
pub mod evaluate;
pub mod export;
pub mod metrics;
pub mod optimizer;
pub mod score;
pub mod search;
pub mod space;
pub mod split;
pub mod store;

pub use config::{ConfigError, RunMode, RunSettings, SearchMethod};
pub use evaluate::{evaluate_candidate, run_portfolio_backtest, MarketData, SymbolRun};
pub use export::{
    export_equity_csv, export_leaderboard_csv, export_report_json, export_trades_csv,
    import_report_json, write_equity_csv, write_leaderboard_csv, write_report_json,
    write_trades_csv,
};
pub use metrics::{Metrics, MetricsConfig};
pub use optimizer::{OptimizationReport, OptimizeConfig, Optimizer};
pub use score::{Aggregation, WORST_SCORE};
pub use search::{
    GeneticConfig, GeneticSearch, GridConfig, GridSearch, ScoredCandidate, SearchStrategy,
    TpeConfig, TpeSearch,
};
pub use space::{ParamDomain, ParamKey, ParamSpace};
pub use split::{split_by_fraction, DateSplit};
pub use store::{EvalStatus, FailureKind, InsertOutcome, OptimizationResult, ResultStore};
