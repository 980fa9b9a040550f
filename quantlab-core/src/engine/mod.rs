//! Backtest engine: signal predicates and the date-loop state machine.

pub mod signals;
pub mod simulator;

pub use signals::{entry_signal, exit_signal};
pub use simulator::{
    run_backtest, run_backtest_with_deadline, BacktestOutput, EvalDeadline, SimulationError,
};
