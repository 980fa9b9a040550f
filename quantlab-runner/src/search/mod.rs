//! Search strategies — one capability, three implementations.
//!
//! A strategy's whole job is: given the history of evaluated candidates and
//! their scores, propose the next batch. The optimizer owns evaluation,
//! deduplication, and the store; strategies own only the exploration
//! policy. Selection happens at construction time, not by runtime type
//! inspection.

pub mod genetic;
pub mod grid;
pub mod tpe;

pub use genetic::{GeneticConfig, GeneticSearch};
pub use grid::{GridConfig, GridSearch};
pub use tpe::{TpeConfig, TpeSearch};

use quantlab_core::params::ParameterSet;

/// One evaluated candidate in the history fed back to strategies.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub params: ParameterSet,
    /// The candidate's assignment of the space's keys, in space order.
    pub values: Vec<f64>,
    /// None for failed or signal-free evaluations; strategies treat it as
    /// worst-possible.
    pub score: Option<f64>,
}

impl ScoredCandidate {
    /// Numeric score for ordering; undefined scores rank worst.
    pub fn score_or_worst(&self) -> f64 {
        self.score.unwrap_or(crate::score::WORST_SCORE)
    }
}

/// "Propose next candidates given history" — the single seam between the
/// optimizer and the three search algorithms.
pub trait SearchStrategy {
    fn name(&self) -> &'static str;

    /// Next batch of candidates. An empty batch means the strategy is
    /// done (space exhausted, budget-independent convergence, plateau).
    ///
    /// `history` contains every candidate evaluated so far, in evaluation
    /// order. Batches may be evaluated in parallel; strategies that need
    /// serial feedback (TPE after warm-up) return single-element batches.
    fn propose(&mut self, history: &[ScoredCandidate]) -> Vec<ParameterSet>;

    /// True once the strategy will never propose again.
    fn exhausted(&self) -> bool;
}
