//! ResultStore — concurrent, deduplicated accumulation of evaluations.
//!
//! The only synchronization point of an optimization run. Keyed by
//! `ParamSetId` with first-wins semantics: inserting an id that is already
//! present is a no-op, so re-evaluating a duplicate candidate can never
//! overwrite the first-computed score. Results are inserted whole; an
//! aborted worker leaves no partial state behind.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use quantlab_core::params::{ParamSetId, ParameterSet};

use crate::metrics::Metrics;
use crate::score::WORST_SCORE;
use crate::search::ScoredCandidate;
use crate::space::ParamSpace;

/// Why an evaluation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Ledger invariant violated during simulation.
    Invariant,
    /// The evaluation exceeded its wall-clock budget.
    Timeout,
    /// The parameter set failed domain validation.
    InvalidParams,
}

/// Evaluation status of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvalStatus {
    Completed,
    Failed { kind: FailureKind },
}

/// One candidate's full evaluation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub params: ParameterSet,
    /// Per-symbol metrics, in universe order. Empty for failed candidates.
    pub per_symbol: Vec<(String, Metrics)>,
    /// Aggregated score. None for failed candidates and for completed
    /// candidates whose score is undefined (no signal anywhere).
    pub score: Option<f64>,
    pub status: EvalStatus,
}

impl OptimizationResult {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, EvalStatus::Failed { .. })
    }

    /// Numeric score for ordering; undefined and failed rank worst.
    pub fn score_or_worst(&self) -> f64 {
        self.score.unwrap_or(WORST_SCORE)
    }
}

/// Outcome of a store insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The id was already present; the existing entry was kept.
    AlreadyPresent,
}

#[derive(Default)]
struct StoreInner {
    results: HashMap<ParamSetId, OptimizationResult>,
    /// Insertion order, for deterministic history and ranking tie-breaks.
    order: Vec<ParamSetId>,
}

/// Mutex-guarded map from parameter-set identity to its evaluation.
#[derive(Default)]
pub struct ResultStore {
    inner: Mutex<StoreInner>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic check-then-insert. First writer wins.
    pub fn insert(&self, result: OptimizationResult) -> InsertOutcome {
        let id = result.params.id();
        let mut inner = self.inner.lock().expect("store lock");
        if inner.results.contains_key(&id) {
            return InsertOutcome::AlreadyPresent;
        }
        inner.order.push(id.clone());
        inner.results.insert(id, result);
        InsertOutcome::Inserted
    }

    pub fn contains(&self, id: &ParamSetId) -> bool {
        self.inner.lock().expect("store lock").results.contains_key(id)
    }

    pub fn get(&self, id: &ParamSetId) -> Option<OptimizationResult> {
        self.inner.lock().expect("store lock").results.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("store lock").order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Best-so-far: highest defined score among completed candidates.
    pub fn best(&self) -> Option<OptimizationResult> {
        let inner = self.inner.lock().expect("store lock");
        inner
            .order
            .iter()
            .filter_map(|id| inner.results.get(id))
            .filter(|r| !r.is_failed() && r.score.is_some())
            .max_by(|a, b| {
                a.score_or_worst()
                    .partial_cmp(&b.score_or_worst())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
    }

    /// Leaderboard order: defined scores descending, then undefined
    /// completed, then failures; insertion order breaks ties.
    pub fn ranked(&self) -> Vec<OptimizationResult> {
        let inner = self.inner.lock().expect("store lock");
        let mut results: Vec<OptimizationResult> = inner
            .order
            .iter()
            .filter_map(|id| inner.results.get(id))
            .cloned()
            .collect();
        results.sort_by(|a, b| {
            let rank = |r: &OptimizationResult| if r.is_failed() { 1 } else { 0 };
            rank(a).cmp(&rank(b)).then(
                b.score_or_worst()
                    .partial_cmp(&a.score_or_worst())
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });
        results
    }

    /// History in insertion order, shaped for the search strategies.
    pub fn history(&self, space: &ParamSpace) -> Vec<ScoredCandidate> {
        let inner = self.inner.lock().expect("store lock");
        inner
            .order
            .iter()
            .filter_map(|id| inner.results.get(id))
            .map(|r| ScoredCandidate {
                params: r.params.clone(),
                values: space.extract(&r.params),
                score: if r.is_failed() { None } else { r.score },
            })
            .collect()
    }
}
