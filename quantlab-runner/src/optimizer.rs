//! Optimizer — propose → dedup → evaluate in parallel → record, repeat.
//!
//! Candidate evaluations are embarrassingly parallel: each one reads the
//! shared immutable `MarketData` and its own `ParameterSet`, and produces
//! an independent result. Rayon provides the bounded worker pool; the
//! `ResultStore` is the only synchronization point. One failed or timed-out
//! candidate is recorded and skipped over — an optimization run never fails
//! wholesale because of a single bad candidate.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use quantlab_core::engine::EvalDeadline;
use quantlab_core::params::ParameterSet;

use crate::evaluate::{evaluate_candidate, MarketData};
use crate::metrics::MetricsConfig;
use crate::score::Aggregation;
use crate::search::SearchStrategy;
use crate::space::ParamSpace;
use crate::split::split_by_fraction;
use crate::store::{OptimizationResult, ResultStore};

/// Optimization-run settings.
#[derive(Debug, Clone)]
pub struct OptimizeConfig {
    /// Maximum candidate proposals processed (cache hits included).
    pub budget: usize,
    /// Worker pool width; None uses the global rayon pool.
    pub parallelism: Option<usize>,
    /// Per-candidate wall-clock budget.
    pub eval_timeout: Option<Duration>,
    pub aggregation: Aggregation,
    pub metrics: MetricsConfig,
    /// When set, candidates score on the training window and the final
    /// best is re-scored on the held-out validation window.
    pub validation_fraction: Option<f64>,
    /// Train-minus-validation score gap above which the report raises the
    /// overfit warning.
    pub overfit_gap_threshold: f64,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            budget: 200,
            parallelism: None,
            eval_timeout: None,
            aggregation: Aggregation::default(),
            metrics: MetricsConfig::default(),
            validation_fraction: None,
            overfit_gap_threshold: 1.0,
        }
    }
}

/// Final report of an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// Best valid candidate found; None when nothing scored.
    pub best: Option<OptimizationResult>,
    /// The best candidate's score on the validation window, when a split
    /// was configured.
    pub validation_score: Option<f64>,
    /// True when the train/validation gap exceeds the configured
    /// threshold — a warning, never a failure.
    pub overfit_warning: bool,
    /// Candidate proposals processed (cache hits included).
    pub evaluations: usize,
    /// Every explored candidate, leaderboard-ordered.
    pub leaderboard: Vec<OptimizationResult>,
}

/// Orchestrates search strategies over a fixed universe.
pub struct Optimizer {
    data: MarketData,
    config: OptimizeConfig,
    store: ResultStore,
    pool: Option<rayon::ThreadPool>,
}

impl Optimizer {
    pub fn new(data: MarketData, config: OptimizeConfig) -> Result<Self> {
        let pool = match config.parallelism {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n.max(1))
                    .build()
                    .context("failed to build evaluation worker pool")?,
            ),
            None => None,
        };
        Ok(Self {
            data,
            config,
            store: ResultStore::new(),
            pool,
        })
    }

    /// The full explored set.
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Run `strategy` to exhaustion or budget. See
    /// `optimize_with_progress` for the callback variant.
    pub fn optimize(
        &self,
        strategy: &mut dyn SearchStrategy,
        space: &ParamSpace,
    ) -> Result<OptimizationReport> {
        self.optimize_with_progress(strategy, space, |_, _| {})
    }

    /// Run with a progress callback invoked after each batch with
    /// (evaluations so far, best score so far).
    pub fn optimize_with_progress<F>(
        &self,
        strategy: &mut dyn SearchStrategy,
        space: &ParamSpace,
        progress: F,
    ) -> Result<OptimizationReport>
    where
        F: Fn(usize, Option<f64>) + Send + Sync,
    {
        let split = self
            .config
            .validation_fraction
            .map(|f| split_by_fraction(&self.data, f));
        let train: &MarketData = split.as_ref().map(|s| &s.train).unwrap_or(&self.data);

        let mut evaluations = 0usize;
        while evaluations < self.config.budget && !strategy.exhausted() {
            let history = self.store.history(space);
            let mut batch = strategy.propose(&history);
            if batch.is_empty() {
                break;
            }
            batch.truncate(self.config.budget - evaluations);
            evaluations += batch.len();

            // Dedup within the batch and against the store: already-known
            // ids reuse their first-computed result untouched.
            let mut seen = HashSet::new();
            let fresh: Vec<ParameterSet> = batch
                .into_iter()
                .filter(|p| seen.insert(p.id()) && !self.store.contains(&p.id()))
                .collect();

            let results = self.evaluate_batch(train, &fresh);
            for result in results {
                self.store.insert(result);
            }

            progress(evaluations, self.store.best().and_then(|b| b.score));
        }

        let best = self.store.best();
        let (validation_score, overfit_warning) = match (&best, &split) {
            (Some(best), Some(split)) if !split.validation.is_empty() => {
                let result = evaluate_candidate(
                    &split.validation,
                    &best.params,
                    self.config.aggregation,
                    self.config.metrics,
                    None,
                );
                let validation_score = result.score;
                let warning = match (best.score, validation_score) {
                    (Some(train_score), Some(v)) => {
                        train_score - v > self.config.overfit_gap_threshold
                    }
                    // Scored in training, silent in validation: the
                    // strongest overfit smell there is.
                    (Some(_), None) => true,
                    _ => false,
                };
                (validation_score, warning)
            }
            _ => (None, false),
        };

        Ok(OptimizationReport {
            best,
            validation_score,
            overfit_warning,
            evaluations,
            leaderboard: self.store.ranked(),
        })
    }

    fn evaluate_batch(
        &self,
        data: &MarketData,
        batch: &[ParameterSet],
    ) -> Vec<OptimizationResult> {
        let eval = |params: &ParameterSet| {
            let deadline = self.config.eval_timeout.map(EvalDeadline::new);
            evaluate_candidate(
                data,
                params,
                self.config.aggregation,
                self.config.metrics,
                deadline.as_ref(),
            )
        };
        match &self.pool {
            Some(pool) => pool.install(|| batch.par_iter().map(eval).collect()),
            None => batch.par_iter().map(eval).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{GridConfig, GridSearch};
    use crate::space::{ParamDomain, ParamKey};
    use chrono::NaiveDate;
    use quantlab_core::domain::{IndicatorSeries, IndicatorSnapshot};

    fn wave_series(symbol: &str, n: usize) -> IndicatorSeries {
        let base = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let snaps = (0..n)
            .map(|i| {
                let wave = (i as f64 * 0.18).sin();
                let close = 100.0 + wave * 20.0;
                let pos = (wave + 1.0) / 2.0;
                let prev_wave = ((i as f64 - 1.0) * 0.18).sin();
                let prev_pos = (prev_wave + 1.0) / 2.0;
                let mut s =
                    IndicatorSnapshot::bare(base + chrono::Duration::days(i as i64), close);
                s.price_position = Some(pos);
                s.prev_price_position = Some(prev_pos);
                s.pct_chg = Some((wave - prev_wave) * 20.0);
                s.main_net_rate = Some(0.0);
                s.reversal_cross = Some(if prev_pos < 0.15 && pos > prev_pos { 1 } else { 0 });
                s
            })
            .collect();
        IndicatorSeries::new(symbol, snaps).unwrap()
    }

    fn base_params() -> ParameterSet {
        ParameterSet {
            min_hold_days: 1,
            entry_position_max: 0.3,
            entry_net_rate_min: 100.0,
            exit_position_min: 0.8,
            ..Default::default()
        }
    }

    fn small_space() -> ParamSpace {
        ParamSpace::new()
            .add(
                ParamKey::EntryPositionMax,
                ParamDomain::Discrete(vec![0.1, 0.2, 0.3]),
            )
            .add(
                ParamKey::ExitPositionMin,
                ParamDomain::Discrete(vec![0.7, 0.8, 0.9]),
            )
    }

    fn optimizer(budget: usize) -> Optimizer {
        let data = MarketData::from_series([wave_series("AAA", 300)]);
        Optimizer::new(
            data,
            OptimizeConfig {
                budget,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn grid_explores_the_full_product() {
        let opt = optimizer(100);
        let space = small_space();
        let mut grid = GridSearch::new(space.clone(), base_params(), GridConfig::default());
        let report = opt.optimize(&mut grid, &space).unwrap();
        assert_eq!(report.evaluations, 9);
        assert_eq!(report.leaderboard.len(), 9);
        assert!(report.best.is_some());
    }

    #[test]
    fn budget_caps_the_run() {
        let opt = optimizer(4);
        let space = small_space();
        let mut grid = GridSearch::new(space.clone(), base_params(), GridConfig::default());
        let report = opt.optimize(&mut grid, &space).unwrap();
        assert_eq!(report.evaluations, 4);
        assert!(report.leaderboard.len() <= 4);
    }

    #[test]
    fn duplicate_candidates_reuse_first_result() {
        let opt = optimizer(100);
        let space = small_space();
        // Run the same grid twice through the same optimizer: the second
        // pass must add nothing to the store.
        let mut grid1 = GridSearch::new(space.clone(), base_params(), GridConfig::default());
        opt.optimize(&mut grid1, &space).unwrap();
        let len_after_first = opt.store().len();
        let mut grid2 = GridSearch::new(space.clone(), base_params(), GridConfig::default());
        opt.optimize(&mut grid2, &space).unwrap();
        assert_eq!(opt.store().len(), len_after_first);
    }

    #[test]
    fn progress_callback_sees_monotonic_counts() {
        use std::sync::Mutex;
        let opt = optimizer(100);
        let space = small_space();
        let counts = Mutex::new(Vec::new());
        let mut grid = GridSearch::new(
            space.clone(),
            base_params(),
            GridConfig {
                batch_size: 2,
                ..Default::default()
            },
        );
        opt.optimize_with_progress(&mut grid, &space, |done, _| {
            counts.lock().unwrap().push(done);
        })
        .unwrap();
        let counts = counts.into_inner().unwrap();
        assert!(!counts.is_empty());
        assert!(counts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn validation_split_reports_a_holdout_score() {
        let data = MarketData::from_series([wave_series("AAA", 400)]);
        let opt = Optimizer::new(
            data,
            OptimizeConfig {
                budget: 20,
                validation_fraction: Some(0.7),
                overfit_gap_threshold: 1_000.0, // never warn in this test
                ..Default::default()
            },
        )
        .unwrap();
        let space = small_space();
        let mut grid = GridSearch::new(space.clone(), base_params(), GridConfig::default());
        let report = opt.optimize(&mut grid, &space).unwrap();
        assert!(report.best.is_some());
        // The wave pattern trades in both windows, so the holdout score is
        // defined and the huge threshold keeps the warning off.
        assert!(report.validation_score.is_some());
        assert!(!report.overfit_warning);
    }

    #[test]
    fn bounded_pool_matches_global_pool_results() {
        let data = MarketData::from_series([wave_series("AAA", 300)]);
        let space = small_space();
        let run = |parallelism: Option<usize>| {
            let opt = Optimizer::new(
                data.clone(),
                OptimizeConfig {
                    budget: 100,
                    parallelism,
                    ..Default::default()
                },
            )
            .unwrap();
            let mut grid = GridSearch::new(space.clone(), base_params(), GridConfig::default());
            let report = opt.optimize(&mut grid, &space).unwrap();
            report.best.unwrap().params.id()
        };
        assert_eq!(run(Some(2)), run(None));
    }
}
