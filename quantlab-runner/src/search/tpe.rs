//! Bayesian search via Tree-structured Parzen Estimators.
//!
//! The surrogate splits the evaluated history into a "good" quantile and
//! the rest, models each side's per-key value distribution with a Gaussian
//! kernel density estimate, and proposes the candidate maximizing the
//! density ratio l(x)/g(x) — the expected-improvement maximizer under the
//! TPE model (Bergstra et al. 2011).
//!
//! Warm start: the first proposal is a batch of `n_startup` random
//! candidates, safe to evaluate in parallel. Every proposal after that is
//! a single candidate, because each depends on the full scored history.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use quantlab_core::params::ParameterSet;

use super::{ScoredCandidate, SearchStrategy};
use crate::space::{ParamDomain, ParamSpace};

/// TPE settings.
#[derive(Debug, Clone)]
pub struct TpeConfig {
    /// Random candidates proposed before the surrogate takes over.
    pub n_startup: usize,
    /// Candidate pool size per suggestion; the best density ratio wins.
    pub n_candidates: usize,
    /// Top quantile of history treated as "good".
    pub gamma: f64,
    /// Proposals without a new best score before the search stops early.
    pub patience: usize,
    /// Kernel bandwidth as a fraction of the domain width.
    pub sigma_frac: f64,
    pub seed: u64,
}

impl Default for TpeConfig {
    fn default() -> Self {
        Self {
            n_startup: 10,
            n_candidates: 24,
            gamma: 0.2,
            patience: 15,
            sigma_frac: 0.1,
            seed: 42,
        }
    }
}

/// TPE search state.
pub struct TpeSearch {
    space: ParamSpace,
    base: ParameterSet,
    config: TpeConfig,
    rng: StdRng,
    started: bool,
    best_seen: Option<f64>,
    proposals_without_improvement: usize,
    stopped: bool,
}

impl TpeSearch {
    pub fn new(space: ParamSpace, base: ParameterSet, config: TpeConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            space,
            base,
            config,
            rng,
            started: false,
            best_seen: None,
            proposals_without_improvement: 0,
            stopped: false,
        }
    }

    /// Plateau detection over the incoming history: a new overall best
    /// resets the patience counter.
    fn update_plateau(&mut self, history: &[ScoredCandidate]) {
        let current_best = history
            .iter()
            .filter_map(|c| c.score)
            .fold(None::<f64>, |acc, s| match acc {
                Some(b) if b >= s => Some(b),
                _ => Some(s),
            });
        match (self.best_seen, current_best) {
            (None, Some(b)) => {
                self.best_seen = Some(b);
                self.proposals_without_improvement = 0;
            }
            (Some(prev), Some(b)) if b > prev => {
                self.best_seen = Some(b);
                self.proposals_without_improvement = 0;
            }
            _ => {
                self.proposals_without_improvement += 1;
            }
        }
    }

    /// One surrogate-guided candidate.
    fn suggest(&mut self, history: &[ScoredCandidate]) -> Vec<f64> {
        // Sort by score descending; undefined scores sink to the bottom.
        let mut sorted: Vec<&ScoredCandidate> = history.iter().collect();
        sorted.sort_by(|a, b| {
            b.score_or_worst()
                .partial_cmp(&a.score_or_worst())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let n_good = ((sorted.len() as f64 * self.config.gamma).ceil() as usize)
            .clamp(1, sorted.len());
        let (good, bad) = sorted.split_at(n_good);

        let entries = self.space.entries().to_vec();
        let mut values = Vec::with_capacity(entries.len());
        for (slot, (_, domain)) in entries.iter().enumerate() {
            let good_vals: Vec<f64> = good.iter().map(|c| c.values[slot]).collect();
            let bad_vals: Vec<f64> = bad.iter().map(|c| c.values[slot]).collect();
            values.push(self.suggest_key(domain, &good_vals, &bad_vals));
        }
        values
    }

    /// Sample candidates from the good-side KDE, keep the best l(x)/g(x).
    fn suggest_key(&mut self, domain: &ParamDomain, good: &[f64], bad: &[f64]) -> f64 {
        if good.is_empty() {
            return domain.sample(&mut self.rng);
        }
        let sigma = (self.config.sigma_frac * domain.width()).max(1e-9);

        let mut best_value = good[0];
        let mut best_ratio = f64::NEG_INFINITY;
        for _ in 0..self.config.n_candidates {
            let center = good[self.rng.gen_range(0..good.len())];
            let normal = Normal::new(center, sigma).expect("sigma is positive");
            let candidate = domain.clamp(normal.sample(&mut self.rng));

            let l: f64 =
                good.iter().map(|&v| gaussian_pdf(candidate, v, sigma)).sum::<f64>()
                    / good.len() as f64;
            let g: f64 = if bad.is_empty() {
                0.0
            } else {
                bad.iter().map(|&v| gaussian_pdf(candidate, v, sigma)).sum::<f64>()
                    / bad.len() as f64
            };
            let ratio = l / (g + 1e-12);
            if ratio > best_ratio {
                best_ratio = ratio;
                best_value = candidate;
            }
        }
        best_value
    }
}

fn gaussian_pdf(x: f64, mean: f64, sigma: f64) -> f64 {
    let z = (x - mean) / sigma;
    (-0.5 * z * z).exp() / (sigma * (2.0 * std::f64::consts::PI).sqrt())
}

impl SearchStrategy for TpeSearch {
    fn name(&self) -> &'static str {
        "bayesian"
    }

    fn propose(&mut self, history: &[ScoredCandidate]) -> Vec<ParameterSet> {
        if self.stopped {
            return Vec::new();
        }

        // Warm start: one parallel batch of random candidates.
        if !self.started {
            self.started = true;
            let mut batch = Vec::with_capacity(self.config.n_startup);
            for _ in 0..self.config.n_startup {
                let values = self.space.sample(&mut self.rng);
                let params = self.space.materialize(&self.base, &values);
                if params.validate().is_ok() {
                    batch.push(params);
                }
            }
            return batch;
        }

        self.update_plateau(history);
        if self.proposals_without_improvement >= self.config.patience {
            self.stopped = true;
            return Vec::new();
        }

        // Serial from here: each candidate needs the full history.
        if history.len() < self.config.n_startup.max(2) {
            // Not enough observations for a surrogate yet; stay random.
            let values = self.space.sample(&mut self.rng);
            return vec![self.space.materialize(&self.base, &values)];
        }

        // Retry invalid cross-field combinations a few times; fall back to
        // a random draw rather than stalling.
        for _ in 0..8 {
            let values = self.suggest(history);
            let params = self.space.materialize(&self.base, &values);
            if params.validate().is_ok() {
                return vec![params];
            }
        }
        let values = self.space.sample(&mut self.rng);
        vec![self.space.materialize(&self.base, &values)]
    }

    fn exhausted(&self) -> bool {
        self.stopped
    }
}
