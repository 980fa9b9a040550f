//! Grid search — deterministic Cartesian product of all domains.
//!
//! Continuous domains are step-sampled. The product is enumerated in
//! mixed-radix order over the space's key ordering, so repeated runs
//! produce byte-identical candidate sequences. Explosive products are
//! cut down by a seeded subsample (the combination cap).

use rand::rngs::StdRng;
use rand::SeedableRng;

use quantlab_core::params::ParameterSet;

use super::{ScoredCandidate, SearchStrategy};
use crate::space::ParamSpace;

/// Grid search settings.
#[derive(Debug, Clone)]
pub struct GridConfig {
    /// Points per Continuous domain.
    pub continuous_samples: usize,
    /// Cap on total combinations; larger products are subsampled with
    /// `seed`.
    pub max_combinations: usize,
    /// Candidates per proposal batch.
    pub batch_size: usize,
    pub seed: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            continuous_samples: 5,
            max_combinations: 10_000,
            batch_size: 256,
            seed: 42,
        }
    }
}

/// Deterministic, exhaustive (or capped) grid enumeration.
pub struct GridSearch {
    space: ParamSpace,
    base: ParameterSet,
    config: GridConfig,
    /// Per-key value lists, in space order.
    values_per_key: Vec<Vec<f64>>,
    /// Enumeration order: indices into the full product.
    order: Vec<usize>,
    cursor: usize,
}

impl GridSearch {
    pub fn new(space: ParamSpace, base: ParameterSet, config: GridConfig) -> Self {
        let values_per_key: Vec<Vec<f64>> = space
            .entries()
            .iter()
            .map(|(_, d)| d.grid_values(config.continuous_samples))
            .collect();

        let total: usize = values_per_key.iter().map(Vec::len).product();
        let order: Vec<usize> = if total > config.max_combinations {
            // Seeded subsample, kept in ascending index order so the
            // traversal stays deterministic and grid-like.
            let mut rng = StdRng::seed_from_u64(config.seed);
            let mut picked =
                rand::seq::index::sample(&mut rng, total, config.max_combinations).into_vec();
            picked.sort_unstable();
            picked
        } else {
            (0..total).collect()
        };

        Self {
            space,
            base,
            config,
            values_per_key,
            order,
            cursor: 0,
        }
    }

    /// Total combinations this search will propose (after capping, before
    /// invalid-combination filtering).
    pub fn total(&self) -> usize {
        self.order.len()
    }

    /// Decode a product index into one value per key (mixed radix, last
    /// key fastest).
    fn decode(&self, mut index: usize) -> Vec<f64> {
        let mut values = vec![0.0; self.values_per_key.len()];
        for (slot, list) in self.values_per_key.iter().enumerate().rev() {
            let radix = list.len();
            values[slot] = list[index % radix];
            index /= radix;
        }
        values
    }
}

impl SearchStrategy for GridSearch {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn propose(&mut self, _history: &[ScoredCandidate]) -> Vec<ParameterSet> {
        let mut batch = Vec::with_capacity(self.config.batch_size);
        while batch.len() < self.config.batch_size && self.cursor < self.order.len() {
            let values = self.decode(self.order[self.cursor]);
            self.cursor += 1;
            let params = self.space.materialize(&self.base, &values);
            // Skip combinations whose cross-field constraints fail
            // (e.g. max_hold_days drawn below min_hold_days).
            if params.validate().is_ok() {
                batch.push(params);
            }
        }
        batch
    }

    fn exhausted(&self) -> bool {
        self.cursor >= self.order.len()
    }
}
