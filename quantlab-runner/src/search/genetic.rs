//! Genetic search — tournament selection, uniform crossover, bounded
//! Gaussian mutation.
//!
//! Each generation is proposed as one parallel batch. Scores come back
//! through the shared history; the next generation keeps the elite, then
//! fills up with children of tournament winners. The search stops after a
//! fixed number of generations or once the best score plateaus for the
//! configured patience.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;

use quantlab_core::params::{ParamSetId, ParameterSet};

use super::{ScoredCandidate, SearchStrategy};
use crate::score::WORST_SCORE;
use crate::space::ParamSpace;

/// Genetic-algorithm settings.
#[derive(Debug, Clone)]
pub struct GeneticConfig {
    pub population_size: usize,
    pub n_generations: usize,
    pub tournament_size: usize,
    /// Probability that a child is produced by crossover (otherwise it
    /// clones the first parent).
    pub crossover_prob: f64,
    /// Per-key mutation probability.
    pub mutation_prob: f64,
    /// Mutation σ as a fraction of the key's domain width.
    pub sigma_frac: f64,
    /// Top genomes carried into the next generation unchanged.
    pub elitism: usize,
    /// Generations without a new best before stopping early.
    pub patience: usize,
    pub seed: u64,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            n_generations: 20,
            tournament_size: 3,
            crossover_prob: 0.7,
            mutation_prob: 0.2,
            sigma_frac: 0.1,
            elitism: 5,
            patience: 5,
            seed: 42,
        }
    }
}

/// Genetic search state. A genome is one value per space key.
pub struct GeneticSearch {
    space: ParamSpace,
    base: ParameterSet,
    config: GeneticConfig,
    rng: StdRng,
    population: Vec<Vec<f64>>,
    generation: usize,
    best_seen: Option<f64>,
    generations_without_improvement: usize,
    stopped: bool,
}

impl GeneticSearch {
    pub fn new(space: ParamSpace, base: ParameterSet, config: GeneticConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            space,
            base,
            config,
            rng,
            population: Vec::new(),
            generation: 0,
            best_seen: None,
            generations_without_improvement: 0,
            stopped: false,
        }
    }

    /// Random genome whose materialized set passes validation.
    fn random_genome(&mut self) -> Vec<f64> {
        for _ in 0..32 {
            let values = self.space.sample(&mut self.rng);
            if self.space.materialize(&self.base, &values).validate().is_ok() {
                return values;
            }
        }
        // Give up on cross-field repair by sampling; the base assignment
        // is always valid.
        self.space.extract(&self.base)
    }

    fn materialize(&self, genome: &[f64]) -> ParameterSet {
        self.space.materialize(&self.base, genome)
    }

    /// Fitness of each current genome, looked up from the shared history.
    fn fitnesses(&self, history: &[ScoredCandidate]) -> Vec<f64> {
        let by_id: HashMap<ParamSetId, f64> = history
            .iter()
            .map(|c| (c.params.id(), c.score_or_worst()))
            .collect();
        self.population
            .iter()
            .map(|g| {
                by_id
                    .get(&self.materialize(g).id())
                    .copied()
                    .unwrap_or(WORST_SCORE)
            })
            .collect()
    }

    fn tournament_select(&mut self, fitnesses: &[f64]) -> usize {
        let n = self.population.len();
        let mut best = self.rng.gen_range(0..n);
        for _ in 1..self.config.tournament_size.min(n) {
            let challenger = self.rng.gen_range(0..n);
            if fitnesses[challenger] > fitnesses[best] {
                best = challenger;
            }
        }
        best
    }

    /// Uniform per-key crossover.
    fn crossover(&mut self, a: &[f64], b: &[f64]) -> Vec<f64> {
        a.iter()
            .zip(b)
            .map(|(&x, &y)| if self.rng.gen_bool(0.5) { x } else { y })
            .collect()
    }

    /// Bounded Gaussian mutation: perturb each key with probability
    /// `mutation_prob`, then pull the value back into its domain.
    fn mutate(&mut self, genome: &mut [f64]) {
        for (slot, (_, domain)) in self.space.entries().iter().enumerate() {
            if self.rng.gen_bool(self.config.mutation_prob) {
                let sigma = (self.config.sigma_frac * domain.width()).max(1e-9);
                let normal = Normal::new(genome[slot], sigma).expect("sigma is positive");
                genome[slot] = domain.clamp(normal.sample(&mut self.rng));
            }
        }
    }

    fn evolve(&mut self, history: &[ScoredCandidate]) {
        let fitnesses = self.fitnesses(history);

        // Rank current genomes by fitness, best first.
        let mut ranked: Vec<usize> = (0..self.population.len()).collect();
        ranked.sort_by(|&a, &b| {
            fitnesses[b]
                .partial_cmp(&fitnesses[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut next = Vec::with_capacity(self.config.population_size);
        for &idx in ranked.iter().take(self.config.elitism) {
            next.push(self.population[idx].clone());
        }

        while next.len() < self.config.population_size {
            let p1 = self.tournament_select(&fitnesses);
            let p2 = self.tournament_select(&fitnesses);
            let mut child = if self.rng.gen_bool(self.config.crossover_prob) {
                let (a, b) = (self.population[p1].clone(), self.population[p2].clone());
                self.crossover(&a, &b)
            } else {
                self.population[p1].clone()
            };
            self.mutate(&mut child);
            if self.materialize(&child).validate().is_err() {
                child = self.random_genome();
            }
            next.push(child);
        }
        self.population = next;
    }

    fn update_plateau(&mut self, history: &[ScoredCandidate]) {
        let current_best = history.iter().filter_map(|c| c.score).fold(
            None::<f64>,
            |acc, s| match acc {
                Some(b) if b >= s => Some(b),
                _ => Some(s),
            },
        );
        match (self.best_seen, current_best) {
            (None, Some(b)) => {
                self.best_seen = Some(b);
                self.generations_without_improvement = 0;
            }
            (Some(prev), Some(b)) if b > prev => {
                self.best_seen = Some(b);
                self.generations_without_improvement = 0;
            }
            _ => {
                self.generations_without_improvement += 1;
            }
        }
    }
}

impl SearchStrategy for GeneticSearch {
    fn name(&self) -> &'static str {
        "genetic"
    }

    fn propose(&mut self, history: &[ScoredCandidate]) -> Vec<ParameterSet> {
        if self.stopped {
            return Vec::new();
        }
        if self.generation >= self.config.n_generations {
            self.stopped = true;
            return Vec::new();
        }

        if self.generation == 0 {
            self.population = (0..self.config.population_size)
                .map(|_| self.random_genome())
                .collect();
        } else {
            self.update_plateau(history);
            if self.generations_without_improvement >= self.config.patience {
                self.stopped = true;
                return Vec::new();
            }
            self.evolve(history);
        }
        self.generation += 1;

        self.population
            .iter()
            .map(|g| self.space.materialize(&self.base, g))
            .collect()
    }

    fn exhausted(&self) -> bool {
        self.stopped
    }
}
