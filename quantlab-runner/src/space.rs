//! Parameter space — which keys are tunable and over what domains.
//!
//! A `ParamSpace` is an ordered list of `(ParamKey, ParamDomain)` pairs.
//! Ordering is part of the space's identity: grid enumeration, genome
//! layout, and leaderboard columns all follow it, which keeps every search
//! strategy deterministic for a given space and seed.

use rand::Rng;
use serde::{Deserialize, Serialize};

use quantlab_core::params::ParameterSet;

/// A tunable key of the `ParameterSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKey {
    InitialCapital,
    MinHoldDays,
    MaxHoldDays,
    PositionsPerEntry,
    PositionSize,
    EntryPositionMax,
    EntryPctChgMin,
    EntryNetRateMin,
    ExitPositionMin,
    StopLossPct,
}

impl ParamKey {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitialCapital => "initial_capital",
            Self::MinHoldDays => "min_hold_days",
            Self::MaxHoldDays => "max_hold_days",
            Self::PositionsPerEntry => "positions_per_entry",
            Self::PositionSize => "position_size",
            Self::EntryPositionMax => "entry_position_max",
            Self::EntryPctChgMin => "entry_pct_chg_min",
            Self::EntryNetRateMin => "entry_net_rate_min",
            Self::ExitPositionMin => "exit_position_min",
            Self::StopLossPct => "stop_loss_pct",
        }
    }

    /// Keys backed by integer fields round their values on apply.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::MinHoldDays | Self::MaxHoldDays | Self::PositionsPerEntry
        )
    }

    /// Write `value` into the corresponding field.
    pub fn apply(&self, params: &mut ParameterSet, value: f64) {
        match self {
            Self::InitialCapital => params.initial_capital = value,
            Self::MinHoldDays => params.min_hold_days = value.round().max(0.0) as u32,
            Self::MaxHoldDays => params.max_hold_days = value.round().max(0.0) as u32,
            Self::PositionsPerEntry => params.positions_per_entry = value.round().max(1.0) as u32,
            Self::PositionSize => params.position_size = value,
            Self::EntryPositionMax => params.entry_position_max = value,
            Self::EntryPctChgMin => params.entry_pct_chg_min = value,
            Self::EntryNetRateMin => params.entry_net_rate_min = value,
            Self::ExitPositionMin => params.exit_position_min = value,
            Self::StopLossPct => params.stop_loss_pct = value,
        }
    }

    /// Read the corresponding field as f64 (for export and history).
    pub fn get(&self, params: &ParameterSet) -> f64 {
        match self {
            Self::InitialCapital => params.initial_capital,
            Self::MinHoldDays => params.min_hold_days as f64,
            Self::MaxHoldDays => params.max_hold_days as f64,
            Self::PositionsPerEntry => params.positions_per_entry as f64,
            Self::PositionSize => params.position_size,
            Self::EntryPositionMax => params.entry_position_max,
            Self::EntryPctChgMin => params.entry_pct_chg_min,
            Self::EntryNetRateMin => params.entry_net_rate_min,
            Self::ExitPositionMin => params.exit_position_min,
            Self::StopLossPct => params.stop_loss_pct,
        }
    }
}

/// Declared domain of one tunable key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParamDomain {
    /// Explicit discrete set of values.
    Discrete(Vec<f64>),
    /// Bounded continuous range [min, max].
    Continuous { min: f64, max: f64 },
    /// Bounded integer range with step.
    IntRange { min: i64, max: i64, step: i64 },
}

impl ParamDomain {
    /// Enumerate the domain for grid search. Continuous domains are
    /// step-sampled into `continuous_samples` evenly spaced points.
    pub fn grid_values(&self, continuous_samples: usize) -> Vec<f64> {
        match self {
            ParamDomain::Discrete(values) => values.clone(),
            ParamDomain::Continuous { min, max } => {
                let n = continuous_samples.max(2);
                (0..n)
                    .map(|i| min + (max - min) * i as f64 / (n - 1) as f64)
                    .collect()
            }
            ParamDomain::IntRange { min, max, step } => {
                let step = (*step).max(1);
                let mut values = Vec::new();
                let mut v = *min;
                while v <= *max {
                    values.push(v as f64);
                    v += step;
                }
                values
            }
        }
    }

    /// Uniformly sample one value.
    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        match self {
            ParamDomain::Discrete(values) => values[rng.gen_range(0..values.len())],
            ParamDomain::Continuous { min, max } => rng.gen_range(*min..=*max),
            ParamDomain::IntRange { min, max, step } => {
                let step = (*step).max(1);
                let steps = (max - min) / step;
                (min + rng.gen_range(0..=steps) * step) as f64
            }
        }
    }

    /// Pull `value` back inside the domain: clamp to bounds, snap Discrete
    /// to the nearest member and IntRange to the nearest step.
    pub fn clamp(&self, value: f64) -> f64 {
        match self {
            ParamDomain::Discrete(values) => values
                .iter()
                .copied()
                .min_by(|a, b| {
                    (a - value)
                        .abs()
                        .partial_cmp(&(b - value).abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap_or(value),
            ParamDomain::Continuous { min, max } => value.clamp(*min, *max),
            ParamDomain::IntRange { min, max, step } => {
                let step = (*step).max(1);
                let steps_available = (max - min) / step;
                let clamped = value.clamp(*min as f64, *max as f64);
                let steps = (((clamped - *min as f64) / step as f64).round() as i64)
                    .clamp(0, steps_available);
                (min + steps * step) as f64
            }
        }
    }

    /// Width of the domain, the scale for Gaussian perturbation.
    pub fn width(&self) -> f64 {
        match self {
            ParamDomain::Discrete(values) => {
                let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
                let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                (hi - lo).max(0.0)
            }
            ParamDomain::Continuous { min, max } => max - min,
            ParamDomain::IntRange { min, max, .. } => (max - min) as f64,
        }
    }
}

/// Ordered set of tunable keys and their domains.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamSpace {
    entries: Vec<(ParamKey, ParamDomain)>,
}

impl ParamSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key; replaces the domain when the key is already present.
    pub fn add(mut self, key: ParamKey, domain: ParamDomain) -> Self {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = domain;
        } else {
            self.entries.push((key, domain));
        }
        self
    }

    pub fn entries(&self) -> &[(ParamKey, ParamDomain)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = ParamKey> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    /// Materialize an assignment (one value per key, in space order) onto a
    /// base parameter set.
    pub fn materialize(&self, base: &ParameterSet, values: &[f64]) -> ParameterSet {
        debug_assert_eq!(values.len(), self.entries.len());
        let mut params = base.clone();
        for ((key, _), &value) in self.entries.iter().zip(values) {
            key.apply(&mut params, value);
        }
        params
    }

    /// Read the current assignment of this space's keys out of a set.
    pub fn extract(&self, params: &ParameterSet) -> Vec<f64> {
        self.entries.iter().map(|(k, _)| k.get(params)).collect()
    }

    /// Sample a full random assignment.
    pub fn sample(&self, rng: &mut impl Rng) -> Vec<f64> {
        self.entries.iter().map(|(_, d)| d.sample(rng)).collect()
    }

    /// Number of grid points the full Cartesian product would have.
    pub fn grid_size(&self, continuous_samples: usize) -> usize {
        self.entries
            .iter()
            .map(|(_, d)| d.grid_values(continuous_samples).len())
            .product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn discrete_grid_values() {
        let d = ParamDomain::Discrete(vec![1.0, 2.0, 3.0]);
        assert_eq!(d.grid_values(5), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn continuous_step_sampling() {
        let d = ParamDomain::Continuous { min: 0.0, max: 1.0 };
        let values = d.grid_values(5);
        assert_eq!(values.len(), 5);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[4], 1.0);
        assert!((values[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn int_range_steps() {
        let d = ParamDomain::IntRange {
            min: 1,
            max: 10,
            step: 3,
        };
        assert_eq!(d.grid_values(0), vec![1.0, 4.0, 7.0, 10.0]);
    }

    #[test]
    fn sample_stays_in_domain() {
        let mut rng = StdRng::seed_from_u64(7);
        let d = ParamDomain::Continuous { min: 0.2, max: 0.8 };
        for _ in 0..100 {
            let v = d.sample(&mut rng);
            assert!((0.2..=0.8).contains(&v));
        }
        let i = ParamDomain::IntRange {
            min: 2,
            max: 8,
            step: 2,
        };
        for _ in 0..100 {
            let v = i.sample(&mut rng);
            assert!(v >= 2.0 && v <= 8.0);
            assert_eq!((v as i64 - 2) % 2, 0);
        }
    }

    #[test]
    fn clamp_snaps_to_domain() {
        let d = ParamDomain::Discrete(vec![1.0, 5.0, 9.0]);
        assert_eq!(d.clamp(4.1), 5.0);
        let c = ParamDomain::Continuous { min: 0.0, max: 1.0 };
        assert_eq!(c.clamp(1.7), 1.0);
        let i = ParamDomain::IntRange {
            min: 0,
            max: 10,
            step: 5,
        };
        assert_eq!(i.clamp(7.4), 5.0);
        assert_eq!(i.clamp(12.0), 10.0);
    }

    #[test]
    fn materialize_applies_in_order() {
        let space = ParamSpace::new()
            .add(ParamKey::MinHoldDays, ParamDomain::IntRange { min: 0, max: 5, step: 1 })
            .add(
                ParamKey::ExitPositionMin,
                ParamDomain::Continuous { min: 0.5, max: 1.0 },
            );
        let base = ParameterSet::default();
        let params = space.materialize(&base, &[3.0, 0.75]);
        assert_eq!(params.min_hold_days, 3);
        assert!((params.exit_position_min - 0.75).abs() < 1e-12);
        assert_eq!(space.extract(&params), vec![3.0, 0.75]);
    }

    #[test]
    fn integer_keys_round_on_apply() {
        let mut params = ParameterSet::default();
        ParamKey::MaxHoldDays.apply(&mut params, 29.6);
        assert_eq!(params.max_hold_days, 30);
    }

    #[test]
    fn grid_size_is_product_of_domains() {
        let space = ParamSpace::new()
            .add(
                ParamKey::EntryPositionMax,
                ParamDomain::Discrete(vec![0.1, 0.2, 0.3]),
            )
            .add(
                ParamKey::ExitPositionMin,
                ParamDomain::Discrete(vec![0.7, 0.8, 0.9]),
            );
        assert_eq!(space.grid_size(5), 9);
    }
}
