//! Run settings — the resolved configuration surface.
//!
//! Argument parsing belongs to the (external) CLI; this crate consumes the
//! already-resolved settings, optionally deserialized from TOML. Search
//! strategy selection happens here, at construction time.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use quantlab_core::params::ParameterSet;

use crate::metrics::MetricsConfig;
use crate::optimizer::OptimizeConfig;
use crate::score::Aggregation;
use crate::search::{
    GeneticConfig, GeneticSearch, GridConfig, GridSearch, SearchStrategy, TpeConfig, TpeSearch,
};
use crate::space::ParamSpace;

/// What kind of run this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunMode {
    /// One direct backtest of a single parameter set.
    Backtest,
    /// A parameter-space search.
    Optimize,
}

/// Which search strategy an Optimize run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchMethod {
    Grid,
    Bayesian,
    Genetic,
}

/// Errors from settings validation or parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("universe must not be empty")]
    EmptyUniverse,
    #[error("evaluation budget must be > 0")]
    ZeroBudget,
    #[error("validation_fraction {0} outside (0, 1)")]
    BadValidationFraction(f64),
    #[error("start_date {start} is after end_date {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },
}

/// The complete resolved settings for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    pub mode: RunMode,
    #[serde(default = "default_method")]
    pub method: SearchMethod,
    #[serde(default = "default_budget")]
    pub budget: usize,
    pub universe: Vec<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Worker pool width; None uses every available compute unit.
    #[serde(default)]
    pub parallelism: Option<usize>,
    /// Per-candidate wall-clock budget in seconds.
    #[serde(default)]
    pub eval_timeout_secs: Option<u64>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub validation_fraction: Option<f64>,
    #[serde(default = "default_overfit_gap")]
    pub overfit_gap_threshold: f64,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub risk_free_rate: f64,
}

fn default_method() -> SearchMethod {
    SearchMethod::Grid
}

fn default_budget() -> usize {
    200
}

fn default_seed() -> u64 {
    42
}

fn default_overfit_gap() -> f64 {
    1.0
}

impl RunSettings {
    /// Parse settings from a TOML document and validate them.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let settings: RunSettings = toml::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.universe.is_empty() {
            return Err(ConfigError::EmptyUniverse);
        }
        if self.mode == RunMode::Optimize && self.budget == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        if let Some(f) = self.validation_fraction {
            if !(0.0 < f && f < 1.0) {
                return Err(ConfigError::BadValidationFraction(f));
            }
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ConfigError::InvertedDateRange { start, end });
            }
        }
        Ok(())
    }

    /// Lower these settings into the optimizer's configuration.
    pub fn to_optimize_config(&self) -> OptimizeConfig {
        OptimizeConfig {
            budget: self.budget,
            parallelism: self.parallelism,
            eval_timeout: self.eval_timeout_secs.map(Duration::from_secs),
            aggregation: self.aggregation,
            metrics: MetricsConfig {
                risk_free_rate: self.risk_free_rate,
            },
            validation_fraction: self.validation_fraction,
            overfit_gap_threshold: self.overfit_gap_threshold,
        }
    }

    /// Construct the selected search strategy, seeded from these settings.
    pub fn build_strategy(
        &self,
        space: &ParamSpace,
        base: &ParameterSet,
    ) -> Box<dyn SearchStrategy> {
        match self.method {
            SearchMethod::Grid => Box::new(GridSearch::new(
                space.clone(),
                base.clone(),
                GridConfig {
                    seed: self.seed,
                    ..Default::default()
                },
            )),
            SearchMethod::Bayesian => Box::new(TpeSearch::new(
                space.clone(),
                base.clone(),
                TpeConfig {
                    seed: self.seed,
                    ..Default::default()
                },
            )),
            SearchMethod::Genetic => Box::new(GeneticSearch::new(
                space.clone(),
                base.clone(),
                GeneticConfig {
                    seed: self.seed,
                    ..Default::default()
                },
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RunSettings {
        RunSettings {
            mode: RunMode::Optimize,
            method: SearchMethod::Grid,
            budget: 100,
            universe: vec!["AAA".into()],
            start_date: None,
            end_date: None,
            parallelism: None,
            eval_timeout_secs: None,
            seed: 42,
            validation_fraction: None,
            overfit_gap_threshold: 1.0,
            aggregation: Aggregation::default(),
            risk_free_rate: 0.0,
        }
    }

    #[test]
    fn minimal_toml_parses_with_defaults() {
        let toml = r#"
            mode = "OPTIMIZE"
            universe = ["600000", "600036"]
        "#;
        let s = RunSettings::from_toml_str(toml).unwrap();
        assert_eq!(s.mode, RunMode::Optimize);
        assert_eq!(s.method, SearchMethod::Grid);
        assert_eq!(s.budget, 200);
        assert_eq!(s.seed, 42);
    }

    #[test]
    fn full_toml_roundtrip() {
        let toml = r#"
            mode = "OPTIMIZE"
            method = "GENETIC"
            budget = 500
            universe = ["600000"]
            parallelism = 4
            eval_timeout_secs = 30
            seed = 7
            validation_fraction = 0.7
            overfit_gap_threshold = 0.5

            [aggregation]
            type = "MEAN_SHARPE"
            drawdown_penalty = 2.0
        "#;
        let s = RunSettings::from_toml_str(toml).unwrap();
        assert_eq!(s.method, SearchMethod::Genetic);
        assert_eq!(s.parallelism, Some(4));
        assert_eq!(s.validation_fraction, Some(0.7));
        assert_eq!(
            s.aggregation,
            Aggregation::MeanSharpe {
                drawdown_penalty: 2.0
            }
        );
    }

    #[test]
    fn empty_universe_rejected() {
        let mut s = settings();
        s.universe.clear();
        assert!(matches!(s.validate(), Err(ConfigError::EmptyUniverse)));
    }

    #[test]
    fn zero_budget_rejected_for_optimize() {
        let mut s = settings();
        s.budget = 0;
        assert!(matches!(s.validate(), Err(ConfigError::ZeroBudget)));
        s.mode = RunMode::Backtest;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn bad_validation_fraction_rejected() {
        let mut s = settings();
        s.validation_fraction = Some(1.0);
        assert!(matches!(
            s.validate(),
            Err(ConfigError::BadValidationFraction(_))
        ));
    }

    #[test]
    fn inverted_date_range_rejected() {
        let mut s = settings();
        s.start_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        s.end_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert!(matches!(
            s.validate(),
            Err(ConfigError::InvertedDateRange { .. })
        ));
    }

    #[test]
    fn strategy_selection_matches_method() {
        let space = ParamSpace::new();
        let base = ParameterSet::default();
        let mut s = settings();
        assert_eq!(s.build_strategy(&space, &base).name(), "grid");
        s.method = SearchMethod::Bayesian;
        assert_eq!(s.build_strategy(&space, &base).name(), "bayesian");
        s.method = SearchMethod::Genetic;
        assert_eq!(s.build_strategy(&space, &base).name(), "genetic");
    }
}
