//! ParameterSet — the validated strategy configuration value object.
//!
//! One concrete assignment of every tunable. Passed by value into each
//! evaluation; there is no ambient/global configuration. Identity is the
//! BLAKE3 hash of the canonical JSON serialization, so two sets with equal
//! contents share an id and can share cached results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the entry allocation is determined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizeSpec {
    /// Fixed currency amount per entry.
    FixedAmount,
    /// Fraction of available cash per entry (0 < fraction <= 1).
    CashFraction { fraction: f64 },
}

/// Content-addressed identity of a ParameterSet.
pub type ParamSetId = String;

/// Validated strategy parameters. Immutable by convention: build, validate,
/// then pass by reference into the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Starting cash, currency units. Must be > 0.
    pub initial_capital: f64,
    /// Minimum trading days a position must be held before any exit rule
    /// may fire.
    pub min_hold_days: u32,
    /// Forced-exit horizon in trading days. Must be >= min_hold_days.
    pub max_hold_days: u32,
    /// Lot multiplier for the entry allocation. Must be >= 1.
    pub positions_per_entry: u32,
    /// Currency size of one lot. Must be > 0.
    pub position_size: f64,
    pub sizing: SizeSpec,

    // ── Entry thresholds ──
    /// Band position at or below which entries are considered. [0, 1].
    pub entry_position_max: f64,
    /// Minimum day-over-day percent change for the reversal entry. >= 0.
    pub entry_pct_chg_min: f64,
    /// Minimum main-capital inflow rate for the inflow entry.
    pub entry_net_rate_min: f64,

    // ── Exit thresholds ──
    /// Band position at or above which the signal exit fires. [0, 1].
    pub exit_position_min: f64,
    /// Fractional loss at which the stop fires. (0, 1].
    pub stop_loss_pct: f64,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            min_hold_days: 2,
            max_hold_days: 60,
            positions_per_entry: 1,
            position_size: 10_000.0,
            sizing: SizeSpec::FixedAmount,
            entry_position_max: 0.17,
            entry_pct_chg_min: 0.0,
            entry_net_rate_min: 0.2,
            exit_position_min: 0.80,
            stop_loss_pct: 0.15,
        }
    }
}

/// A ParameterSet value outside its declared domain. Carries the offending
/// key and value so the caller can report it.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("parameter '{key}' = {value} violates its domain: {requirement}")]
pub struct ParamError {
    pub key: &'static str,
    pub value: f64,
    pub requirement: &'static str,
}

impl ParameterSet {
    /// Check every field against its declared domain. Returns the first
    /// violation found.
    pub fn validate(&self) -> Result<(), ParamError> {
        fn fail(key: &'static str, value: f64, requirement: &'static str) -> ParamError {
            ParamError {
                key,
                value,
                requirement,
            }
        }

        if !(self.initial_capital > 0.0 && self.initial_capital.is_finite()) {
            return Err(fail("initial_capital", self.initial_capital, "must be > 0"));
        }
        if self.max_hold_days < self.min_hold_days {
            return Err(fail(
                "max_hold_days",
                self.max_hold_days as f64,
                "must be >= min_hold_days",
            ));
        }
        if self.positions_per_entry < 1 {
            return Err(fail(
                "positions_per_entry",
                self.positions_per_entry as f64,
                "must be >= 1",
            ));
        }
        if !(self.position_size > 0.0 && self.position_size.is_finite()) {
            return Err(fail("position_size", self.position_size, "must be > 0"));
        }
        if let SizeSpec::CashFraction { fraction } = self.sizing {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(fail("sizing.fraction", fraction, "must be in (0, 1]"));
            }
        }
        if !(0.0..=1.0).contains(&self.entry_position_max) {
            return Err(fail(
                "entry_position_max",
                self.entry_position_max,
                "must be in [0, 1]",
            ));
        }
        if !(self.entry_pct_chg_min >= 0.0 && self.entry_pct_chg_min.is_finite()) {
            return Err(fail(
                "entry_pct_chg_min",
                self.entry_pct_chg_min,
                "must be >= 0",
            ));
        }
        if !self.entry_net_rate_min.is_finite() {
            return Err(fail(
                "entry_net_rate_min",
                self.entry_net_rate_min,
                "must be finite",
            ));
        }
        if !(0.0..=1.0).contains(&self.exit_position_min) {
            return Err(fail(
                "exit_position_min",
                self.exit_position_min,
                "must be in [0, 1]",
            ));
        }
        if !(self.stop_loss_pct > 0.0 && self.stop_loss_pct <= 1.0) {
            return Err(fail(
                "stop_loss_pct",
                self.stop_loss_pct,
                "must be in (0, 1]",
            ));
        }
        Ok(())
    }

    /// Deterministic content hash. Equal contents → equal id, regardless of
    /// how the set was constructed.
    pub fn id(&self) -> ParamSetId {
        let json = serde_json::to_string(self).expect("ParameterSet serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
