//! Property tests for the search layer.
//!
//! 1. Domain sampling and clamping always land inside the domain
//! 2. Materialize/extract round-trips an assignment through a ParameterSet
//! 3. Metric definedness: summarize never yields non-finite defined values

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use chrono::NaiveDate;
use quantlab_core::domain::{EquityPoint, IndicatorSeries, IndicatorSnapshot};
use quantlab_core::engine::run_backtest;
use quantlab_core::params::ParameterSet;
use quantlab_runner::metrics::{Metrics, MetricsConfig};
use quantlab_runner::space::ParamDomain;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_domain() -> impl Strategy<Value = ParamDomain> {
    prop_oneof![
        prop::collection::vec(-100.0..100.0_f64, 1..8).prop_map(ParamDomain::Discrete),
        (-100.0..0.0_f64, 0.0..100.0_f64)
            .prop_map(|(min, max)| ParamDomain::Continuous { min, max }),
        (-50i64..0, 1i64..50, 1i64..7)
            .prop_map(|(min, span, step)| ParamDomain::IntRange {
                min,
                max: min + span,
                step,
            }),
    ]
}

fn domain_contains(domain: &ParamDomain, value: f64) -> bool {
    match domain {
        ParamDomain::Discrete(values) => values.iter().any(|&v| (v - value).abs() < 1e-9),
        ParamDomain::Continuous { min, max } => (*min..=*max).contains(&value),
        ParamDomain::IntRange { min, max, step } => {
            let step = (*step).max(1);
            value >= *min as f64
                && value <= *max as f64
                && ((value as i64 - min) % step == 0)
        }
    }
}

proptest! {
    #[test]
    fn sampled_values_stay_in_domain(domain in arb_domain(), seed in 0u64..1_000) {
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..16 {
            let v = domain.sample(&mut rng);
            prop_assert!(domain_contains(&domain, v), "{v} escaped {domain:?}");
        }
    }

    #[test]
    fn clamped_values_stay_in_domain(domain in arb_domain(), value in -500.0..500.0_f64) {
        let clamped = domain.clamp(value);
        prop_assert!(
            domain_contains(&domain, clamped),
            "clamp({value}) = {clamped} escaped {domain:?}"
        );
    }

    #[test]
    fn grid_values_stay_in_domain(domain in arb_domain(), samples in 2usize..10) {
        for v in domain.grid_values(samples) {
            prop_assert!(domain_contains(&domain, v), "{v} escaped {domain:?}");
        }
    }

    /// Every defined metric over an arbitrary backtest is finite.
    #[test]
    fn defined_metrics_are_finite(closes in prop::collection::vec(5.0..200.0_f64, 0..80)) {
        let base = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let snaps: Vec<IndicatorSnapshot> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let mut s =
                    IndicatorSnapshot::bare(base + chrono::Duration::days(i as i64), c);
                s.price_position = Some(0.5 + (i as f64 * 0.37).sin() * 0.5);
                s.prev_price_position = Some(0.5);
                s.pct_chg = Some(0.0);
                s.main_net_rate = Some(0.1);
                s.reversal_cross = Some(0);
                s
            })
            .collect();
        let series = IndicatorSeries::new("PROP", snaps).unwrap();
        let params = ParameterSet {
            min_hold_days: 1,
            entry_position_max: 0.4,
            entry_net_rate_min: 0.05,
            ..Default::default()
        };
        let out = run_backtest(&series, &params).unwrap();
        let m = Metrics::summarize(&out.equity_curve, &out.trades, MetricsConfig::default());

        prop_assert!(m.total_return.is_finite());
        prop_assert!(m.max_drawdown.is_finite());
        prop_assert!(m.max_drawdown >= 0.0);
        if let Some(v) = m.annualized_return {
            prop_assert!(v.is_finite());
        }
        if let Some(v) = m.sharpe {
            prop_assert!(v.is_finite());
        }
        if let Some(v) = m.win_rate {
            prop_assert!((0.0..=1.0).contains(&v));
        }
    }
}

/// Equity curve values feed straight into metrics without NaN traps.
#[test]
fn constant_curve_has_no_defined_sharpe() {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let curve: Vec<EquityPoint> = (0..50)
        .map(|i| EquityPoint {
            date: base + chrono::Duration::days(i),
            equity: 100_000.0,
        })
        .collect();
    let m = Metrics::summarize(&curve, &[], MetricsConfig::default());
    assert_eq!(m.sharpe, None);
}
