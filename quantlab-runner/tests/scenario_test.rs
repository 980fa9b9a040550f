//! End-to-end scenario tests against the full runner surface.
//!
//! Scenarios:
//! A. Single-symbol V-shape: one profitable round trip at known dates
//! B. Empty series: degenerate but valid, undefined Sharpe
//! C. 3×3 grid with a known optimum: the search returns it

use chrono::NaiveDate;
use quantlab_core::domain::{IndicatorSeries, IndicatorSnapshot};
use quantlab_core::params::ParameterSet;
use quantlab_runner::evaluate::{run_portfolio_backtest, MarketData};
use quantlab_runner::metrics::{Metrics, MetricsConfig};
use quantlab_runner::optimizer::{OptimizeConfig, Optimizer};
use quantlab_runner::score::Aggregation;
use quantlab_runner::search::{GridConfig, GridSearch};
use quantlab_runner::space::{ParamDomain, ParamKey, ParamSpace};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

/// The canonical V-shape: [10, 9, 8, 7, 6, 7, 8, 9, 10, 11], band
/// positions spanning the path's own range.
fn v_series(symbol: &str) -> IndicatorSeries {
    let closes = [10.0, 9.0, 8.0, 7.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0];
    let snaps = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let pos = (close - 6.0) / 5.0;
            let prev = if i == 0 { 0.8 } else { (closes[i - 1] - 6.0) / 5.0 };
            let mut s = IndicatorSnapshot::bare(base_date() + chrono::Duration::days(i as i64), close);
            s.price_position = Some(pos);
            s.prev_price_position = Some(prev);
            s.pct_chg = Some(if i == 0 {
                0.0
            } else {
                (close - closes[i - 1]) / closes[i - 1] * 100.0
            });
            s.main_net_rate = Some(0.0);
            s.reversal_cross = Some(0);
            s
        })
        .collect();
    IndicatorSeries::new(symbol, snaps).unwrap()
}

/// Entry via the inflow branch whenever the band position is low enough;
/// wide stop and horizon so only the band rules drive the trade.
fn v_params(entry_max: f64, exit_min: f64) -> ParameterSet {
    ParameterSet {
        min_hold_days: 1,
        max_hold_days: 60,
        entry_position_max: entry_max,
        entry_pct_chg_min: 0.0,
        entry_net_rate_min: 0.0,
        exit_position_min: exit_min,
        stop_loss_pct: 0.9,
        ..Default::default()
    }
}

// ── Scenario A ───────────────────────────────────────────────────────

#[test]
fn scenario_a_single_profitable_round_trip() {
    let data = MarketData::from_series([v_series("AAA")]);
    // Entry when the position drops below 0.2; with the inclusive rule
    // that means strictly below via a 0.19 threshold, i.e. the trough.
    let params = v_params(0.19, 0.8);
    let runs = run_portfolio_backtest(&data, &params, MetricsConfig::default()).unwrap();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];

    assert_eq!(run.output.trades.len(), 1);
    let trade = &run.output.trades[0];
    // Opens at the trough (index 4, close 6.0).
    assert_eq!(trade.entry_date, base_date() + chrono::Duration::days(4));
    assert!((trade.entry_price - 6.0).abs() < 1e-12);
    // Closes when the position reaches 0.8 (index 8, close 10.0).
    assert_eq!(trade.exit_date, base_date() + chrono::Duration::days(8));
    assert!((trade.exit_price - 10.0).abs() < 1e-12);
    assert!(trade.realized_pnl > 0.0);

    assert!(run.metrics.total_return > 0.0);
    assert_eq!(run.metrics.win_rate, Some(1.0));
    assert_eq!(run.metrics.trade_count, 1);
}

// ── Scenario B ───────────────────────────────────────────────────────

#[test]
fn scenario_b_empty_series_is_valid_and_undefined() {
    let data = MarketData::from_series([IndicatorSeries::empty("AAA")]);
    let runs =
        run_portfolio_backtest(&data, &v_params(0.19, 0.8), MetricsConfig::default()).unwrap();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];

    assert!(run.output.trades.is_empty());
    assert!(run.output.equity_curve.is_empty());
    assert_eq!(run.metrics.total_return, 0.0);
    assert_eq!(run.metrics.sharpe, None);
    assert_eq!(run.metrics.win_rate, None);
}

#[test]
fn zero_trade_metrics_distinguish_no_signal_from_losses() {
    // A flat, signal-free series: defined curve, no trades.
    let snaps = (0..30)
        .map(|i| {
            let mut s =
                IndicatorSnapshot::bare(base_date() + chrono::Duration::days(i as i64), 50.0);
            s.price_position = Some(0.5);
            s.prev_price_position = Some(0.5);
            s.pct_chg = Some(0.0);
            s.main_net_rate = Some(0.0);
            s.reversal_cross = Some(0);
            s
        })
        .collect();
    let series = IndicatorSeries::new("AAA", snaps).unwrap();
    let data = MarketData::from_series([series]);
    let runs = run_portfolio_backtest(
        &data,
        &v_params(0.1, 0.9),
        MetricsConfig::default(),
    )
    .unwrap();
    let m: &Metrics = &runs[0].metrics;
    assert_eq!(m.trade_count, 0);
    assert_eq!(m.win_rate, None, "no-signal must not read as all-losses");
    assert_eq!(m.sharpe, None, "flat curve has no defined Sharpe");
}

// ── Scenario C ───────────────────────────────────────────────────────

#[test]
fn scenario_c_grid_finds_the_known_optimum() {
    // Over the V-shape, profit is monotone in both keys: entering lower
    // buys cheaper (0.05 → the trough at 6), exiting higher sells dearer
    // (0.9 → the final 11). The 3×3 grid optimum is therefore the corner
    // (0.05, 0.9), known analytically.
    let space = ParamSpace::new()
        .add(
            ParamKey::EntryPositionMax,
            ParamDomain::Discrete(vec![0.05, 0.2, 0.4]),
        )
        .add(
            ParamKey::ExitPositionMin,
            ParamDomain::Discrete(vec![0.5, 0.7, 0.9]),
        );
    let data = MarketData::from_series([v_series("AAA")]);
    let optimizer = Optimizer::new(
        data,
        OptimizeConfig {
            budget: 50,
            aggregation: Aggregation::MeanReturn {
                drawdown_penalty: 0.0,
            },
            ..Default::default()
        },
    )
    .unwrap();

    let base = v_params(0.19, 0.8);
    let mut grid = GridSearch::new(space.clone(), base.clone(), GridConfig::default());
    let report = optimizer.optimize(&mut grid, &space).unwrap();

    assert_eq!(report.evaluations, 9);
    let best = report.best.expect("grid must find a scored candidate");
    assert!((best.params.entry_position_max - 0.05).abs() < 1e-12);
    assert!((best.params.exit_position_min - 0.9).abs() < 1e-12);

    // Leaderboard is score-descending.
    let scores: Vec<f64> = report
        .leaderboard
        .iter()
        .filter_map(|r| r.score)
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn grid_runs_are_deterministic_end_to_end() {
    let space = ParamSpace::new()
        .add(
            ParamKey::EntryPositionMax,
            ParamDomain::Discrete(vec![0.05, 0.2, 0.4]),
        )
        .add(
            ParamKey::ExitPositionMin,
            ParamDomain::Discrete(vec![0.5, 0.7, 0.9]),
        );
    let run = || {
        let data = MarketData::from_series([v_series("AAA")]);
        let optimizer = Optimizer::new(
            data,
            OptimizeConfig {
                budget: 50,
                ..Default::default()
            },
        )
        .unwrap();
        let mut grid =
            GridSearch::new(space.clone(), v_params(0.19, 0.8), GridConfig::default());
        let report = optimizer.optimize(&mut grid, &space).unwrap();
        report
            .leaderboard
            .iter()
            .map(|r| (r.params.id(), r.score.map(f64::to_bits)))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}
