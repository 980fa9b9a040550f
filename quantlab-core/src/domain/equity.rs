//! Equity curve points.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Single point in the equity curve: total portfolio value at a date's close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Extract the value column of a curve.
pub fn equity_values(curve: &[EquityPoint]) -> Vec<f64> {
    curve.iter().map(|p| p.equity).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_extraction() {
        let curve = vec![
            EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                equity: 100.0,
            },
            EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                equity: 110.0,
            },
        ];
        assert_eq!(equity_values(&curve), vec![100.0, 110.0]);
    }
}
