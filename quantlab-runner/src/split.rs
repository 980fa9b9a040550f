//! Train/validation split — the overfitting guard's data side.
//!
//! Splits every symbol's series at the same index fraction: the earlier
//! window trains (scores candidates), the later window validates the final
//! best. Disjoint by construction; a symbol too short to split contributes
//! its whole series to training and nothing to validation.

use crate::evaluate::MarketData;

/// The two disjoint windows.
#[derive(Debug, Clone)]
pub struct DateSplit {
    pub train: MarketData,
    pub validation: MarketData,
}

/// Split each series at `train_fraction` of its length (clamped to
/// [0.1, 0.9] to keep both windows meaningful).
pub fn split_by_fraction(data: &MarketData, train_fraction: f64) -> DateSplit {
    let fraction = train_fraction.clamp(0.1, 0.9);
    let mut train = MarketData::new();
    let mut validation = MarketData::new();

    for (_, series) in data.iter() {
        let n = series.len();
        let cut = (n as f64 * fraction).floor() as usize;
        if cut == 0 || cut >= n {
            train.insert(series.clone());
            continue;
        }
        train.insert(series.slice(0, cut));
        validation.insert(series.slice(cut, n));
    }

    DateSplit { train, validation }
}
