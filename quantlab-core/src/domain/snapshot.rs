//! IndicatorSnapshot and IndicatorSeries — the per-symbol input contract.
//!
//! Snapshots are produced by the (external) indicator pipeline, one per
//! trading date. Indicator fields are `Option` because a date can arrive with
//! gaps; the engine skips signal evaluation on such dates but still marks
//! open positions to `close`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One date's derived indicator values for one symbol. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    /// Close price; also the mark-to-market price for the date.
    pub close: f64,

    /// Position of close within the volatility band: 0 = lower band, 1 = upper.
    pub price_position: Option<f64>,
    /// Previous date's band position.
    pub prev_price_position: Option<f64>,
    /// Moving-average slope.
    pub ma_slope: Option<f64>,
    /// Relative standard deviation (volatility measure).
    pub rsd: Option<f64>,
    pub prev_rsd: Option<f64>,
    pub rsd_chg: Option<f64>,
    /// Day-over-day percent change of close.
    pub pct_chg: Option<f64>,
    /// Main-capital net inflow rate.
    pub main_net_rate: Option<f64>,
    /// +1 on an upward cross of the lower band, -1 on a downward cross, 0 otherwise.
    pub reversal_cross: Option<i8>,

    // ── Optional valuation fields ──
    pub pe: Option<f64>,
    pub loss_flag: Option<bool>,
}

impl IndicatorSnapshot {
    /// Minimal snapshot with only a date and close; all indicators absent.
    pub fn bare(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            close,
            price_position: None,
            prev_price_position: None,
            ma_slope: None,
            rsd: None,
            prev_rsd: None,
            rsd_chg: None,
            pct_chg: None,
            main_net_rate: None,
            reversal_cross: None,
            pe: None,
            loss_flag: None,
        }
    }

    /// True when the fields consumed by signal evaluation are all present
    /// and finite. Dates failing this are DataGap dates: no signal is
    /// evaluated, but marking still proceeds on `close`.
    pub fn has_signal_fields(&self) -> bool {
        fn finite(v: Option<f64>) -> bool {
            matches!(v, Some(x) if x.is_finite())
        }
        finite(self.price_position)
            && finite(self.prev_price_position)
            && finite(self.pct_chg)
            && finite(self.main_net_rate)
            && self.reversal_cross.is_some()
    }
}

/// Errors from series construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeriesError {
    #[error("snapshots out of order at index {index}: {date} follows {prev}")]
    OutOfOrder {
        index: usize,
        prev: NaiveDate,
        date: NaiveDate,
    },
    #[error("duplicate date {date} at index {index}")]
    DuplicateDate { index: usize, date: NaiveDate },
}

/// Ordered, immutable per-symbol sequence of snapshots.
///
/// Construction validates strict date ascension (no duplicates). An empty
/// series is valid and yields a degenerate zero-trade backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSeries {
    symbol: String,
    snapshots: Vec<IndicatorSnapshot>,
}

impl IndicatorSeries {
    pub fn new(
        symbol: impl Into<String>,
        snapshots: Vec<IndicatorSnapshot>,
    ) -> Result<Self, SeriesError> {
        for (i, pair) in snapshots.windows(2).enumerate() {
            let (a, b) = (&pair[0], &pair[1]);
            if b.date == a.date {
                return Err(SeriesError::DuplicateDate {
                    index: i + 1,
                    date: b.date,
                });
            }
            if b.date < a.date {
                return Err(SeriesError::OutOfOrder {
                    index: i + 1,
                    prev: a.date,
                    date: b.date,
                });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            snapshots,
        })
    }

    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            snapshots: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IndicatorSnapshot> {
        self.snapshots.iter()
    }

    pub fn snapshots(&self) -> &[IndicatorSnapshot] {
        &self.snapshots
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.snapshots.first().map(|s| s.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.snapshots.last().map(|s| s.date)
    }

    /// Sub-series over snapshot indices [start, end), preserving the symbol.
    pub fn slice(&self, start: usize, end: usize) -> IndicatorSeries {
        let end = end.min(self.snapshots.len());
        let start = start.min(end);
        Self {
            symbol: self.symbol.clone(),
            snapshots: self.snapshots[start..end].to_vec(),
        }
    }
}
