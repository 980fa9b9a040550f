//! Open position tracking. Owned exclusively by the PortfolioLedger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::trade::EntryReason;

/// An open long position. Exists only while held.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub quantity: f64,
    /// Index of the entry date within the symbol's series; used for
    /// trading-day hold counting.
    pub entry_index: usize,
    /// Which entry branch opened the position.
    pub entry_reason: EntryReason,
}

impl Position {
    pub fn market_value(&self, current_price: f64) -> f64 {
        self.quantity * current_price
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.quantity * (current_price - self.entry_price)
    }

    /// Fractional return at `current_price` relative to entry.
    pub fn return_frac(&self, current_price: f64) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        (current_price - self.entry_price) / self.entry_price
    }
}
