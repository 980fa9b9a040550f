//! TradeRecord — a completed round-trip trade. Append-only, immutable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which entry branch opened the trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryReason {
    /// V-shape turn: upward band cross from a depressed price position.
    Reversal,
    /// Main-capital inflow while the price position is low.
    Inflow,
}

/// Which exit rule closed the trade. Evaluation order is fixed; the first
/// rule that fires is the one recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Band-top target: price position reached the exit threshold.
    Signal,
    /// Unrealized loss breached the stop threshold.
    StopLoss,
    /// Holding horizon exhausted; forced exit regardless of signal state.
    MaxHold,
}

/// A complete round-trip trade record: entry → exit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,

    // ── Entry ──
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub entry_reason: EntryReason,

    // ── Exit ──
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size / PnL ──
    pub quantity: f64,
    pub realized_pnl: f64,

    /// Trading days between entry and exit (series-index difference).
    pub days_held: usize,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.realized_pnl > 0.0
    }

    /// Return on the trade as a fraction of entry cost.
    pub fn return_frac(&self) -> f64 {
        let cost = self.entry_price * self.quantity;
        if cost == 0.0 {
            return 0.0;
        }
        self.realized_pnl / cost
    }
}
