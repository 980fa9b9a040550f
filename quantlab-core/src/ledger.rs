//! PortfolioLedger — exclusive owner of cash and open positions.
//!
//! The simulator is the only caller. Double-open and close-without-open are
//! simulator logic defects, not recoverable input errors; they surface as
//! `LedgerError` and abort the evaluation that produced them.

use std::collections::HashMap;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{EntryReason, ExitReason, Position, TradeRecord};
use crate::params::SizeSpec;

/// Invariant violations. Fatal for the evaluation that raised them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("position for '{symbol}' already open (entered {entry_date})")]
    PositionAlreadyOpen {
        symbol: String,
        entry_date: NaiveDate,
    },
    #[error("no open position for '{symbol}' to close")]
    NoOpenPosition { symbol: String },
    #[error("exit date {exit_date} is not after entry date {entry_date} for '{symbol}'")]
    ExitNotAfterEntry {
        symbol: String,
        entry_date: NaiveDate,
        exit_date: NaiveDate,
    },
    #[error("fill price {price} for '{symbol}' is not a positive finite value")]
    BadFillPrice { symbol: String, price: f64 },
}

/// How much currency to commit on an entry.
#[derive(Debug, Clone, Copy)]
pub struct EntrySize {
    pub spec: SizeSpec,
    /// Currency size of one lot (FixedAmount mode).
    pub lot_size: f64,
    /// Lot multiplier.
    pub lots: u32,
}

/// Cash plus symbol → at-most-one open position.
#[derive(Debug, Clone)]
pub struct PortfolioLedger {
    initial_capital: f64,
    cash: f64,
    positions: HashMap<String, Position>,
    trades: Vec<TradeRecord>,
}

impl PortfolioLedger {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            positions: HashMap::new(),
            trades: Vec::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<TradeRecord> {
        self.trades
    }

    /// Open a position at `price`, committing cash per `size`.
    ///
    /// The committed amount is clamped to available cash; no leverage. When
    /// investable cash is zero (or the resulting quantity would be zero) the
    /// entry is silently skipped and `Ok(None)` is returned — not an error,
    /// just no fill.
    pub fn open(
        &mut self,
        symbol: &str,
        date: NaiveDate,
        entry_index: usize,
        price: f64,
        size: EntrySize,
        reason: EntryReason,
    ) -> Result<Option<&Position>, LedgerError> {
        if let Some(existing) = self.positions.get(symbol) {
            return Err(LedgerError::PositionAlreadyOpen {
                symbol: symbol.to_string(),
                entry_date: existing.entry_date,
            });
        }
        if !(price > 0.0 && price.is_finite()) {
            return Err(LedgerError::BadFillPrice {
                symbol: symbol.to_string(),
                price,
            });
        }

        let requested = match size.spec {
            SizeSpec::FixedAmount => size.lot_size * size.lots as f64,
            SizeSpec::CashFraction { fraction } => self.cash * fraction,
        };
        let amount = requested.min(self.cash);
        if amount <= 0.0 {
            return Ok(None);
        }

        let quantity = amount / price;
        self.cash -= amount;
        self.positions.insert(
            symbol.to_string(),
            Position {
                symbol: symbol.to_string(),
                entry_date: date,
                entry_price: price,
                quantity,
                entry_index,
                entry_reason: reason,
            },
        );
        Ok(self.positions.get(symbol))
    }

    /// Close the open position at `price`, realize P&L, and append the
    /// trade. The exit date must be strictly after the entry date.
    pub fn close(
        &mut self,
        symbol: &str,
        date: NaiveDate,
        exit_index: usize,
        price: f64,
        reason: ExitReason,
    ) -> Result<&TradeRecord, LedgerError> {
        let position = match self.positions.get(symbol) {
            Some(p) => p,
            None => {
                return Err(LedgerError::NoOpenPosition {
                    symbol: symbol.to_string(),
                })
            }
        };
        if date <= position.entry_date {
            return Err(LedgerError::ExitNotAfterEntry {
                symbol: symbol.to_string(),
                entry_date: position.entry_date,
                exit_date: date,
            });
        }
        if !(price > 0.0 && price.is_finite()) {
            return Err(LedgerError::BadFillPrice {
                symbol: symbol.to_string(),
                price,
            });
        }

        let position = self.positions.remove(symbol).expect("presence checked");
        let proceeds = position.quantity * price;
        let realized_pnl = position.quantity * (price - position.entry_price);
        self.cash += proceeds;

        self.trades.push(TradeRecord {
            symbol: position.symbol,
            entry_date: position.entry_date,
            entry_price: position.entry_price,
            entry_reason: position.entry_reason,
            exit_date: date,
            exit_price: price,
            exit_reason: reason,
            quantity: position.quantity,
            realized_pnl,
            days_held: exit_index.saturating_sub(position.entry_index),
        });
        Ok(self.trades.last().expect("just pushed"))
    }

    /// Total portfolio value: cash plus every open position marked at the
    /// supplied prices. A symbol absent from `price_by_symbol` marks at its
    /// last known (entry) price.
    pub fn mark_to_market(&self, price_by_symbol: &HashMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .map(|p| {
                let price = price_by_symbol
                    .get(&p.symbol)
                    .copied()
                    .unwrap_or(p.entry_price);
                p.market_value(price)
            })
            .sum();
        self.cash + position_value
    }

    /// Single-symbol convenience for the per-symbol simulator loop.
    pub fn mark_single(&self, symbol: &str, price: f64) -> f64 {
        let position_value = self
            .positions
            .get(symbol)
            .map(|p| p.market_value(price))
            .unwrap_or(0.0);
        self.cash + position_value
    }
}
