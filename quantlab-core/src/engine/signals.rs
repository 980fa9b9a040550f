//! Entry and exit predicates over a single snapshot.
//!
//! Pure functions of (snapshot, parameters). Missing or non-finite inputs
//! make a condition false; nothing here can panic or divide by zero.

use crate::domain::{EntryReason, ExitReason, IndicatorSnapshot, Position};
use crate::params::ParameterSet;

/// Evaluate the entry branches in order; the first match names the entry.
///
/// 1. Reversal: upward band cross out of a depressed position, with the
///    day's change above the configured floor.
/// 2. Inflow: main-capital inflow while the price sits low in the band.
pub fn entry_signal(snap: &IndicatorSnapshot, params: &ParameterSet) -> Option<EntryReason> {
    let price_position = snap.price_position?;
    let prev_price_position = snap.prev_price_position?;
    let pct_chg = snap.pct_chg?;
    let main_net_rate = snap.main_net_rate?;
    let reversal_cross = snap.reversal_cross?;

    if reversal_cross == 1
        && prev_price_position <= params.entry_position_max
        && pct_chg >= params.entry_pct_chg_min
    {
        return Some(EntryReason::Reversal);
    }
    if main_net_rate >= params.entry_net_rate_min && price_position <= params.entry_position_max {
        return Some(EntryReason::Inflow);
    }
    None
}

/// Evaluate the exit rules in order; the first firing rule is recorded.
///
/// All rules are gated by the caller on the minimum hold period. `days_held`
/// is the trading-day count since entry. MaxHold fires regardless of signal
/// state once the horizon is reached; Signal and StopLoss need their
/// indicator inputs present.
pub fn exit_signal(
    snap: &IndicatorSnapshot,
    position: &Position,
    days_held: usize,
    params: &ParameterSet,
) -> Option<ExitReason> {
    if let Some(price_position) = snap.price_position {
        if price_position.is_finite() && price_position >= params.exit_position_min {
            return Some(ExitReason::Signal);
        }
    }
    if position.return_frac(snap.close) <= -params.stop_loss_pct {
        return Some(ExitReason::StopLoss);
    }
    if days_held >= params.max_hold_days as usize {
        return Some(ExitReason::MaxHold);
    }
    None
}
