//! Shared payout formula for sell realisation and win settlement.
//!
//! One function computes both: a sell fill settles against the sell price,
//! a winning buy settles against `winPrice`. Both produce a bet-level
//! profit/commission pair and a ledger-level cash/reward split.

use rust_decimal::Decimal;

use crate::money;

/// Result of settling `quantity` contracts entered at `entry_price` against
/// `exit_price`, with a fee rate expressed as a percent (e.g. `10` = 10%).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Net profit after commission, attributed to the bet.
    pub profit: Decimal,
    /// Commission actually charged; zero on a loss.
    pub commission: Decimal,
    /// Main-ledger credit for this settlement.
    pub cash_out: Decimal,
    /// Reward-ledger credit for this settlement (mirrors reward spent).
    pub reward_out: Decimal,
}

/// Applies the payout formula (spec §4.5): gross P&L, fee on gains only,
/// and a cash-out net of the reward balance already consumed at entry.
pub fn settle(quantity: i64, entry_price: Decimal, exit_price: Decimal, fee_percent: Decimal, reward_amount_used: Decimal) -> Settlement {
    let qty = Decimal::from(quantity);
    let gross = money::round(qty * exit_price - qty * entry_price);
    let commission = if gross > Decimal::ZERO {
        money::mul(qty * exit_price, fee_percent / Decimal::from(100))
    } else {
        Decimal::ZERO
    };

    let net = gross - commission;
    let profit = if net < Decimal::ZERO { gross } else { net };
    let realised_commission = if profit == gross { Decimal::ZERO } else { commission };

    let cash_out = money::round(qty * exit_price - realised_commission - reward_amount_used);

    Settlement {
        profit,
        commission: realised_commission,
        cash_out,
        reward_out: reward_amount_used,
    }
}
