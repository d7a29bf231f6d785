//! Fixed-scale decimal money helpers
//!
//! Every price and balance in the core is a `rust_decimal::Decimal` -- never
//! a float. Multiplication and division that must settle on a fixed number
//! of places round half-to-even (banker's rounding), matching spec §9's
//! design note and avoiding the systematic upward bias plain half-up
//! rounding would introduce across millions of fills.

use rust_decimal::{Decimal, RoundingStrategy};

/// Scale used for all money amounts persisted to the ledger and bet tables.
pub const MONEY_SCALE: u32 = 8;

pub fn round(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven)
}

pub fn mul(a: Decimal, b: Decimal) -> Decimal {
    round(a * b)
}

pub fn div(a: Decimal, b: Decimal) -> Option<Decimal> {
    if b.is_zero() {
        return None;
    }
    Some(round(a / b))
}

/// `quantity * price_per_quantity`, the total price of an order.
pub fn total_price(quantity: i64, price_per_quantity: Decimal) -> Decimal {
    mul(Decimal::from(quantity), price_per_quantity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_to_even() {
        let half_up_case = dec!(2.125);
        let rounded = half_up_case.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        assert_eq!(rounded, dec!(2.12));
    }

    #[test]
    fn total_price_multiplies_quantity_and_price() {
        assert_eq!(total_price(10, dec!(1.5)), dec!(15));
    }

    #[test]
    fn div_by_zero_is_none() {
        assert_eq!(div(dec!(10), dec!(0)), None);
    }
}
