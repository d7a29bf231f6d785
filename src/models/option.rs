use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::ids::EventId;

/// One of the two outcomes of an event. `price = win_price * odds / 100`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventOption {
    pub id: i32,
    pub event_id: EventId,
    pub name: String,
    pub odds: Decimal,
}

impl EventOption {
    pub fn price(&self, win_price: Decimal) -> Decimal {
        crate::money::div(win_price * self.odds, Decimal::from(100)).unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_is_win_price_times_odds_over_100() {
        let option = EventOption {
            id: 1,
            event_id: EventId::new(),
            name: "Yes".into(),
            odds: dec!(60),
        };
        assert_eq!(option.price(dec!(100)), dec!(60));
    }
}
