use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use crate::ids::{BetId, EventId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "bet_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BetType {
    Buy,
    Sell,
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetType::Buy => write!(f, "buy"),
            BetType::Sell => write!(f, "sell"),
        }
    }
}

/// A standing order to buy or sell `quantity` contracts of an option.
///
/// `user_id = None` marks a platform-owned synthetic bet created by the
/// liquidity engine (spec §4.6) -- platform bets never carry a reward
/// balance and never emit ledger rows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bet {
    pub id: BetId,
    pub event_id: EventId,
    pub user_id: Option<UserId>,
    pub option_id: i32,
    #[sqlx(rename = "bet_type")]
    pub r#type: BetType,
    pub quantity: i64,
    pub price_per_quantity: Decimal,
    pub unmatched_quantity: i64,
    pub reward_amount_used: Decimal,
    pub sold_quantity: Option<i64>,
    pub buy_bet_id: Option<BetId>,
    pub buy_bet_price_per_quantity: Option<Decimal>,
    pub profit: Option<Decimal>,
    pub platform_commission: Option<Decimal>,
    pub limit_order: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bet {
    pub fn is_platform_owned(&self) -> bool {
        self.user_id.is_none()
    }

    pub fn total_price(&self) -> Decimal {
        crate::money::total_price(self.quantity, self.price_per_quantity)
    }

    pub fn matched_quantity(&self) -> i64 {
        self.quantity - self.unmatched_quantity
    }

    /// For a sell's parent buy: quantity still available to sell
    /// (`matched - sold`), per spec §3's sell invariant.
    pub fn sellable_quantity(&self) -> i64 {
        self.matched_quantity() - self.sold_quantity.unwrap_or(0)
    }

    pub fn is_fully_matched(&self) -> bool {
        self.unmatched_quantity == 0
    }
}
