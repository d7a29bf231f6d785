use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::ids::BetId;

/// Append-only record of a pairing between two bets (spec §3). Never
/// updated after insertion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Matched {
    pub bet_id: BetId,
    pub matched_bet_id: BetId,
    pub quantity: i64,
    pub liquidity_used: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Matched {
    pub fn new(bet_id: BetId, matched_bet_id: BetId, quantity: i64, liquidity_used: Decimal) -> Self {
        Self {
            bet_id,
            matched_bet_id,
            quantity,
            liquidity_used,
            created_at: Utc::now(),
        }
    }
}
