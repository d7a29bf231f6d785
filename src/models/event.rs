use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use crate::ids::EventId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Scheduled,
    Live,
    Completed,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStatus::Scheduled => write!(f, "scheduled"),
            EventStatus::Live => write!(f, "live"),
            EventStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A prediction-market event: two options, a liquidity reserve, and a
/// lifecycle driven by wall-clock time and (eventually) a winning option.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub freeze_at: Option<DateTime<Utc>>,
    pub status: EventStatus,
    pub frozen: bool,
    pub option_won: Option<i32>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub platform_liquidity_left: Decimal,
    pub min_liquidity_percentage: Decimal,
    pub max_liquidity_percentage: Decimal,
    pub liquidity_in_between: bool,
    pub platform_fees_percentage: Decimal,
    pub win_price: Decimal,
    pub slippage: Decimal,
    pub token: String,
    pub chain: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Is `now` within the event's live window and the status not yet
    /// reflecting that, per spec §4.7's transition rule?
    pub fn should_go_live(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_at && now <= self.end_at && self.status != EventStatus::Live
    }

    pub fn should_complete(&self, now: DateTime<Utc>) -> bool {
        self.end_at < now && self.status != EventStatus::Completed
    }

    /// `true` if `price` is in-band under the liquidity engine's policy
    /// (spec §4.6): either the fat tails or the middle, depending on
    /// `liquidity_in_between`.
    pub fn is_liquidity_eligible(&self, price: Decimal) -> bool {
        if self.win_price.is_zero() {
            return false;
        }
        let ratio = price / self.win_price * Decimal::from(100);
        if self.liquidity_in_between {
            ratio >= self.min_liquidity_percentage && ratio <= self.max_liquidity_percentage
        } else {
            ratio <= self.min_liquidity_percentage || ratio >= self.max_liquidity_percentage
        }
    }
}
