use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use crate::ids::{BetId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tx_for", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TxFor {
    Bet,
    BetCancel,
    BetWin,
}

impl fmt::Display for TxFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxFor::Bet => write!(f, "bet"),
            TxFor::BetCancel => write!(f, "bet_cancel"),
            TxFor::BetWin => write!(f, "bet_win"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tx_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Completed,
    Failed,
}

/// An append-only ledger row. Compensation is a new row with an inverse
/// sign, never an update to an existing one (spec §9).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: i64,
    pub user_id: UserId,
    pub amount: Decimal,
    pub reward_amount: Decimal,
    pub tx_for: TxFor,
    pub tx_status: TxStatus,
    pub bet_id: Option<BetId>,
    pub bet_quantity: Option<i64>,
    pub token: String,
    pub chain: String,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a new ledger row; `id`/`created_at` are assigned
/// by the store.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub amount: Decimal,
    pub reward_amount: Decimal,
    pub tx_for: TxFor,
    pub bet_id: Option<BetId>,
    pub bet_quantity: Option<i64>,
    pub token: String,
    pub chain: String,
}
