//! The transactional store abstraction.
//!
//! Every state-changing workflow (admission, cancellation, matching,
//! liquidity synthesis, event transitions, resolution) runs inside one
//! [`Store::Tx`]: a single database transaction that also carries the
//! lifetime of any advisory locks taken within it. Nothing committed by
//! one `Tx` is visible to another until [`Store::commit`] runs, and the
//! two lock primitives (`try_lock_user`, `lock_event`) are scoped to the
//! same transaction -- both are released automatically on commit or
//! rollback.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::CoreError;
use crate::ids::{BetId, EventId, UserId};
use crate::models::{Bet, BetType, Event, EventOption, Matched, NewTransaction, QueueEntry, Transaction};

pub mod locks;
pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A user's available balance for a single `(token, chain)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balance {
    pub reward: Decimal,
    pub main: Decimal,
}

/// Fields needed to insert a new bet; `id`, `created_at`, `updated_at` are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewBet {
    pub event_id: EventId,
    pub user_id: Option<UserId>,
    pub option_id: i32,
    pub r#type: BetType,
    pub quantity: i64,
    pub price_per_quantity: Decimal,
    pub unmatched_quantity: i64,
    pub reward_amount_used: Decimal,
    pub sold_quantity: Option<i64>,
    pub buy_bet_id: Option<BetId>,
    pub buy_bet_price_per_quantity: Option<Decimal>,
    pub limit_order: bool,
}

/// Typed CRUD over events, options, bets, matched pairs, transactions, and
/// the bet queue, plus the two per-transaction advisory locks. Implemented
/// by [`PgStore`] against a real database and by [`MemoryStore`] for
/// database-free unit and scenario tests.
#[async_trait]
pub trait Store: Send + Sync {
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx, CoreError>;
    async fn commit(&self, tx: Self::Tx) -> Result<(), CoreError>;
    async fn rollback(&self, tx: Self::Tx) -> Result<(), CoreError>;

    /// Non-blocking. Returns `false` if another transaction already holds
    /// the lock for this user; the caller should surface `RATE_LIMIT`.
    async fn try_lock_user(&self, tx: &mut Self::Tx, user_id: &UserId) -> Result<bool, CoreError>;

    /// Blocking; waits for any competing transaction touching this event to
    /// release the lock before returning.
    async fn lock_event(&self, tx: &mut Self::Tx, event_id: &EventId) -> Result<(), CoreError>;

    async fn event_get(&self, tx: &mut Self::Tx, event_id: &EventId) -> Result<Option<Event>, CoreError>;

    /// Events not yet resolved, for the state and resolver workers to scan.
    async fn event_list_unresolved(&self, tx: &mut Self::Tx) -> Result<Vec<Event>, CoreError>;

    /// Persists the full row and appends a status-log entry in the same
    /// transaction.
    async fn event_update(&self, tx: &mut Self::Tx, event: &Event) -> Result<(), CoreError>;

    /// Adjusts only `platformLiquidityLeft`, without touching `status` and
    /// so without appending a status-log row -- the liquidity engine's own
    /// write path.
    async fn event_update_liquidity(&self, tx: &mut Self::Tx, event_id: &EventId, platform_liquidity_left: Decimal) -> Result<(), CoreError>;

    async fn option_list_by_event(&self, tx: &mut Self::Tx, event_id: &EventId) -> Result<Vec<EventOption>, CoreError>;

    async fn option_get(&self, tx: &mut Self::Tx, event_id: &EventId, option_id: i32) -> Result<Option<EventOption>, CoreError>;

    async fn bet_insert(&self, tx: &mut Self::Tx, bet: NewBet) -> Result<Bet, CoreError>;

    async fn bet_get(&self, tx: &mut Self::Tx, bet_id: &BetId) -> Result<Option<Bet>, CoreError>;

    async fn bet_update(&self, tx: &mut Self::Tx, bet: &Bet) -> Result<(), CoreError>;

    /// Persists several bets in the same transaction. The default
    /// implementation loops `bet_update`; a real deployment would collapse
    /// this into one values-join statement (spec §9).
    async fn bet_update_batch(&self, tx: &mut Self::Tx, bets: &[Bet]) -> Result<(), CoreError> {
        for bet in bets {
            self.bet_update(tx, bet).await?;
        }
        Ok(())
    }

    /// All bets on an event, any option/type/status. The matching worker
    /// filters this for candidates; the resolver filters it for residual
    /// open interest and winning/losing buys.
    async fn bet_list_by_event(&self, tx: &mut Self::Tx, event_id: &EventId) -> Result<Vec<Bet>, CoreError>;

    /// User-owned, unmatched bets across all events last updated before
    /// `cutoff` -- the liquidity engine's aging scan.
    async fn bet_list_aging(&self, tx: &mut Self::Tx, cutoff: DateTime<Utc>) -> Result<Vec<Bet>, CoreError>;

    /// A user's bets, newest first, for the `listBets` API surface.
    async fn bet_list_by_user(&self, tx: &mut Self::Tx, user_id: &UserId, page: i64, limit: i64) -> Result<Vec<Bet>, CoreError>;

    async fn matched_insert_batch(&self, tx: &mut Self::Tx, rows: &[Matched]) -> Result<(), CoreError>;

    async fn queue_insert(&self, tx: &mut Self::Tx, entry: QueueEntry) -> Result<(), CoreError>;

    async fn queue_delete(&self, tx: &mut Self::Tx, bet_id: &BetId) -> Result<(), CoreError>;

    /// Oldest-first, for FIFO dequeuing by the matching worker.
    async fn queue_scan_ordered(&self, tx: &mut Self::Tx, limit: i64) -> Result<Vec<QueueEntry>, CoreError>;

    async fn transaction_insert(&self, tx: &mut Self::Tx, row: NewTransaction) -> Result<Transaction, CoreError>;

    async fn transaction_insert_batch(&self, tx: &mut Self::Tx, rows: Vec<NewTransaction>) -> Result<Vec<Transaction>, CoreError>;

    async fn balance_get(&self, tx: &mut Self::Tx, user_id: &UserId, token: &str, chain: &str) -> Result<Balance, CoreError>;
}
