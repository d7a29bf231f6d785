//! In-memory [`Store`] fake for database-free unit and scenario tests.
//!
//! A single [`tokio::sync::Mutex`] guards all state; `begin` hands out the
//! owned guard as the transaction handle, so only one transaction can be
//! open at a time and both advisory locks always succeed immediately --
//! the coarse mutex already gives every operation the total ordering the
//! real locks provide. `rollback` is a plain drop: writes in this fake are
//! applied as they happen rather than staged, so there is nothing to undo.
//! That is a real divergence from Postgres semantics and is intentional:
//! none of the scenario tests exercise a rolled-back transaction.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::CoreError;
use crate::ids::{BetId, EventId, UserId};
use crate::models::{Bet, Event, EventOption, Matched, NewTransaction, QueueEntry, Transaction, TxStatus};

use super::{Balance, NewBet, Store};

#[derive(Debug, Default)]
pub struct MemoryInner {
    pub events: HashMap<EventId, Event>,
    pub options: HashMap<(EventId, i32), EventOption>,
    pub bets: HashMap<BetId, Bet>,
    pub matched: Vec<Matched>,
    pub queue: Vec<QueueEntry>,
    pub transactions: Vec<Transaction>,
    pub next_tx_id: i64,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner::default())),
        }
    }

    /// Seeds an event directly, bypassing any transaction -- for test setup.
    pub async fn seed_event(&self, event: Event) {
        self.inner.lock().await.events.insert(event.id.clone(), event);
    }

    /// Seeds an option directly, bypassing any transaction -- for test setup.
    pub async fn seed_option(&self, option: EventOption) {
        self.inner
            .lock()
            .await
            .options
            .insert((option.event_id.clone(), option.id), option);
    }

    /// Seeds a bet directly, bypassing any transaction -- for test setup
    /// that needs to control `updated_at` (e.g. backdating for the
    /// liquidity engine's aging scan), which the public `Store` surface
    /// always stamps with the current time.
    pub async fn seed_bet(&self, bet: Bet) {
        self.inner.lock().await.bets.insert(bet.id.clone(), bet);
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = OwnedMutexGuard<MemoryInner>;

    async fn begin(&self) -> Result<Self::Tx, CoreError> {
        Ok(self.inner.clone().lock_owned().await)
    }

    async fn commit(&self, _tx: Self::Tx) -> Result<(), CoreError> {
        Ok(())
    }

    async fn rollback(&self, _tx: Self::Tx) -> Result<(), CoreError> {
        Ok(())
    }

    async fn try_lock_user(&self, _tx: &mut Self::Tx, _user_id: &UserId) -> Result<bool, CoreError> {
        Ok(true)
    }

    async fn lock_event(&self, _tx: &mut Self::Tx, _event_id: &EventId) -> Result<(), CoreError> {
        Ok(())
    }

    async fn event_get(&self, tx: &mut Self::Tx, event_id: &EventId) -> Result<Option<Event>, CoreError> {
        Ok(tx.events.get(event_id).cloned())
    }

    async fn event_list_unresolved(&self, tx: &mut Self::Tx) -> Result<Vec<Event>, CoreError> {
        Ok(tx.events.values().filter(|e| !e.resolved).cloned().collect())
    }

    async fn event_update(&self, tx: &mut Self::Tx, event: &Event) -> Result<(), CoreError> {
        tx.events.insert(event.id.clone(), event.clone());
        Ok(())
    }

    async fn event_update_liquidity(&self, tx: &mut Self::Tx, event_id: &EventId, platform_liquidity_left: rust_decimal::Decimal) -> Result<(), CoreError> {
        if let Some(event) = tx.events.get_mut(event_id) {
            event.platform_liquidity_left = platform_liquidity_left;
            event.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn option_list_by_event(&self, tx: &mut Self::Tx, event_id: &EventId) -> Result<Vec<EventOption>, CoreError> {
        Ok(tx
            .options
            .values()
            .filter(|o| &o.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn option_get(&self, tx: &mut Self::Tx, event_id: &EventId, option_id: i32) -> Result<Option<EventOption>, CoreError> {
        Ok(tx.options.get(&(event_id.clone(), option_id)).cloned())
    }

    async fn bet_insert(&self, tx: &mut Self::Tx, bet: NewBet) -> Result<Bet, CoreError> {
        let now = Utc::now();
        let row = Bet {
            id: BetId::new(),
            event_id: bet.event_id,
            user_id: bet.user_id,
            option_id: bet.option_id,
            r#type: bet.r#type,
            quantity: bet.quantity,
            price_per_quantity: bet.price_per_quantity,
            unmatched_quantity: bet.unmatched_quantity,
            reward_amount_used: bet.reward_amount_used,
            sold_quantity: bet.sold_quantity,
            buy_bet_id: bet.buy_bet_id,
            buy_bet_price_per_quantity: bet.buy_bet_price_per_quantity,
            profit: None,
            platform_commission: None,
            limit_order: bet.limit_order,
            created_at: now,
            updated_at: now,
        };
        tx.bets.insert(row.id.clone(), row.clone());
        Ok(row)
    }

    async fn bet_get(&self, tx: &mut Self::Tx, bet_id: &BetId) -> Result<Option<Bet>, CoreError> {
        Ok(tx.bets.get(bet_id).cloned())
    }

    async fn bet_update(&self, tx: &mut Self::Tx, bet: &Bet) -> Result<(), CoreError> {
        let mut updated = bet.clone();
        updated.updated_at = Utc::now();
        tx.bets.insert(updated.id.clone(), updated);
        Ok(())
    }

    async fn bet_list_by_event(&self, tx: &mut Self::Tx, event_id: &EventId) -> Result<Vec<Bet>, CoreError> {
        Ok(tx.bets.values().filter(|b| &b.event_id == event_id).cloned().collect())
    }

    async fn bet_list_aging(&self, tx: &mut Self::Tx, cutoff: DateTime<Utc>) -> Result<Vec<Bet>, CoreError> {
        Ok(tx
            .bets
            .values()
            .filter(|b| b.user_id.is_some() && b.unmatched_quantity > 0 && b.updated_at < cutoff)
            .cloned()
            .collect())
    }

    async fn bet_list_by_user(&self, tx: &mut Self::Tx, user_id: &UserId, page: i64, limit: i64) -> Result<Vec<Bet>, CoreError> {
        let mut bets: Vec<Bet> = tx.bets.values().filter(|b| b.user_id.as_ref() == Some(user_id)).cloned().collect();
        bets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let offset = (page.max(0) * limit.max(0)) as usize;
        Ok(bets.into_iter().skip(offset).take(limit.max(0) as usize).collect())
    }

    async fn matched_insert_batch(&self, tx: &mut Self::Tx, rows: &[Matched]) -> Result<(), CoreError> {
        tx.matched.extend_from_slice(rows);
        Ok(())
    }

    async fn queue_insert(&self, tx: &mut Self::Tx, entry: QueueEntry) -> Result<(), CoreError> {
        if !tx.queue.iter().any(|e| e.bet_id == entry.bet_id) {
            tx.queue.push(entry);
        }
        Ok(())
    }

    async fn queue_delete(&self, tx: &mut Self::Tx, bet_id: &BetId) -> Result<(), CoreError> {
        tx.queue.retain(|e| &e.bet_id != bet_id);
        Ok(())
    }

    async fn queue_scan_ordered(&self, tx: &mut Self::Tx, limit: i64) -> Result<Vec<QueueEntry>, CoreError> {
        let mut entries = tx.queue.clone();
        entries.sort_by_key(|e| e.created_at);
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn transaction_insert(&self, tx: &mut Self::Tx, row: NewTransaction) -> Result<Transaction, CoreError> {
        tx.next_tx_id += 1;
        let inserted = Transaction {
            id: tx.next_tx_id,
            user_id: row.user_id,
            amount: row.amount,
            reward_amount: row.reward_amount,
            tx_for: row.tx_for,
            tx_status: TxStatus::Completed,
            bet_id: row.bet_id,
            bet_quantity: row.bet_quantity,
            token: row.token,
            chain: row.chain,
            created_at: Utc::now(),
        };
        tx.transactions.push(inserted.clone());
        Ok(inserted)
    }

    async fn transaction_insert_batch(&self, tx: &mut Self::Tx, rows: Vec<NewTransaction>) -> Result<Vec<Transaction>, CoreError> {
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            inserted.push(self.transaction_insert(tx, row).await?);
        }
        Ok(inserted)
    }

    async fn balance_get(&self, tx: &mut Self::Tx, user_id: &UserId, token: &str, chain: &str) -> Result<Balance, CoreError> {
        let mut balance = Balance::default();
        for t in tx.transactions.iter().filter(|t| &t.user_id == user_id && t.token == token && t.chain == chain) {
            balance.reward += t.reward_amount;
            balance.main += t.amount;
        }
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BetType, EventStatus};
    use rust_decimal_macros::dec;

    fn sample_event() -> Event {
        Event {
            id: EventId::new(),
            name: "Will it rain".into(),
            start_at: Utc::now(),
            end_at: Utc::now(),
            freeze_at: None,
            status: EventStatus::Live,
            frozen: false,
            option_won: None,
            resolved: false,
            resolved_at: None,
            platform_liquidity_left: dec!(1000),
            min_liquidity_percentage: dec!(80),
            max_liquidity_percentage: dec!(120),
            liquidity_in_between: true,
            platform_fees_percentage: dec!(2),
            win_price: dec!(100),
            slippage: dec!(5),
            token: "USDC".into(),
            chain: "polygon".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_bet_round_trips() {
        let store = MemoryStore::new();
        let event = sample_event();
        store.seed_event(event.clone()).await;

        let mut tx = store.begin().await.unwrap();
        let inserted = store
            .bet_insert(
                &mut tx,
                NewBet {
                    event_id: event.id.clone(),
                    user_id: Some(UserId::new()),
                    option_id: 1,
                    r#type: BetType::Buy,
                    quantity: 5,
                    price_per_quantity: dec!(60),
                    unmatched_quantity: 5,
                    reward_amount_used: dec!(0),
                    sold_quantity: Some(0),
                    buy_bet_id: None,
                    buy_bet_price_per_quantity: None,
                    limit_order: true,
                },
            )
            .await
            .unwrap();
        store.commit(tx).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let fetched = store.bet_get(&mut tx, &inserted.id).await.unwrap();
        assert_eq!(fetched.unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn queue_scan_is_oldest_first() {
        let store = MemoryStore::new();
        let event_id = EventId::new();
        let mut tx = store.begin().await.unwrap();

        let older = QueueEntry {
            bet_id: BetId::new(),
            event_id: event_id.clone(),
            created_at: Utc::now() - chrono::Duration::seconds(10),
        };
        let newer = QueueEntry {
            bet_id: BetId::new(),
            event_id: event_id.clone(),
            created_at: Utc::now(),
        };
        store.queue_insert(&mut tx, newer.clone()).await.unwrap();
        store.queue_insert(&mut tx, older.clone()).await.unwrap();

        let scanned = store.queue_scan_ordered(&mut tx, 10).await.unwrap();
        assert_eq!(scanned[0].bet_id, older.bet_id);
        assert_eq!(scanned[1].bet_id, newer.bet_id);
    }
}
