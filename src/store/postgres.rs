use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::error::CoreError;
use crate::ids::{BetId, EventId, UserId};
use crate::models::{Bet, Event, EventOption, Matched, NewTransaction, QueueEntry, Transaction as LedgerTx};

use super::locks::{event_lock_key, user_lock_key};
use super::{Balance, NewBet, Store};

/// Every field `bet_update` persists. Admission's sell path decrements a
/// parent's `reward_amount_used`, cancellation decrements both `quantity`
/// and `reward_amount_used`, and the matching/liquidity/resolver workers
/// all write `profit`/`platform_commission` through this same call -- any
/// column dropped from this statement silently discards that mutation on
/// a real database while `MemoryStore` (which persists the whole `Bet`
/// clone) keeps passing, so the column list is named here and checked by
/// `bet_update_sql_persists_every_mutable_field` below.
const BET_UPDATE_SQL: &str = r#"
    UPDATE bets SET
        quantity = $2, unmatched_quantity = $3, reward_amount_used = $4,
        sold_quantity = $5, profit = $6, platform_commission = $7,
        updated_at = $8
    WHERE id = $1
"#;

/// Postgres-backed [`Store`]. `Transaction<'static, Postgres>` is obtained
/// by beginning on an owned, cheaply-cloned `PgPool`, so a unit of work can
/// outlive the call that created it -- workers hold one across several
/// store calls before committing.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Tx, CoreError> {
        Ok(self.pool.clone().begin().await?)
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), CoreError> {
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), CoreError> {
        tx.rollback().await?;
        Ok(())
    }

    async fn try_lock_user(&self, tx: &mut Self::Tx, user_id: &UserId) -> Result<bool, CoreError> {
        let key = user_lock_key(user_id.as_str());
        let acquired: (bool,) = sqlx::query_as("SELECT pg_try_advisory_xact_lock($1)")
            .bind(key)
            .fetch_one(&mut **tx)
            .await?;
        debug!(user_id = %user_id, acquired = acquired.0, "user lock attempt");
        Ok(acquired.0)
    }

    async fn lock_event(&self, tx: &mut Self::Tx, event_id: &EventId) -> Result<(), CoreError> {
        let key = event_lock_key(event_id.as_str());
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(key)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn event_get(&self, tx: &mut Self::Tx, event_id: &EventId) -> Result<Option<Event>, CoreError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(event)
    }

    async fn event_list_unresolved(&self, tx: &mut Self::Tx) -> Result<Vec<Event>, CoreError> {
        let events = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE resolved = false")
            .fetch_all(&mut **tx)
            .await?;
        Ok(events)
    }

    async fn event_update(&self, tx: &mut Self::Tx, event: &Event) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            UPDATE events SET
                status = $2, frozen = $3, option_won = $4, resolved = $5,
                resolved_at = $6, platform_liquidity_left = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(&event.id)
        .bind(event.status)
        .bind(event.frozen)
        .bind(event.option_won)
        .bind(event.resolved)
        .bind(event.resolved_at)
        .bind(event.platform_liquidity_left)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO event_status_log (event_id, status, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&event.id)
        .bind(event.status)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn event_update_liquidity(&self, tx: &mut Self::Tx, event_id: &EventId, platform_liquidity_left: rust_decimal::Decimal) -> Result<(), CoreError> {
        sqlx::query("UPDATE events SET platform_liquidity_left = $2, updated_at = $3 WHERE id = $1")
            .bind(event_id)
            .bind(platform_liquidity_left)
            .bind(Utc::now())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn option_list_by_event(&self, tx: &mut Self::Tx, event_id: &EventId) -> Result<Vec<EventOption>, CoreError> {
        let options = sqlx::query_as::<_, EventOption>("SELECT * FROM event_options WHERE event_id = $1")
            .bind(event_id)
            .fetch_all(&mut **tx)
            .await?;
        Ok(options)
    }

    async fn option_get(&self, tx: &mut Self::Tx, event_id: &EventId, option_id: i32) -> Result<Option<EventOption>, CoreError> {
        let option = sqlx::query_as::<_, EventOption>(
            "SELECT * FROM event_options WHERE event_id = $1 AND id = $2",
        )
        .bind(event_id)
        .bind(option_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(option)
    }

    async fn bet_insert(&self, tx: &mut Self::Tx, bet: NewBet) -> Result<Bet, CoreError> {
        let id = BetId::new();
        let now = Utc::now();
        let row = sqlx::query_as::<_, Bet>(
            r#"
            INSERT INTO bets (
                id, event_id, user_id, option_id, bet_type, quantity,
                price_per_quantity, unmatched_quantity, reward_amount_used,
                sold_quantity, buy_bet_id, buy_bet_price_per_quantity,
                limit_order, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&bet.event_id)
        .bind(&bet.user_id)
        .bind(bet.option_id)
        .bind(bet.r#type)
        .bind(bet.quantity)
        .bind(bet.price_per_quantity)
        .bind(bet.unmatched_quantity)
        .bind(bet.reward_amount_used)
        .bind(bet.sold_quantity)
        .bind(&bet.buy_bet_id)
        .bind(bet.buy_bet_price_per_quantity)
        .bind(bet.limit_order)
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }

    async fn bet_get(&self, tx: &mut Self::Tx, bet_id: &BetId) -> Result<Option<Bet>, CoreError> {
        let bet = sqlx::query_as::<_, Bet>("SELECT * FROM bets WHERE id = $1")
            .bind(bet_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(bet)
    }

    async fn bet_update(&self, tx: &mut Self::Tx, bet: &Bet) -> Result<(), CoreError> {
        sqlx::query(BET_UPDATE_SQL)
            .bind(&bet.id)
            .bind(bet.quantity)
            .bind(bet.unmatched_quantity)
            .bind(bet.reward_amount_used)
            .bind(bet.sold_quantity)
            .bind(bet.profit)
            .bind(bet.platform_commission)
            .bind(Utc::now())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn bet_list_by_event(&self, tx: &mut Self::Tx, event_id: &EventId) -> Result<Vec<Bet>, CoreError> {
        let bets = sqlx::query_as::<_, Bet>("SELECT * FROM bets WHERE event_id = $1")
            .bind(event_id)
            .fetch_all(&mut **tx)
            .await?;
        Ok(bets)
    }

    async fn bet_list_aging(&self, tx: &mut Self::Tx, cutoff: DateTime<Utc>) -> Result<Vec<Bet>, CoreError> {
        let bets = sqlx::query_as::<_, Bet>(
            r#"
            SELECT * FROM bets
            WHERE user_id IS NOT NULL AND unmatched_quantity > 0 AND updated_at < $1
            "#,
        )
        .bind(cutoff)
        .fetch_all(&mut **tx)
        .await?;
        Ok(bets)
    }

    async fn bet_list_by_user(&self, tx: &mut Self::Tx, user_id: &UserId, page: i64, limit: i64) -> Result<Vec<Bet>, CoreError> {
        let offset = page.max(0) * limit.max(0);
        let bets = sqlx::query_as::<_, Bet>(
            "SELECT * FROM bets WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut **tx)
        .await?;
        Ok(bets)
    }

    async fn matched_insert_batch(&self, tx: &mut Self::Tx, rows: &[Matched]) -> Result<(), CoreError> {
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO matched (bet_id, matched_bet_id, quantity, liquidity_used, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&row.bet_id)
            .bind(&row.matched_bet_id)
            .bind(row.quantity)
            .bind(row.liquidity_used)
            .bind(row.created_at)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn queue_insert(&self, tx: &mut Self::Tx, entry: QueueEntry) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO bet_queue (bet_id, event_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (bet_id) DO NOTHING
            "#,
        )
        .bind(&entry.bet_id)
        .bind(&entry.event_id)
        .bind(entry.created_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn queue_delete(&self, tx: &mut Self::Tx, bet_id: &BetId) -> Result<(), CoreError> {
        sqlx::query("DELETE FROM bet_queue WHERE bet_id = $1")
            .bind(bet_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn queue_scan_ordered(&self, tx: &mut Self::Tx, limit: i64) -> Result<Vec<QueueEntry>, CoreError> {
        let rows = sqlx::query_as::<_, QueueEntry>(
            "SELECT * FROM bet_queue ORDER BY created_at ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows)
    }

    async fn transaction_insert(&self, tx: &mut Self::Tx, row: NewTransaction) -> Result<LedgerTx, CoreError> {
        let inserted = sqlx::query_as::<_, LedgerTx>(
            r#"
            INSERT INTO transactions (
                user_id, amount, reward_amount, tx_for, tx_status,
                bet_id, bet_quantity, token, chain, created_at
            ) VALUES ($1, $2, $3, $4, 'completed', $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&row.user_id)
        .bind(row.amount)
        .bind(row.reward_amount)
        .bind(row.tx_for)
        .bind(&row.bet_id)
        .bind(row.bet_quantity)
        .bind(&row.token)
        .bind(&row.chain)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;
        Ok(inserted)
    }

    async fn transaction_insert_batch(&self, tx: &mut Self::Tx, rows: Vec<NewTransaction>) -> Result<Vec<LedgerTx>, CoreError> {
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            inserted.push(self.transaction_insert(tx, row).await?);
        }
        Ok(inserted)
    }

    async fn balance_get(&self, tx: &mut Self::Tx, user_id: &UserId, token: &str, chain: &str) -> Result<Balance, CoreError> {
        let row: Option<(rust_decimal::Decimal, rust_decimal::Decimal)> = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(reward_amount), 0) AS reward,
                COALESCE(SUM(amount), 0) AS main
            FROM transactions
            WHERE user_id = $1 AND token = $2 AND chain = $3
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(chain)
        .fetch_optional(&mut **tx)
        .await?;

        let (reward, main) = row.unwrap_or_default();
        Ok(Balance { reward, main })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every field admission, cancellation, matching, or the resolver
    /// mutates on a `Bet` before calling `bet_update` must appear on the
    /// left-hand side of `BET_UPDATE_SQL`'s `SET` clause -- a column
    /// dropped here silently discards that mutation against a real
    /// database even though `MemoryStore` (which persists the whole `Bet`
    /// clone) would still pass every other test.
    #[test]
    fn bet_update_sql_persists_every_mutable_field() {
        for column in [
            "quantity",
            "unmatched_quantity",
            "reward_amount_used",
            "sold_quantity",
            "profit",
            "platform_commission",
        ] {
            assert!(
                BET_UPDATE_SQL.contains(&format!("{column} = ")),
                "bet_update's SQL is missing an assignment for `{column}`"
            );
        }
    }
}
