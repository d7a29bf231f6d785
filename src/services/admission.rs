//! Order admission (`placeBet`): spec §4.2.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::error::CoreError;
use crate::ids::{BetId, EventId, UserId};
use crate::metrics;
use crate::models::{Bet, BetType, EventStatus, NewTransaction, QueueEntry, TxFor};
use crate::money;
use crate::store::{NewBet, Store};
use crate::wallet::Wallet;

#[derive(Debug, Clone)]
pub struct PlaceBetInput {
    pub user_id: UserId,
    pub event_id: EventId,
    pub option_id: i32,
    pub r#type: BetType,
    pub quantity: i64,
    pub price: Decimal,
    pub buy_bet_id: Option<BetId>,
}

pub async fn place_bet<S: Store>(store: &S, input: PlaceBetInput) -> Result<Bet, CoreError> {
    if input.quantity < 1 {
        return Err(CoreError::InvalidArgument("quantity must be >= 1".into()));
    }
    if input.price <= Decimal::ZERO {
        return Err(CoreError::InvalidArgument("price must be > 0".into()));
    }

    let timer = metrics::Timer::new();
    let wallet = Wallet::new(store);
    let mut tx = store.begin().await?;

    if !store.try_lock_user(&mut tx, &input.user_id).await? {
        store.rollback(tx).await?;
        return Err(CoreError::RateLimit);
    }

    let bet_type = input.r#type;
    let result = place_bet_locked(store, &wallet, &mut tx, &input).await;
    match result {
        Ok(bet) => {
            store.commit(tx).await?;
            metrics::record_bet_placed(&bet_type.to_string(), timer.elapsed_secs());
            Ok(bet)
        }
        Err(err) => {
            store.rollback(tx).await?;
            Err(err)
        }
    }
}

async fn place_bet_locked<S: Store>(
    store: &S,
    wallet: &Wallet<'_, S>,
    tx: &mut S::Tx,
    input: &PlaceBetInput,
) -> Result<Bet, CoreError> {
    let event = store
        .event_get(tx, &input.event_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("event {}", input.event_id)))?;

    let option = store
        .option_get(tx, &input.event_id, input.option_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("option {} on event {}", input.option_id, input.event_id)))?;

    let siblings = store.option_list_by_event(tx, &input.event_id).await?;
    if !siblings.iter().any(|o| o.id != option.id) {
        return Err(CoreError::InvalidArgument("event has no sibling option".into()));
    }

    if event.status != EventStatus::Live || event.frozen {
        return Err(CoreError::InvalidState("event is not live".into()));
    }
    if input.price > event.win_price {
        return Err(CoreError::InvalidArgument("price exceeds win price".into()));
    }

    let total = money::total_price(input.quantity, input.price);

    match input.r#type {
        BetType::Buy => {
            let balance = wallet.balance(tx, &input.user_id, &event.token, &event.chain).await?;
            if balance.reward + balance.main < total {
                return Err(CoreError::InsufficientFunds);
            }
            let reward_used = total.min(balance.reward);
            let main_used = total - reward_used;

            let bet = store
                .bet_insert(
                    tx,
                    NewBet {
                        event_id: input.event_id.clone(),
                        user_id: Some(input.user_id.clone()),
                        option_id: input.option_id,
                        r#type: BetType::Buy,
                        quantity: input.quantity,
                        price_per_quantity: input.price,
                        unmatched_quantity: input.quantity,
                        reward_amount_used: reward_used,
                        sold_quantity: Some(0),
                        buy_bet_id: None,
                        buy_bet_price_per_quantity: None,
                        limit_order: true,
                    },
                )
                .await?;

            wallet
                .record(
                    tx,
                    NewTransaction {
                        user_id: input.user_id.clone(),
                        amount: -main_used,
                        reward_amount: -reward_used,
                        tx_for: TxFor::Bet,
                        bet_id: Some(bet.id.clone()),
                        bet_quantity: Some(input.quantity),
                        token: event.token.clone(),
                        chain: event.chain.clone(),
                    },
                )
                .await?;

            store
                .queue_insert(
                    tx,
                    QueueEntry {
                        bet_id: bet.id.clone(),
                        event_id: bet.event_id.clone(),
                        created_at: Utc::now(),
                    },
                )
                .await?;

            Ok(bet)
        }
        BetType::Sell => {
            let buy_bet_id = input
                .buy_bet_id
                .clone()
                .ok_or_else(|| CoreError::InvalidArgument("sell requires buyBetId".into()))?;

            let mut parent = store
                .bet_get(tx, &buy_bet_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("bet {}", buy_bet_id)))?;

            if parent.user_id.as_ref() != Some(&input.user_id)
                || parent.event_id != input.event_id
                || parent.option_id != input.option_id
            {
                return Err(CoreError::InvalidArgument("sell does not match its parent buy".into()));
            }

            let sellable = parent.sellable_quantity();
            if input.quantity > sellable {
                return Err(CoreError::InvalidArgument("sell quantity exceeds sellable amount".into()));
            }

            let child_reward = total.min(parent.reward_amount_used);
            parent.reward_amount_used -= child_reward;
            parent.sold_quantity = Some(parent.sold_quantity.unwrap_or(0) + input.quantity);
            store.bet_update(tx, &parent).await?;

            let bet = store
                .bet_insert(
                    tx,
                    NewBet {
                        event_id: input.event_id.clone(),
                        user_id: Some(input.user_id.clone()),
                        option_id: input.option_id,
                        r#type: BetType::Sell,
                        quantity: input.quantity,
                        price_per_quantity: input.price,
                        unmatched_quantity: input.quantity,
                        reward_amount_used: child_reward,
                        sold_quantity: None,
                        buy_bet_id: Some(parent.id.clone()),
                        buy_bet_price_per_quantity: Some(parent.price_per_quantity),
                        limit_order: true,
                    },
                )
                .await?;

            store
                .queue_insert(
                    tx,
                    QueueEntry {
                        bet_id: bet.id.clone(),
                        event_id: bet.event_id.clone(),
                        created_at: Utc::now(),
                    },
                )
                .await?;

            Ok(bet)
        }
    }
}
