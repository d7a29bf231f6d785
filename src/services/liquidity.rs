//! The liquidity engine: spec §4.6.

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, error};

use crate::config::AppConfig;
use crate::error::CoreError;
use crate::ids::EventId;
use crate::metrics;
use crate::models::{BetType, Matched, NewTransaction, QueueEntry, TxFor};
use crate::services::payout;
use crate::store::{NewBet, Store};
use crate::wallet::Wallet;

/// Scans aging, in-band, unmatched user bets and synthesizes platform
/// counter-orders for each that still qualifies. Returns the number of
/// bets the engine acted on.
pub async fn run_tick<S: Store>(store: &S, config: &AppConfig) -> Result<usize, CoreError> {
    let timer = metrics::Timer::new();
    let cutoff = Utc::now() - config.liquidity_aging();

    let mut scan_tx = store.begin().await?;
    let aging = store.bet_list_aging(&mut scan_tx, cutoff).await?;
    store.commit(scan_tx).await?;

    let mut acted = 0;
    for bet in aging {
        match synthesize_one(store, &bet.event_id, &bet.id).await {
            Ok(true) => acted += 1,
            Ok(false) => {}
            Err(err) => error!(bet_id = %bet.id, error = %err, "liquidity synthesis failed, will retry next cycle"),
        }
    }
    metrics::record_liquidity_synthesized(acted as u64);
    metrics::record_liquidity_tick(timer.elapsed_secs());
    Ok(acted)
}

async fn synthesize_one<S: Store>(store: &S, event_id: &EventId, bet_id: &crate::ids::BetId) -> Result<bool, CoreError> {
    let wallet = Wallet::new(store);
    let mut tx = store.begin().await?;
    store.lock_event(&mut tx, event_id).await?;

    let mut bet = match store.bet_get(&mut tx, bet_id).await? {
        Some(b) if b.unmatched_quantity > 0 && b.user_id.is_some() => b,
        _ => {
            store.rollback(tx).await?;
            return Ok(false);
        }
    };

    let mut event = match store.event_get(&mut tx, event_id).await? {
        Some(e) => e,
        None => {
            store.rollback(tx).await?;
            return Ok(false);
        }
    };

    if event.status != crate::models::EventStatus::Live || event.frozen || !event.is_liquidity_eligible(bet.price_per_quantity) {
        store.rollback(tx).await?;
        return Ok(false);
    }

    let counter_price = match bet.r#type {
        BetType::Sell => bet.price_per_quantity,
        BetType::Buy => event.win_price - bet.price_per_quantity,
    };
    if counter_price <= Decimal::ZERO {
        store.rollback(tx).await?;
        return Ok(false);
    }

    let affordable = (event.platform_liquidity_left / counter_price).floor();
    let matchable_qty = bet.unmatched_quantity.min(affordable.to_i64().unwrap_or(i64::MAX));
    if matchable_qty <= 0 {
        store.rollback(tx).await?;
        return Ok(false);
    }

    let siblings = store.option_list_by_event(&mut tx, event_id).await?;
    let counterpart_option = siblings
        .iter()
        .find(|o| o.id != bet.option_id)
        .ok_or_else(|| CoreError::Internal("event has no sibling option".into()))?
        .id;

    let synthetic_buy = store
        .bet_insert(
            &mut tx,
            NewBet {
                event_id: event_id.clone(),
                user_id: None,
                option_id: counterpart_option,
                r#type: BetType::Buy,
                quantity: matchable_qty,
                price_per_quantity: counter_price,
                unmatched_quantity: 0,
                reward_amount_used: Decimal::ZERO,
                sold_quantity: Some(matchable_qty),
                buy_bet_id: None,
                buy_bet_price_per_quantity: None,
                limit_order: true,
            },
        )
        .await?;

    store
        .matched_insert_batch(
            &mut tx,
            &[Matched::new(bet.id.clone(), synthetic_buy.id.clone(), matchable_qty, counter_price * Decimal::from(matchable_qty))],
        )
        .await?;

    bet.unmatched_quantity -= matchable_qty;

    if bet.r#type == BetType::Sell && bet.unmatched_quantity == 0 {
        let settlement = payout::settle(
            bet.quantity,
            bet.buy_bet_price_per_quantity.unwrap_or(bet.price_per_quantity),
            bet.price_per_quantity,
            event.platform_fees_percentage,
            bet.reward_amount_used,
        );
        bet.profit = Some(settlement.profit);
        bet.platform_commission = Some(settlement.commission);

        wallet
            .record(
                &mut tx,
                NewTransaction {
                    user_id: bet.user_id.clone().unwrap(),
                    amount: settlement.cash_out,
                    reward_amount: settlement.reward_out,
                    tx_for: TxFor::Bet,
                    bet_id: Some(bet.id.clone()),
                    bet_quantity: Some(bet.quantity),
                    token: event.token.clone(),
                    chain: event.chain.clone(),
                },
            )
            .await?;
    }
    store.bet_update(&mut tx, &bet).await?;

    event.platform_liquidity_left -= counter_price * Decimal::from(matchable_qty);
    store.event_update_liquidity(&mut tx, event_id, event.platform_liquidity_left).await?;
    metrics::set_liquidity_consumed(event_id.as_str(), event.platform_liquidity_left.to_f64().unwrap_or(0.0));

    let mirror_sell = store
        .bet_insert(
            &mut tx,
            NewBet {
                event_id: event_id.clone(),
                user_id: None,
                option_id: counterpart_option,
                r#type: BetType::Sell,
                quantity: matchable_qty,
                price_per_quantity: counter_price,
                unmatched_quantity: matchable_qty,
                reward_amount_used: Decimal::ZERO,
                sold_quantity: None,
                buy_bet_id: Some(synthetic_buy.id.clone()),
                buy_bet_price_per_quantity: Some(counter_price),
                limit_order: true,
            },
        )
        .await?;

    store
        .queue_insert(
            &mut tx,
            QueueEntry {
                bet_id: mirror_sell.id.clone(),
                event_id: event_id.clone(),
                created_at: Utc::now(),
            },
        )
        .await?;

    store.commit(tx).await?;
    debug!(bet_id = %bet.id, matchable_qty, "liquidity engine synthesized counter-order");
    Ok(true)
}
