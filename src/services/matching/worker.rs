//! The matching worker's per-bet tick: spec §4.4 steps 1, 4-6.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::models::{BetType, Matched, NewTransaction, QueueEntry, TxFor};
use crate::services::payout;
use crate::store::Store;
use crate::wallet::Wallet;

use super::candidates::{cumulative_fill_set, eligible_candidates, order_candidates};

/// Processes one queued bet to completion: locks its event, finds and
/// consumes eligible counter-orders, records the pairing, and removes the
/// queue entry. Failures are returned to the caller, which logs and moves
/// on -- the entry stays queued and is retried on the next tick.
pub async fn match_one<S: Store>(store: &S, entry: &QueueEntry) -> Result<(), CoreError> {
    let wallet = Wallet::new(store);
    let mut tx = store.begin().await?;

    let result = match_one_locked(store, &wallet, &mut tx, entry).await;
    match result {
        Ok(()) => {
            store.commit(tx).await?;
            Ok(())
        }
        Err(err) => {
            store.rollback(tx).await?;
            Err(err)
        }
    }
}

async fn match_one_locked<S: Store>(
    store: &S,
    wallet: &Wallet<'_, S>,
    tx: &mut S::Tx,
    entry: &QueueEntry,
) -> Result<(), CoreError> {
    store.lock_event(tx, &entry.event_id).await?;

    let event = match store.event_get(tx, &entry.event_id).await? {
        Some(e) => e,
        None => {
            warn!(event_id = %entry.event_id, "queued bet references a missing event, dropping");
            store.queue_delete(tx, &entry.bet_id).await?;
            return Ok(());
        }
    };

    let mut taker = match store.bet_get(tx, &entry.bet_id).await? {
        Some(b) => b,
        None => {
            store.queue_delete(tx, &entry.bet_id).await?;
            return Ok(());
        }
    };

    if event.status == crate::models::EventStatus::Completed || taker.unmatched_quantity == 0 {
        store.queue_delete(tx, &entry.bet_id).await?;
        return Ok(());
    }

    let pool: Vec<_> = store
        .bet_list_by_event(tx, &entry.event_id)
        .await?
        .into_iter()
        .filter(|b| b.id != taker.id)
        .collect();

    let candidates = eligible_candidates(&taker, &event, &pool);
    let ordered = order_candidates(candidates);
    let selected: Vec<_> = cumulative_fill_set(taker.unmatched_quantity, ordered)
        .into_iter()
        .map(|b| b.id.clone())
        .collect();

    let mut matched_rows = Vec::new();
    let mut updated_candidates = Vec::new();
    let mut remaining = taker.unmatched_quantity;

    for candidate_id in selected {
        if remaining == 0 {
            break;
        }
        let mut candidate = pool.iter().find(|b| b.id == candidate_id).cloned().unwrap();
        let fill = remaining.min(candidate.unmatched_quantity);

        matched_rows.push(Matched::new(taker.id.clone(), candidate.id.clone(), fill, Decimal::ZERO));
        candidate.unmatched_quantity -= fill;
        remaining -= fill;

        if candidate.r#type == BetType::Sell && candidate.user_id.is_some() && candidate.unmatched_quantity == 0 {
            let settlement = payout::settle(
                candidate.quantity,
                candidate.buy_bet_price_per_quantity.unwrap_or(candidate.price_per_quantity),
                candidate.price_per_quantity,
                event.platform_fees_percentage,
                candidate.reward_amount_used,
            );
            candidate.profit = Some(settlement.profit);
            candidate.platform_commission = Some(settlement.commission);

            wallet
                .record(
                    tx,
                    NewTransaction {
                        user_id: candidate.user_id.clone().unwrap(),
                        amount: settlement.cash_out,
                        reward_amount: settlement.reward_out,
                        tx_for: TxFor::Bet,
                        bet_id: Some(candidate.id.clone()),
                        bet_quantity: Some(candidate.quantity),
                        token: event.token.clone(),
                        chain: event.chain.clone(),
                    },
                )
                .await?;
        }

        updated_candidates.push(candidate);
    }

    taker.unmatched_quantity = remaining;

    if taker.r#type == BetType::Sell && taker.user_id.is_some() && taker.unmatched_quantity == 0 {
        let settlement = payout::settle(
            taker.quantity,
            taker.buy_bet_price_per_quantity.unwrap_or(taker.price_per_quantity),
            taker.price_per_quantity,
            event.platform_fees_percentage,
            taker.reward_amount_used,
        );
        taker.profit = Some(settlement.profit);
        taker.platform_commission = Some(settlement.commission);

        wallet
            .record(
                tx,
                NewTransaction {
                    user_id: taker.user_id.clone().unwrap(),
                    amount: settlement.cash_out,
                    reward_amount: settlement.reward_out,
                    tx_for: TxFor::Bet,
                    bet_id: Some(taker.id.clone()),
                    bet_quantity: Some(taker.quantity),
                    token: event.token.clone(),
                    chain: event.chain.clone(),
                },
            )
            .await?;
    }

    if !matched_rows.is_empty() {
        store.matched_insert_batch(tx, &matched_rows).await?;
    }
    store.bet_update_batch(tx, &updated_candidates).await?;
    store.bet_update(tx, &taker).await?;
    store.queue_delete(tx, &entry.bet_id).await?;

    debug!(bet_id = %entry.bet_id, matches = matched_rows.len(), "matching tick complete");
    Ok(())
}
