//! Resolver: spec §4.8. Cancels residual open interest on a completed
//! event, then settles winning and losing buys against `winPrice`.

use rust_decimal::Decimal;
use tracing::{debug, error};

use crate::error::CoreError;
use crate::ids::EventId;
use crate::metrics;
use crate::models::{Bet, BetType, EventStatus, NewTransaction, TxFor};
use crate::services::{cancellation, payout};
use crate::store::Store;
use crate::wallet::Wallet;

/// Resolves every completed-but-unresolved event. Returns the number of
/// events resolved on this tick (events with no `optionWon` set are
/// cancelled but not marked resolved, and so are retried every tick until
/// an operator sets a winner).
pub async fn run_tick<S: Store>(store: &S) -> Result<usize, CoreError> {
    let timer = metrics::Timer::new();
    let mut scan_tx = store.begin().await?;
    let candidates: Vec<_> = store
        .event_list_unresolved(&mut scan_tx)
        .await?
        .into_iter()
        .filter(|e| e.status == EventStatus::Completed)
        .map(|e| e.id)
        .collect();
    store.commit(scan_tx).await?;

    let mut resolved = 0;
    for event_id in candidates {
        match resolve_one(store, &event_id).await {
            Ok(true) => resolved += 1,
            Ok(false) => {}
            Err(err) => error!(event_id = %event_id, error = %err, "resolution failed, will retry next cycle"),
        }
    }
    metrics::record_events_resolved(resolved as u64);
    metrics::record_resolver_tick(timer.elapsed_secs());
    Ok(resolved)
}

async fn resolve_one<S: Store>(store: &S, event_id: &EventId) -> Result<bool, CoreError> {
    let wallet = Wallet::new(store);
    let mut tx = store.begin().await?;
    store.lock_event(&mut tx, event_id).await?;

    let mut event = match store.event_get(&mut tx, event_id).await? {
        Some(e) if e.status == EventStatus::Completed && !e.resolved => e,
        _ => {
            store.rollback(tx).await?;
            return Ok(false);
        }
    };

    // 1. Cancel residual open interest: sells first, so parent buys see
    // their sold_quantity and reward restored before their own turn.
    let mut residual: Vec<(crate::ids::BetId, BetType)> = store
        .bet_list_by_event(&mut tx, event_id)
        .await?
        .into_iter()
        .filter(|b| b.unmatched_quantity > 0)
        .map(|b| (b.id, b.r#type))
        .collect();
    residual.sort_by_key(|(_, t)| match t {
        BetType::Sell => 0,
        BetType::Buy => 1,
    });

    for (bet_id, _) in residual {
        if let Some(mut bet) = store.bet_get(&mut tx, &bet_id).await? {
            if bet.unmatched_quantity > 0 {
                let qty = bet.unmatched_quantity;
                cancellation::apply_cancellation(store, &wallet, &mut tx, &mut bet, &event, qty).await?;
            }
        }
    }

    // 2 & 3. Settle the winning option, if one has been set.
    if let Some(option_won) = event.option_won {
        let bets = store.bet_list_by_event(&mut tx, event_id).await?;

        let losing_buys: Vec<Bet> = bets
            .iter()
            .filter(|b| b.r#type == BetType::Buy && b.user_id.is_some() && b.option_id != option_won && b.quantity > 0)
            .cloned()
            .collect();
        for mut bet in losing_buys {
            bet.profit = Some(-(bet.price_per_quantity * Decimal::from(bet.quantity)));
            bet.platform_commission = Some(Decimal::ZERO);
            store.bet_update(&mut tx, &bet).await?;
        }

        let winning_buys: Vec<Bet> = bets
            .iter()
            .filter(|b| b.r#type == BetType::Buy && b.user_id.is_some() && b.option_id == option_won)
            .filter(|b| b.quantity > b.sold_quantity.unwrap_or(0))
            .cloned()
            .collect();

        let mut updated = Vec::with_capacity(winning_buys.len());
        let mut ledger_rows = Vec::with_capacity(winning_buys.len());
        for mut bet in winning_buys {
            let remaining = bet.quantity - bet.sold_quantity.unwrap_or(0);
            let settlement = payout::settle(
                remaining,
                bet.price_per_quantity,
                event.win_price,
                event.platform_fees_percentage,
                bet.reward_amount_used,
            );
            bet.profit = Some(settlement.profit);
            bet.platform_commission = Some(settlement.commission);

            ledger_rows.push(NewTransaction {
                user_id: bet.user_id.clone().unwrap(),
                amount: settlement.cash_out,
                reward_amount: settlement.reward_out,
                tx_for: TxFor::BetWin,
                bet_id: Some(bet.id.clone()),
                bet_quantity: Some(remaining),
                token: event.token.clone(),
                chain: event.chain.clone(),
            });
            updated.push(bet);
        }

        store.bet_update_batch(&mut tx, &updated).await?;
        store.transaction_insert_batch(&mut tx, ledger_rows).await?;

        event.resolved = true;
        event.resolved_at = Some(chrono::Utc::now());
        store.event_update(&mut tx, &event).await?;
    }

    store.commit(tx).await?;
    debug!(event_id = %event.id, resolved = event.resolved, "resolver tick complete");
    Ok(event.resolved)
}
