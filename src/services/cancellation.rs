//! Cancellation (`cancelBet`): spec §4.3. Also called by the resolver
//! (§4.8) to cancel residual open interest on a completed event, under the
//! event lock the resolver already holds.

use rust_decimal::Decimal;

use crate::error::CoreError;
use crate::ids::{BetId, EventId, UserId};
use crate::metrics;
use crate::models::{Bet, BetType, Event, NewTransaction, TxFor};
use crate::money;
use crate::services::payout;
use crate::store::Store;
use crate::wallet::Wallet;

#[derive(Debug, Clone)]
pub struct CancelBetInput {
    pub user_id: UserId,
    pub bet_id: BetId,
    pub event_id: EventId,
    pub quantity: i64,
}

pub async fn cancel_bet<S: Store>(store: &S, input: CancelBetInput) -> Result<Bet, CoreError> {
    let wallet = Wallet::new(store);
    let mut tx = store.begin().await?;

    if !store.try_lock_user(&mut tx, &input.user_id).await? {
        store.rollback(tx).await?;
        return Err(CoreError::RateLimit);
    }
    store.lock_event(&mut tx, &input.event_id).await?;

    let result = cancel_bet_locked(store, &wallet, &mut tx, &input).await;
    match result {
        Ok(bet) => {
            store.commit(tx).await?;
            metrics::record_bet_cancelled(&bet.r#type.to_string());
            Ok(bet)
        }
        Err(err) => {
            store.rollback(tx).await?;
            Err(err)
        }
    }
}

async fn cancel_bet_locked<S: Store>(
    store: &S,
    wallet: &Wallet<'_, S>,
    tx: &mut S::Tx,
    input: &CancelBetInput,
) -> Result<Bet, CoreError> {
    let mut bet = store
        .bet_get(tx, &input.bet_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("bet {}", input.bet_id)))?;
    let event = store
        .event_get(tx, &input.event_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("event {}", input.event_id)))?;

    if input.quantity > bet.unmatched_quantity {
        return Err(CoreError::InvalidArgument("cancel quantity exceeds unmatched quantity".into()));
    }

    apply_cancellation(store, wallet, tx, &mut bet, &event, input.quantity).await?;
    Ok(bet)
}

/// Core of a cancellation, reusable by the resolver (§4.8) for residual
/// open interest once it already holds the event lock and has `bet` and
/// `event` in hand. `bet` is mutated and persisted in place.
pub async fn apply_cancellation<S: Store>(
    store: &S,
    wallet: &Wallet<'_, S>,
    tx: &mut S::Tx,
    bet: &mut Bet,
    event: &Event,
    cancel_quantity: i64,
) -> Result<(), CoreError> {
    let (reward_refund, main_refund) = refund_split(bet, cancel_quantity);

    bet.quantity -= cancel_quantity;
    bet.unmatched_quantity -= cancel_quantity;
    bet.reward_amount_used -= reward_refund;
    bet.profit = None;
    bet.platform_commission = None;

    match bet.r#type {
        BetType::Sell => {
            if let Some(buy_bet_id) = bet.buy_bet_id.clone() {
                if let Some(mut parent) = store.bet_get(tx, &buy_bet_id).await? {
                    parent.sold_quantity = Some(parent.sold_quantity.unwrap_or(0) - cancel_quantity);
                    parent.reward_amount_used += reward_refund;
                    store.bet_update(tx, &parent).await?;
                }
            }

            if bet.unmatched_quantity == 0 {
                if bet.quantity > 0 {
                    let settlement = payout::settle(
                        bet.quantity,
                        bet.buy_bet_price_per_quantity.unwrap_or(bet.price_per_quantity),
                        bet.price_per_quantity,
                        event.platform_fees_percentage,
                        bet.reward_amount_used,
                    );
                    bet.profit = Some(settlement.profit);
                    bet.platform_commission = Some(settlement.commission);

                    if let Some(user_id) = bet.user_id.clone() {
                        wallet
                            .record(
                                tx,
                                NewTransaction {
                                    user_id,
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
                } else {
                    bet.profit = Some(Decimal::ZERO);
                    bet.platform_commission = Some(Decimal::ZERO);
                }
            }
        }
        BetType::Buy => {
            if let Some(user_id) = bet.user_id.clone() {
                wallet
                    .record(
                        tx,
                        NewTransaction {
                            user_id,
                            amount: main_refund,
                            reward_amount: reward_refund,
                            tx_for: TxFor::BetCancel,
                            bet_id: Some(bet.id.clone()),
                            bet_quantity: Some(cancel_quantity),
                            token: event.token.clone(),
                            chain: event.chain.clone(),
                        },
                    )
                    .await?;
            }
        }
    }

    store.bet_update(tx, bet).await?;
    Ok(())
}

/// Reward-refunded-last split mirroring admission's reward-first debit.
fn refund_split(bet: &Bet, cancel_quantity: i64) -> (Decimal, Decimal) {
    let total_cancel = money::total_price(cancel_quantity, bet.price_per_quantity);
    let main_used_original = bet.total_price() - bet.reward_amount_used;
    let reward_refund = (total_cancel - main_used_original).max(Decimal::ZERO);
    let main_refund = total_cancel - reward_refund;
    (reward_refund, main_refund)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_buy() -> Bet {
        Bet {
            id: BetId::new(),
            event_id: EventId::new(),
            user_id: Some(UserId::new()),
            option_id: 1,
            r#type: BetType::Buy,
            quantity: 10,
            price_per_quantity: dec!(60),
            unmatched_quantity: 10,
            reward_amount_used: dec!(200),
            sold_quantity: Some(0),
            buy_bet_id: None,
            buy_bet_price_per_quantity: None,
            profit: None,
            platform_commission: None,
            limit_order: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn refund_comes_from_main_before_reward() {
        let bet = sample_buy();
        // total = 600, reward used = 200 so main used = 400.
        // Cancelling 5 units = 300 of value, all from main (still under 400).
        let (reward_refund, main_refund) = refund_split(&bet, 5);
        assert_eq!(reward_refund, dec!(0));
        assert_eq!(main_refund, dec!(300));
    }

    #[test]
    fn refund_spills_into_reward_once_main_is_exhausted() {
        let bet = sample_buy();
        // Cancelling all 10 units = 600 of value; main only covers 400, so
        // 200 must come from reward.
        let (reward_refund, main_refund) = refund_split(&bet, 10);
        assert_eq!(reward_refund, dec!(200));
        assert_eq!(main_refund, dec!(400));
    }
}
