//! End-to-end scenarios, driven against the in-memory `Store` fake so they
//! run without a live Postgres instance. Each test corresponds to one
//! literal scenario from the testable-properties list: A (cross-side
//! match), B (zero-fee sell settlement), C (fee-bearing sell settlement),
//! D (liquidity synthesis), E (resolver residual cancellation + payout).
//!
//! Scenario F (single-flight admission) is not exercised here: the
//! in-memory fake's `try_lock_user` always succeeds, since its one coarse
//! mutex already gives every operation the total ordering a real advisory
//! lock provides (see `MemoryStore`'s module doc). Verifying two concurrent
//! `place_bet` calls actually race for the same Postgres advisory lock
//! needs a live database and is out of scope for a fake-backed test.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use predictor_core::ids::{EventId, UserId};
use predictor_core::models::{Bet, BetType, Event, EventOption, EventStatus, NewTransaction, TxFor};
use predictor_core::services::{self, admission, matching, resolver, PlaceBetInput};
use predictor_core::store::{MemoryStore, Store};

fn sample_event(win_price: Decimal, slippage: Decimal, fees: Decimal) -> Event {
    Event {
        id: EventId::new(),
        name: "Will it rain".into(),
        start_at: Utc::now() - Duration::minutes(5),
        end_at: Utc::now() + Duration::hours(1),
        freeze_at: None,
        status: EventStatus::Live,
        frozen: false,
        option_won: None,
        resolved: false,
        resolved_at: None,
        platform_liquidity_left: dec!(1000),
        min_liquidity_percentage: dec!(20),
        max_liquidity_percentage: dec!(80),
        liquidity_in_between: false,
        platform_fees_percentage: fees,
        win_price,
        slippage,
        token: "USDC".into(),
        chain: "polygon".into(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

async fn seed_event_with_options(store: &MemoryStore, event: &Event) {
    store.seed_event(event.clone()).await;
    store
        .seed_option(EventOption { id: 1, event_id: event.id.clone(), name: "Yes".into(), odds: dec!(60) })
        .await;
    store
        .seed_option(EventOption { id: 2, event_id: event.id.clone(), name: "No".into(), odds: dec!(40) })
        .await;
}

/// Credits a user's main balance directly, bypassing admission -- test
/// setup only, since `place_bet` is the only production path that debits.
async fn fund(store: &MemoryStore, user_id: &UserId, event: &Event, amount: Decimal) {
    let mut tx = store.begin().await.unwrap();
    store
        .transaction_insert(
            &mut tx,
            NewTransaction {
                user_id: user_id.clone(),
                amount,
                reward_amount: Decimal::ZERO,
                tx_for: TxFor::Bet,
                bet_id: None,
                bet_quantity: None,
                token: event.token.clone(),
                chain: event.chain.clone(),
            },
        )
        .await
        .unwrap();
    store.commit(tx).await.unwrap();
}

async fn balance(store: &MemoryStore, user_id: &UserId, event: &Event) -> predictor_core::store::Balance {
    let mut tx = store.begin().await.unwrap();
    let balance = store.balance_get(&mut tx, user_id, &event.token, &event.chain).await.unwrap();
    store.commit(tx).await.unwrap();
    balance
}

#[tokio::test]
async fn scenario_a_cross_side_buy_vs_buy_match() {
    let store = MemoryStore::new();
    let event = sample_event(dec!(100), dec!(0), dec!(0));
    seed_event_with_options(&store, &event).await;

    let u1 = UserId::new();
    let u2 = UserId::new();
    fund(&store, &u1, &event, dec!(600)).await;
    fund(&store, &u2, &event, dec!(400)).await;

    let buy1 = admission::place_bet(
        &store,
        PlaceBetInput { user_id: u1.clone(), event_id: event.id.clone(), option_id: 1, r#type: BetType::Buy, quantity: 10, price: dec!(60), buy_bet_id: None },
    )
    .await
    .unwrap();
    let buy2 = admission::place_bet(
        &store,
        PlaceBetInput { user_id: u2.clone(), event_id: event.id.clone(), option_id: 2, r#type: BetType::Buy, quantity: 10, price: dec!(40), buy_bet_id: None },
    )
    .await
    .unwrap();

    let processed = matching::run_tick(&store).await.unwrap();
    assert_eq!(processed, 2);

    let mut tx = store.begin().await.unwrap();
    let bet1 = store.bet_get(&mut tx, &buy1.id).await.unwrap().unwrap();
    let bet2 = store.bet_get(&mut tx, &buy2.id).await.unwrap().unwrap();
    store.commit(tx).await.unwrap();

    assert_eq!(bet1.unmatched_quantity, 0);
    assert_eq!(bet2.unmatched_quantity, 0);

    // No ledger changes beyond the admission debits: U1's main balance is
    // exactly what funding minus the admission debit leaves behind.
    let b1 = balance(&store, &u1, &event).await;
    assert_eq!(b1.main, dec!(0));
}

/// Matches a fresh buy fully against a counter-buy on the sibling option,
/// so the test can go on to sell against it. Returns the filled buy.
async fn fully_matched_buy(
    store: &MemoryStore,
    event: &Event,
    buyer: &UserId,
    option_id: i32,
    quantity: i64,
    price: Decimal,
    counter_price: Decimal,
) -> Bet {
    let counterparty = UserId::new();
    fund(store, &counterparty, event, counter_price * Decimal::from(quantity)).await;

    let sibling = if option_id == 1 { 2 } else { 1 };
    let buy = admission::place_bet(
        store,
        PlaceBetInput { user_id: buyer.clone(), event_id: event.id.clone(), option_id, r#type: BetType::Buy, quantity, price, buy_bet_id: None },
    )
    .await
    .unwrap();
    admission::place_bet(
        store,
        PlaceBetInput { user_id: counterparty, event_id: event.id.clone(), option_id: sibling, r#type: BetType::Buy, quantity, price: counter_price, buy_bet_id: None },
    )
    .await
    .unwrap();

    matching::run_tick(store).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let bet = store.bet_get(&mut tx, &buy.id).await.unwrap().unwrap();
    store.commit(tx).await.unwrap();
    assert_eq!(bet.unmatched_quantity, 0, "setup buy did not fully match");
    bet
}

#[tokio::test]
async fn scenario_b_zero_fee_sell_settlement() {
    let store = MemoryStore::new();
    let event = sample_event(dec!(100), dec!(0), dec!(0));
    seed_event_with_options(&store, &event).await;

    let u1 = UserId::new();
    fund(&store, &u1, &event, dec!(600)).await;
    let buy = fully_matched_buy(&store, &event, &u1, 1, 10, dec!(60), dec!(40)).await;

    let buyer_for_sell = UserId::new();
    fund(&store, &buyer_for_sell, &event, dec!(280)).await;
    admission::place_bet(
        &store,
        PlaceBetInput { user_id: buyer_for_sell, event_id: event.id.clone(), option_id: 1, r#type: BetType::Buy, quantity: 4, price: dec!(70), buy_bet_id: None },
    )
    .await
    .unwrap();

    let sell = admission::place_bet(
        &store,
        PlaceBetInput { user_id: u1.clone(), event_id: event.id.clone(), option_id: 1, r#type: BetType::Sell, quantity: 4, price: dec!(70), buy_bet_id: Some(buy.id.clone()) },
    )
    .await
    .unwrap();

    matching::run_tick(&store).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let sell = store.bet_get(&mut tx, &sell.id).await.unwrap().unwrap();
    store.commit(tx).await.unwrap();

    assert_eq!(sell.unmatched_quantity, 0);
    assert_eq!(sell.profit, Some(dec!(40)));
    assert_eq!(sell.platform_commission, Some(dec!(0)));
}

#[tokio::test]
async fn scenario_c_fee_bearing_sell_settlement() {
    let store = MemoryStore::new();
    let event = sample_event(dec!(100), dec!(0), dec!(10));
    seed_event_with_options(&store, &event).await;

    let u1 = UserId::new();
    fund(&store, &u1, &event, dec!(500)).await;
    let buy = fully_matched_buy(&store, &event, &u1, 1, 10, dec!(50), dec!(50)).await;

    let buyer_for_sell = UserId::new();
    fund(&store, &buyer_for_sell, &event, dec!(800)).await;
    admission::place_bet(
        &store,
        PlaceBetInput { user_id: buyer_for_sell, event_id: event.id.clone(), option_id: 1, r#type: BetType::Buy, quantity: 10, price: dec!(80), buy_bet_id: None },
    )
    .await
    .unwrap();

    let sell = admission::place_bet(
        &store,
        PlaceBetInput { user_id: u1.clone(), event_id: event.id.clone(), option_id: 1, r#type: BetType::Sell, quantity: 10, price: dec!(80), buy_bet_id: Some(buy.id.clone()) },
    )
    .await
    .unwrap();

    matching::run_tick(&store).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let sell = store.bet_get(&mut tx, &sell.id).await.unwrap().unwrap();
    store.commit(tx).await.unwrap();

    assert_eq!(sell.platform_commission, Some(dec!(80)));
    assert_eq!(sell.profit, Some(dec!(220)));
}

#[tokio::test]
async fn scenario_d_liquidity_engine_synthesizes_counter_order() {
    let store = MemoryStore::new();
    let event = sample_event(dec!(100), dec!(0), dec!(0));
    seed_event_with_options(&store, &event).await;

    let user_id = UserId::new();
    let aged_bet = Bet {
        id: predictor_core::ids::BetId::new(),
        event_id: event.id.clone(),
        user_id: Some(user_id),
        option_id: 1,
        r#type: BetType::Buy,
        quantity: 5,
        price_per_quantity: dec!(10),
        unmatched_quantity: 5,
        reward_amount_used: dec!(0),
        sold_quantity: Some(0),
        buy_bet_id: None,
        buy_bet_price_per_quantity: None,
        profit: None,
        platform_commission: None,
        limit_order: true,
        created_at: Utc::now() - Duration::seconds(30),
        updated_at: Utc::now() - Duration::seconds(30),
    };
    store.seed_bet(aged_bet.clone()).await;

    let config = predictor_core::config::AppConfig {
        database_url: "unused".into(),
        match_interval_secs: 5,
        liquidity_interval_secs: 20,
        state_interval_secs: 5,
        resolver_interval_secs: 5,
        liquidity_aging_secs: 20,
        admin_port: 8090,
    };

    let acted = services::liquidity::run_tick(&store, &config).await.unwrap();
    assert_eq!(acted, 1);

    let mut tx = store.begin().await.unwrap();
    let event_after = store.event_get(&mut tx, &event.id).await.unwrap().unwrap();
    let bets = store.bet_list_by_event(&mut tx, &event.id).await.unwrap();
    let queued = store.queue_scan_ordered(&mut tx, 100).await.unwrap();
    store.commit(tx).await.unwrap();

    assert_eq!(event_after.platform_liquidity_left, dec!(550));

    let synthetic_buy = bets
        .iter()
        .find(|b| b.is_platform_owned() && b.r#type == BetType::Buy)
        .expect("synthetic platform buy was inserted");
    assert_eq!(synthetic_buy.option_id, 2);
    assert_eq!(synthetic_buy.price_per_quantity, dec!(90));
    assert_eq!(synthetic_buy.quantity, 5);

    let mirror_sell = bets
        .iter()
        .find(|b| b.is_platform_owned() && b.r#type == BetType::Sell)
        .expect("mirrored platform sell was inserted");
    assert_eq!(mirror_sell.option_id, 2);
    assert_eq!(mirror_sell.price_per_quantity, dec!(90));
    assert!(queued.iter().any(|q| q.bet_id == mirror_sell.id));
}

#[tokio::test]
async fn scenario_e_resolver_cancels_residual_then_pays_winner() {
    let store = MemoryStore::new();
    let mut event = sample_event(dec!(100), dec!(0), dec!(0));
    event.status = EventStatus::Completed;
    event.option_won = Some(1);
    seed_event_with_options(&store, &event).await;

    let user_id = UserId::new();
    let parent_buy = Bet {
        id: predictor_core::ids::BetId::new(),
        event_id: event.id.clone(),
        user_id: Some(user_id.clone()),
        option_id: 1,
        r#type: BetType::Buy,
        quantity: 10,
        price_per_quantity: dec!(50),
        unmatched_quantity: 0,
        reward_amount_used: dec!(0),
        sold_quantity: Some(7),
        buy_bet_id: None,
        buy_bet_price_per_quantity: None,
        profit: None,
        platform_commission: None,
        limit_order: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    store.seed_bet(parent_buy.clone()).await;

    let residual_sell = Bet {
        id: predictor_core::ids::BetId::new(),
        event_id: event.id.clone(),
        user_id: Some(user_id.clone()),
        option_id: 1,
        r#type: BetType::Sell,
        quantity: 3,
        price_per_quantity: dec!(70),
        unmatched_quantity: 3,
        reward_amount_used: dec!(0),
        sold_quantity: None,
        buy_bet_id: Some(parent_buy.id.clone()),
        buy_bet_price_per_quantity: Some(dec!(50)),
        profit: None,
        platform_commission: None,
        limit_order: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    store.seed_bet(residual_sell.clone()).await;

    let resolved = resolver::run_tick(&store).await.unwrap();
    assert_eq!(resolved, 1);

    let mut tx = store.begin().await.unwrap();
    let event_after = store.event_get(&mut tx, &event.id).await.unwrap().unwrap();
    let sell_after = store.bet_get(&mut tx, &residual_sell.id).await.unwrap().unwrap();
    let parent_after = store.bet_get(&mut tx, &parent_buy.id).await.unwrap().unwrap();
    store.commit(tx).await.unwrap();

    assert!(event_after.resolved);
    assert_eq!(sell_after.unmatched_quantity, 0);
    assert_eq!(sell_after.quantity, 0);
    assert_eq!(parent_after.sold_quantity, Some(4));

    // remaining = 10 - sold_quantity(4) = 6, settled at winPrice 100 from
    // an entry of 50 with no fees: gross = profit = 600, cashOut = 600.
    assert_eq!(parent_after.profit, Some(dec!(300)));
    assert_eq!(parent_after.platform_commission, Some(dec!(0)));

    // idempotent: a second resolver tick finds nothing left to resolve.
    let resolved_again = resolver::run_tick(&store).await.unwrap();
    assert_eq!(resolved_again, 0);
}
