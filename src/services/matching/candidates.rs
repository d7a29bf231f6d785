//! Candidate selection for the matching worker: spec §4.4 steps 2-3.
//!
//! Pure functions over an in-memory slice of a single event's bets, so the
//! selection policy is unit-testable without a store.

use rust_decimal::Decimal;

use crate::models::{Bet, BetType, Event};

fn in_slippage(observed: Decimal, target: Decimal, slippage: Decimal) -> bool {
    (observed - target).abs() <= slippage
}

/// Candidates eligible to fill `taker`, per spec §4.4 step 2. `pool` is
/// every other open bet on the same event; `taker` must not be included.
pub fn eligible_candidates<'a>(taker: &Bet, event: &Event, pool: &'a [Bet]) -> Vec<&'a Bet> {
    let open = |c: &&Bet| c.unmatched_quantity > 0;

    if taker.is_platform_owned() {
        // The platform never matches another platform bet: restrict to
        // user-owned buys on the same option, regardless of taker side.
        return pool
            .iter()
            .filter(|c| {
                open(c)
                    && c.user_id.is_some()
                    && c.r#type == BetType::Buy
                    && c.option_id == taker.option_id
                    && in_slippage(c.price_per_quantity, taker.price_per_quantity, event.slippage)
            })
            .collect();
    }

    match taker.r#type {
        BetType::Sell => pool
            .iter()
            .filter(|c| {
                open(c)
                    && c.r#type == BetType::Buy
                    && c.option_id == taker.option_id
                    && in_slippage(c.price_per_quantity, taker.price_per_quantity, event.slippage)
            })
            .collect(),
        BetType::Buy => {
            let complement = event.win_price - taker.price_per_quantity;
            let cross_side = pool.iter().filter(move |c| {
                open(c)
                    && c.r#type == BetType::Buy
                    && c.option_id != taker.option_id
                    && in_slippage(c.price_per_quantity, complement, event.slippage)
            });
            let same_side = pool.iter().filter(move |c| {
                open(c)
                    && c.r#type == BetType::Sell
                    && c.option_id == taker.option_id
                    && in_slippage(c.price_per_quantity, taker.price_per_quantity, event.slippage)
            });
            cross_side.chain(same_side).collect()
        }
    }
}

/// Price×size priority, age tiebreak (spec §4.4 step 3): largest standing
/// notional first, oldest first among ties.
pub fn order_candidates<'a>(mut candidates: Vec<&'a Bet>) -> Vec<&'a Bet> {
    candidates.sort_by(|a, b| {
        b.total_price()
            .cmp(&a.total_price())
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    candidates
}

/// Keeps candidates whose cumulative unmatched quantity stays at or under
/// `taker_unmatched`, plus the first one that crosses it (the last partial
/// fill). Candidates beyond that are left for a later tick.
pub fn cumulative_fill_set<'a>(taker_unmatched: i64, ordered: Vec<&'a Bet>) -> Vec<&'a Bet> {
    let mut taken = Vec::new();
    let mut cumulative = 0i64;
    for candidate in ordered {
        if cumulative >= taker_unmatched {
            break;
        }
        taken.push(candidate);
        cumulative += candidate.unmatched_quantity;
    }
    taken
}
