//! The matching worker: spec §4.4.

pub mod candidates;
pub mod worker;

pub use worker::match_one;

use std::collections::HashMap;

use tokio::task::JoinSet;
use tracing::error;

use crate::error::CoreError;
use crate::metrics;
use crate::store::Store;

/// Drains the current bet queue, grouped by event, fanning each event's
/// group out onto its own task (events are independent; bets within one
/// event are processed sequentially since they share the event lock
/// anyway). Returns the number of entries that matched without error.
pub async fn run_tick<S: Store + Clone + 'static>(store: &S) -> Result<usize, CoreError> {
    let timer = metrics::Timer::new();
    let mut tx = store.begin().await?;
    let entries = store.queue_scan_ordered(&mut tx, 500).await?;
    store.commit(tx).await?;

    let mut by_event: HashMap<_, Vec<_>> = HashMap::new();
    for entry in entries {
        by_event.entry(entry.event_id.clone()).or_default().push(entry);
    }

    let mut set = JoinSet::new();
    for group in by_event.into_values() {
        let store = store.clone();
        set.spawn(async move {
            let mut processed = 0;
            for entry in group {
                match worker::match_one(&store, &entry).await {
                    Ok(()) => processed += 1,
                    Err(err) => {
                        metrics::record_matching_tick_failure();
                        error!(bet_id = %entry.bet_id, error = %err, "matching tick failed, will retry next cycle")
                    }
                }
            }
            processed
        });
    }

    let mut processed = 0;
    while let Some(result) = set.join_next().await {
        processed += result.unwrap_or(0);
    }
    metrics::record_matched_fills(processed as u64);
    metrics::record_matching_tick(timer.elapsed_secs());
    Ok(processed)
}
