//! Event state worker: spec §4.7.

use chrono::Utc;
use tracing::{debug, error};

use crate::error::CoreError;
use crate::metrics;
use crate::models::EventStatus;
use crate::store::Store;

/// Transitions every unresolved event by wall-clock, one event-locked
/// transaction per event so matching never observes a torn state. Returns
/// the number of events transitioned.
pub async fn run_tick<S: Store>(store: &S) -> Result<usize, CoreError> {
    let mut scan_tx = store.begin().await?;
    let events = store.event_list_unresolved(&mut scan_tx).await?;
    store.commit(scan_tx).await?;

    let mut transitioned = 0;
    for event in events {
        match transition_one(store, &event.id).await {
            Ok(true) => transitioned += 1,
            Ok(false) => {}
            Err(err) => error!(event_id = %event.id, error = %err, "event state transition failed, will retry next cycle"),
        }
    }
    Ok(transitioned)
}

async fn transition_one<S: Store>(store: &S, event_id: &crate::ids::EventId) -> Result<bool, CoreError> {
    let mut tx = store.begin().await?;
    store.lock_event(&mut tx, event_id).await?;

    let mut event = match store.event_get(&mut tx, event_id).await? {
        Some(e) => e,
        None => {
            store.rollback(tx).await?;
            return Ok(false);
        }
    };

    let now = Utc::now();
    let mut changed = false;

    if event.should_go_live(now) {
        event.status = EventStatus::Live;
        changed = true;
    } else if event.should_complete(now) {
        event.status = EventStatus::Completed;
        changed = true;
    }

    if changed {
        store.event_update(&mut tx, &event).await?;
        store.commit(tx).await?;
        metrics::record_event_transition(&event.status.to_string());
        debug!(event_id = %event.id, status = %event.status, "event transitioned");
        Ok(true)
    } else {
        store.rollback(tx).await?;
        Ok(false)
    }
}
