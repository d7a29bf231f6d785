//! Shared background-loop scaffolding: spec §5.
//!
//! Every worker loop (matching, liquidity, event state, resolver) is one
//! lightweight task on a fixed interval, guarded by a process-local
//! "already running" flag so a slow tick can't overlap with itself.
//! Correctness across loops and across processes comes from the database
//! advisory locks in [`crate::store`], not from this guard -- it only
//! protects against a single loop racing its own previous iteration.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Spawns `tick` on a fixed `interval`, skipping a tick entirely if the
/// previous one is still running. `tick` returns the number of records it
/// acted on, purely for logging.
pub fn spawn_loop<F, Fut>(name: &'static str, interval: Duration, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<usize, crate::error::CoreError>> + Send,
{
    let running = Arc::new(AtomicBool::new(false));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        loop {
            interval.tick().await;

            if running.swap(true, Ordering::SeqCst) {
                warn!(worker = name, "previous tick still running, skipping this one");
                continue;
            }

            let result = tick().await;
            running.store(false, Ordering::SeqCst);

            match result {
                Ok(count) if count > 0 => debug!(worker = name, count, "tick complete"),
                Ok(_) => {}
                Err(err) => error!(worker = name, error = %err, "tick failed, retrying next interval"),
            }
        }
    })
}
