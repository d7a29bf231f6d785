//! Minimal admin surface (spec §6): health, Prometheus scrape, and two
//! read-only views into worker state -- queue depth and per-event liquidity
//! remaining. No order-placement routes live here; `placeBet`/`cancelBet`
//! are a library call, not an HTTP endpoint, per spec's Non-goals.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::ids::EventId;
use crate::store::Store;
use crate::utils::AppError;

#[derive(Clone)]
pub struct AdminState<S: Store> {
    pub store: Arc<S>,
    pub metrics_handle: PrometheusHandle,
}

pub fn create_router<S: Store + 'static>(state: AdminState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(scrape_metrics::<S>))
        .route("/queue/depth", get(queue_depth::<S>))
        .route("/events/:event_id/liquidity", get(event_liquidity::<S>))
        .layer(axum::middleware::from_fn(crate::api::middleware::metrics_middleware))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn scrape_metrics<S: Store>(State(state): State<AdminState<S>>) -> String {
    state.metrics_handle.render()
}

#[derive(Debug, Serialize)]
struct QueueDepthResponse {
    depth: usize,
}

async fn queue_depth<S: Store>(State(state): State<AdminState<S>>) -> Result<Json<QueueDepthResponse>, AppError> {
    let mut tx = state
        .store
        .begin()
        .await
        .map_err(|err| AppError::internal(&err.to_string()))?;
    let entries = state
        .store
        .queue_scan_ordered(&mut tx, i64::MAX)
        .await
        .map_err(|err| AppError::internal(&err.to_string()))?;
    state
        .store
        .commit(tx)
        .await
        .map_err(|err| AppError::internal(&err.to_string()))?;

    Ok(Json(QueueDepthResponse { depth: entries.len() }))
}

#[derive(Debug, Serialize)]
struct EventLiquidityResponse {
    event_id: EventId,
    platform_liquidity_left: rust_decimal::Decimal,
}

async fn event_liquidity<S: Store>(
    State(state): State<AdminState<S>>,
    Path(event_id): Path<String>,
) -> Result<Json<EventLiquidityResponse>, AppError> {
    let event_id = EventId::from(event_id);
    let mut tx = state
        .store
        .begin()
        .await
        .map_err(|err| AppError::internal(&err.to_string()))?;
    let event = state
        .store
        .event_get(&mut tx, &event_id)
        .await
        .map_err(|err| AppError::internal(&err.to_string()))?;
    state
        .store
        .commit(tx)
        .await
        .map_err(|err| AppError::internal(&err.to_string()))?;

    let event = event.ok_or_else(|| AppError::not_found(&format!("event {}", event_id)))?;
    Ok(Json(EventLiquidityResponse {
        event_id: event.id,
        platform_liquidity_left: event.platform_liquidity_left,
    }))
}
