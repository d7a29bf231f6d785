use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use predictor_core::api::routes::{self, AdminState};
use predictor_core::config::AppConfig;
use predictor_core::metrics;
use predictor_core::store::PgStore;
use predictor_core::workers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "predictor_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;

    tracing::info!("starting predictor-core v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new().max_connections(20).connect(&config.database_url).await?;
    tracing::info!("database connected");

    let store = Arc::new(PgStore::new(pool));
    let metrics_handle = metrics::init_metrics();

    spawn_workers(store.clone(), config.clone());

    let admin_state = AdminState { store, metrics_handle };
    let app: Router = routes::create_router(admin_state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.admin_port));
    tracing::info!("admin surface listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Starts the four background workers (spec §5), each on its own interval
/// with its own single-flight guard.
fn spawn_workers(store: Arc<PgStore>, config: AppConfig) {
    let matching_store = (*store).clone();
    workers::spawn_loop("matching", config.match_interval(), move || {
        let store = matching_store.clone();
        async move { predictor_core::services::matching::run_tick(&store).await }
    });

    let liquidity_store = (*store).clone();
    let liquidity_config = config.clone();
    workers::spawn_loop("liquidity", config.liquidity_interval(), move || {
        let store = liquidity_store.clone();
        let config = liquidity_config.clone();
        async move { predictor_core::services::liquidity::run_tick(&store, &config).await }
    });

    let state_store = (*store).clone();
    workers::spawn_loop("event_state", config.state_interval(), move || {
        let store = state_store.clone();
        async move { predictor_core::services::event_state::run_tick(&store).await }
    });

    let resolver_store = (*store).clone();
    workers::spawn_loop("resolver", config.resolver_interval(), move || {
        let store = resolver_store.clone();
        async move { predictor_core::services::resolver::run_tick(&store).await }
    });
}
