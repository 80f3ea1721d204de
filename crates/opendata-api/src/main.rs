//! Open Data API server entry point.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use opendata_api::config::Config;
use opendata_api::routes;
use opendata_api::state::AppState;
use opendata_core::clock::SystemClock;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Open Data API server");

    let config = Config::from_env()?;
    let app_state = AppState::from_config(&config, Arc::new(SystemClock));

    // Background pump: the single dedicated dispatching worker.
    let dispatcher = app_state.dispatcher.clone();
    let dispatch_interval = config.dispatch_interval;
    let pump = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(dispatch_interval);
        loop {
            ticker.tick().await;
            dispatcher.dispatch_pending_events().await;
        }
    });

    // Build router.
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/auth", routes::auth::router())
        .nest("/api/v1/data", routes::data::router(app_state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state.clone());

    // Start server.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("invalid HOST:PORT combination: {e}"))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drain: one final dispatch cycle, then drop whatever is left.
    pump.abort();
    app_state.dispatcher.dispatch_pending_events().await;
    app_state.dispatcher.clear_pending_events();
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
    }
}
