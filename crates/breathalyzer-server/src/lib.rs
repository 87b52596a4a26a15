//! HTTP front end for the breathalyzer station.
//!
//! # Flow
//! - Frontend polls `/can-cache` (or `/status`) and posts a name to `/initialize-session`
//! - Sensor polls `/should-start-blow` until it reads `TRUE`
//! - Sensor posts the reading to `/submit-bac`
//! - Frontend shows `/get-most-recent`, the top list from `/api/leaderboard`, and
//!   pages through `/leaderboard.json`
//!
//! Every route is a thin wrapper over [`breathalyzer_core::Breathalyzer`].
//!
//! # Logging
//! Controlled with `RUST_LOG`, e.g.
//! ```sh
//! RUST_LOG=info,breathalyzer_core=debug breathalyzer-server
//! ```
use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};

use chrono::Utc;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tokio::{net::TcpListener, signal::ctrl_c, time::interval};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

pub mod error;
pub mod routes;
pub mod state;

use routes::{
    can_cache_handler, initialize_session_handler, leaderboard_handler, most_recent_handler,
    should_start_blow_handler, status_handler, submit_bac_handler, top_handler,
};
use state::AppState;

const EXPIRY_SWEEP: Duration = Duration::from_secs(5);

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/can-cache", get(can_cache_handler))
        .route("/status", get(status_handler))
        .route("/initialize-session", post(initialize_session_handler))
        .route("/should-start-blow", get(should_start_blow_handler))
        .route("/submit-bac", post(submit_bac_handler))
        .route("/get-most-recent", get(most_recent_handler))
        .route("/leaderboard.json", get(leaderboard_handler))
        .route("/api/leaderboard", get(top_handler))
        .layer(cors)
        .with_state(state)
}

/// Serve on an already-bound listener until Ctrl+C or SIGTERM.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let sweeper = tokio::spawn(sweep_expired_sessions(state.clone()));

    let address = listener.local_addr()?;
    info!("Server running on {address}");

    let result = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.abort();
    info!("Server shut down");
    result
}

/// Bind `address` and serve.
pub async fn start_server(address: &str, state: AppState) -> std::io::Result<()> {
    info!("Binding to {address}");
    let listener = TcpListener::bind(address).await.inspect_err(|e| {
        error!("Failed to bind {address}: {e}");
    })?;
    serve(listener, state).await
}

/// Drop sessions that were never answered by the sensor.
async fn sweep_expired_sessions(state: AppState) {
    if state.station.config().session_timeout().is_none() {
        return;
    }

    let mut ticker = interval(EXPIRY_SWEEP);
    loop {
        ticker.tick().await;
        if let Some(session) = state.station.expire_stale(Utc::now()) {
            info!(name = %session.name, "Cleared expired session");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
