//! HTTP handlers
//!
//! This module organizes routes into logical submodules:
//! - `auth`: registration, login, logout, account deletion and the
//!   session extractor
//! - `notes`: listing, upload, download, profile and note deletion
//!
//! Reads answer with JSON; form posts answer with `303 See Other`.

pub mod auth;
pub mod notes;

use crate::app::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(notes::index))
        .route("/notes", get(notes::notes_redirect))
        .route("/register", post(auth::register))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/account/delete", post(auth::delete_account))
        .route("/upload", post(notes::upload))
        .route("/download/:note_id", get(notes::download))
        .route("/profile", get(notes::profile))
        .route("/delete/:note_id", post(notes::delete))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C, then drain in-flight requests
pub async fn serve(state: AppState) -> std::io::Result<()> {
    let addr = state.config.http_addr;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
