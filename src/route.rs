//! Route definitions for the QR API
//!
//! This module configures all HTTP routes and maps them to their respective handlers.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::services::ServeDir;

use crate::handler::{dashboard_stats, delete_qr, generate_qr, redirect_url};
use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Largest accepted request body, uploads included
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `POST /generate` - Renders a QR code, registering it when authenticated
/// - `GET /r/{short_id}` - Redirects a short link and counts the scan (public)
/// - `GET /api/dashboard-stats` - Owner statistics (requires bearer token)
/// - `DELETE /api/qr/{id}` - Deletes an owned QR code (requires bearer token)
/// - `GET /uploads/*` - Serves uploaded files
///
/// # Example Usage
///
/// ```no_run
/// # use qr_studio::config::Config;
/// # use qr_studio::database::init_db;
/// # use qr_studio::route::create_app;
/// # use qr_studio::state::AppState;
/// # let config = Config::from_env().unwrap();
/// let db = init_db(&config.database_url).unwrap();
/// let app = create_app(AppState::new(config, db));
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    // API routes that require a bearer token
    let api_routes = Router::new()
        .route("/dashboard-stats", get(dashboard_stats))
        .route("/qr/{id}", delete(delete_qr))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/generate", post(generate_qr))
        // Public redirect endpoint - counts the scan, then forwards
        .route("/r/{short_id}", get(redirect_url))
        .nest("/api", api_routes)
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
