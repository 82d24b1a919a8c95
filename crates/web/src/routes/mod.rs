//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Health check
//! GET  /                            - Home page
//! GET  /places | /events | /services - Section pages
//!
//! # Auth
//! GET  /auth/prompt                 - Sign-in prompt
//! POST /auth/login                  - Sign-in action
//! POST /auth/logout                 - Sign-out action
//!
//! # API
//! GET  /api/session/access          - Access state stream (SSE)
//!
//! # Admin (general admin)
//! GET  /admin/users                 - User management (?q= search)
//! POST /admin/users/reload          - Reload records
//! POST /admin/users/select-all      - Toggle select all visible
//! POST /admin/users/{id}/select     - Toggle one selection
//! POST /admin/users/{id}/draft      - Edit a draft
//! POST /admin/users/{id}/save       - Save a row
//! GET  /admin/users/delete          - Delete confirmation
//! POST /admin/users/delete          - Confirmed delete
//!
//! # Admin (per-section capability)
//! GET  /admin/{section}             - Section management
//! ```

pub mod admin_users;
pub mod api;
pub mod auth;
pub mod pages;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::session::create_session_layer;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/prompt", get(auth::prompt))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/session/access", get(api::access_stream))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin_users::index))
        .route("/users/reload", post(admin_users::reload))
        .route("/users/select-all", post(admin_users::select_all))
        .route(
            "/users/delete",
            get(admin_users::confirm_delete_page).post(admin_users::delete),
        )
        .route("/users/{id}/select", post(admin_users::select))
        .route("/users/{id}/draft", post(admin_users::draft))
        .route("/users/{id}/save", post(admin_users::save))
        .route("/{section}", get(pages::admin_section))
}

/// Create all page routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::home))
        .route("/places", get(pages::places))
        .route("/events", get(pages::events))
        .route("/services", get(pages::services))
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
        .nest("/admin", admin_routes())
}

/// Build the application router with sessions and static files.
///
/// Tracing and Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.session_store().clone(), state.config());

    Router::new()
        .route("/health", get(health))
        .merge(routes())
        .nest_service(
            "/static",
            ServeDir::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static")),
        )
        .layer(session_layer)
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the backend.
async fn health() -> &'static str {
    "ok"
}
