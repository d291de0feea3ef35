//! Administrative API for runtime rule management.
//!
//! # Data Flow
//! ```text
//! /admin/api/proxies         GET list, POST add
//! /admin/api/proxies/{id}    PUT update, DELETE remove
//! /admin/api/settings        GET current settings
//! /admin/api/settings/export GET settings as a download
//! /admin/api/settings/import POST settings document
//!     → RuleStore mutation
//!     → AppState::rules_changed() (cache refresh + port reconcile)
//!     → response
//! ```
//!
//! # Design Decisions
//! - Bodies are read as bytes and parsed with serde_json so malformed JSON
//!   gets a plain-text 400 with the parser's message
//! - Permissive CORS; the API carries no authentication

pub mod error;
pub mod handlers;

use axum::{
    http::{header, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::http::server::AppState;

pub use error::AdminError;

/// Routes to nest under `/admin/api`.
pub fn router() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route(
            "/proxies",
            get(handlers::list_proxies).post(handlers::add_proxy),
        )
        .route(
            "/proxies/{id}",
            put(handlers::update_proxy).delete(handlers::delete_proxy),
        )
        .route("/settings", get(handlers::get_settings))
        .route("/settings/export", get(handlers::export_settings))
        .route("/settings/import", post(handlers::import_settings))
        .layer(cors)
}
