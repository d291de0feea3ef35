//! Static file serving for paths no proxy rule claims.
//!
//! Directory listings, uploads and the like live outside this crate; this
//! is a plain traversal-safe file server plus the live-reload client script.

use std::path::Path;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    response::{IntoResponse, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::live::LiveReloadState;

/// Path of the embedded live-reload client.
pub const WATCHER_SCRIPT_PATH: &str = "/__watcher.js";

const WATCHER_SCRIPT: &str = include_str!("../../assets/watcher-client.js");
const SCRIPT_ENDPOINT_PLACEHOLDER: &str = "__EVENTS_ENDPOINT__";

/// Build the file service rooted at `root`.
pub fn serve_dir(root: &Path) -> ServeDir {
    ServeDir::new(root)
}

/// Serve a request from disk.
pub async fn serve_file(files: ServeDir, request: Request<Body>) -> Response {
    match files.oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// `GET /__watcher.js`, pointed at the configured event endpoint.
pub async fn watcher_script(State(live): State<LiveReloadState>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        WATCHER_SCRIPT.replace(SCRIPT_ENDPOINT_PLACEHOLDER, &live.endpoint),
    )
}

