//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Own the composition root: rule store, proxy router, hub, port listeners
//! - Dispatch each request to a proxy rule or to static file serving
//! - Start and stop background tasks (file watcher, port listeners)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRef, State},
    http::Request,
    response::Response,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin;
use crate::config::{load_settings, ServerConfig};
use crate::http::files::{serve_dir, serve_file, watcher_script, WATCHER_SCRIPT_PATH};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::live::{events_handler, ChangeHub, FileWatcher, LiveReloadState};
use crate::net::PortListeners;
use crate::proxy::ProxyRouter;
use crate::routing::{ProxyRule, RuleStore, Settings};

/// Slack between the upstream deadline and the request-wide timeout, so a
/// slow upstream is reported by the proxy (504) rather than by the layer (408).
const TIMEOUT_BACKSTOP_MARGIN: Duration = Duration::from_secs(5);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<RuleStore>,
    pub router: Arc<ProxyRouter>,
    pub ports: Arc<PortListeners>,
    pub live: LiveReloadState,
    pub files: Option<ServeDir>,
}

impl AppState {
    /// Complete a rule mutation: drop cached proxies, then resync port listeners.
    ///
    /// Must be awaited before the mutation is acknowledged.
    pub async fn rules_changed(&self) {
        self.router.refresh();
        self.ports.reconcile().await;
    }

    /// The change hub shared by the watcher and the event endpoint.
    pub fn hub(&self) -> &ChangeHub {
        &self.live.hub
    }
}

impl FromRef<AppState> for LiveReloadState {
    fn from_ref(state: &AppState) -> Self {
        state.live.clone()
    }
}

/// HTTP server for the two-in-one endpoint.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        let rules = Arc::new(RuleStore::new(initial_settings(&config)));
        let router = Arc::new(ProxyRouter::new(
            rules.clone(),
            Duration::from_secs(config.timeouts.connect_secs),
            Duration::from_secs(config.timeouts.request_secs),
        ));

        let bind_ip = config
            .listener
            .bind_address
            .parse::<SocketAddr>()
            .map(|addr| addr.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let ports = Arc::new(PortListeners::new(router.clone(), bind_ip));

        let live = LiveReloadState {
            hub: ChangeHub::new(config.live_reload.subscriber_capacity),
            heartbeat: Duration::from_secs(config.live_reload.heartbeat_secs),
            endpoint: config.live_reload.endpoint.clone(),
        };

        let files = config.files.enabled.then(|| serve_dir(&config.files.root));

        let state = AppState {
            rules,
            router,
            ports,
            live,
            files,
        };

        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let mut app: Router<AppState> = Router::new();

        if config.live_reload.enabled {
            app = app
                .route(&config.live_reload.endpoint, get(events_handler))
                .route(WATCHER_SCRIPT_PATH, get(watcher_script));
        }
        if config.admin.enabled {
            app = app.nest("/admin/api", admin::router());
        }

        app.fallback(dispatch)
            .with_state(state)
            .layer(TimeoutLayer::new(
                Duration::from_secs(config.timeouts.request_secs) + TIMEOUT_BACKSTOP_MARGIN,
            ))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Shared state, for embedding and tests.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        self.state.rules.set_file_server_port(addr.port());
        tracing::info!(
            address = %addr,
            root = %self.config.files.root.display(),
            "HTTP server starting"
        );

        let watcher = if self.config.live_reload.enabled {
            let watcher = FileWatcher::new(
                self.config.files.root.clone(),
                self.state.live.hub.clone(),
                Duration::from_millis(self.config.live_reload.debounce_ms),
            );
            match watcher.spawn(shutdown.resubscribe()) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::error!(error = %e, "File watcher unavailable, live reload disabled");
                    None
                }
            }
        } else {
            None
        };

        self.state.ports.reconcile().await;

        let hub = self.state.live.hub.clone();
        let ports = self.state.ports.clone();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
                hub.close();
                ports.shutdown_all().await;
            })
            .await?;

        if let Some(handle) = watcher {
            let _ = handle.await;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Seed settings: configured rules first, then the rules file, each normalized.
fn initial_settings(config: &ServerConfig) -> Settings {
    let mut rules: Vec<ProxyRule> = config.rules.clone();

    if let Some(path) = &config.rules_file {
        match load_settings(path) {
            Ok(imported) => {
                tracing::info!(path = %path.display(), rules = imported.proxy_rules.len(), "Imported rules file");
                rules.extend(imported.proxy_rules);
            }
            Err(e) => tracing::error!(path = %path.display(), error = %e, "Failed to import rules file"),
        }
    }

    let proxy_rules = rules
        .into_iter()
        .filter_map(|rule| match rule.normalize() {
            Ok(rule) => Some(rule),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping invalid rule");
                None
            }
        })
        .collect();

    let root = &config.files.root;
    let dir = root.canonicalize().unwrap_or_else(|_| root.clone());

    Settings {
        proxy_rules,
        file_server_port: 0,
        file_server_dir: dir.display().to_string(),
    }
}

/// Shared-endpoint dispatcher: proxy rule first, static files otherwise.
async fn dispatch(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let peer = Some(peer.ip());

    match state.router.match_path(request.uri().path()) {
        Some(rule) => {
            state
                .router
                .forward(&rule, request, peer, rule.strip_prefix)
                .await
        }
        None => match &state.files {
            Some(files) => serve_file(files.clone(), request).await,
            None => state.router.handle(request, peer).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn initial_settings_merge_config_and_rules_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"proxy_rules":[{{"id":"","path_prefix":"docs","target_url":"http://localhost:5000"}}]}}"#
        )
        .unwrap();

        let mut config = ServerConfig::default();
        config.rules.push(ProxyRule::with_prefix("/api", "http://localhost:3000").id("api"));
        config.rules_file = Some(file.path().to_path_buf());

        let settings = initial_settings(&config);
        assert_eq!(settings.proxy_rules.len(), 2);
        assert_eq!(settings.proxy_rules[0].id, "api");
        assert_eq!(settings.proxy_rules[1].path_prefix.as_deref(), Some("/docs"));
        assert!(!settings.proxy_rules[1].id.is_empty());
    }

    #[test]
    fn missing_rules_file_is_not_fatal() {
        let mut config = ServerConfig::default();
        config.rules_file = Some("/no/such/file.json".into());
        assert!(initial_settings(&config).proxy_rules.is_empty());
    }
}
