//! Dedicated listeners for port-based rules.
//!
//! # Responsibilities
//! - Run one listener per port that some rule claims
//! - Start listeners for newly added port rules, stop orphaned ones
//! - Forward everything arriving on a port to that port's rule
//!
//! # Design Decisions
//! - The rule is looked up by port on every request, so updates apply
//!   without restarting the listener
//! - Bind failures are logged and retried at the next reconcile
//! - The rule list is read while holding the listener lock
//! - Dropping a listener's stop sender triggers its graceful shutdown

use std::collections::{BTreeSet, HashMap};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::proxy::ProxyRouter;

struct PortHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
    local_addr: SocketAddr,
}

#[derive(Clone)]
struct PortState {
    port: u16,
    router: Arc<ProxyRouter>,
}

/// Manages the set of running port listeners.
pub struct PortListeners {
    router: Arc<ProxyRouter>,
    bind_ip: IpAddr,
    active: Mutex<HashMap<u16, PortHandle>>,
}

impl PortListeners {
    /// Create a manager binding on `bind_ip`.
    pub fn new(router: Arc<ProxyRouter>, bind_ip: IpAddr) -> Self {
        Self {
            router,
            bind_ip,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Bring the running listeners in line with the current rules.
    ///
    /// Rules are read under the listener lock, so the last reconcile to run
    /// always sees every mutation that completed before it was called.
    pub async fn reconcile(&self) {
        let mut active = self.active.lock().await;
        let wanted: BTreeSet<u16> = self
            .router
            .store()
            .list()
            .iter()
            .filter_map(|r| r.port)
            .collect();

        let orphaned: Vec<u16> = active
            .keys()
            .copied()
            .filter(|port| !wanted.contains(port))
            .collect();
        for port in orphaned {
            if let Some(handle) = active.remove(&port) {
                stop(port, handle).await;
            }
        }

        for port in wanted {
            if active.contains_key(&port) {
                continue;
            }
            match self.start(port).await {
                Ok(handle) => {
                    active.insert(port, handle);
                }
                Err(e) => {
                    tracing::error!(port, error = %e, "Port-based proxy failed to bind");
                }
            }
        }
    }

    /// Ports currently being served.
    pub async fn ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self.active.lock().await.keys().copied().collect();
        ports.sort_unstable();
        ports
    }

    /// Stop every listener.
    pub async fn shutdown_all(&self) {
        let drained: Vec<(u16, PortHandle)> = self.active.lock().await.drain().collect();
        for (port, handle) in drained {
            stop(port, handle).await;
        }
    }

    async fn start(&self, port: u16) -> std::io::Result<PortHandle> {
        let listener = TcpListener::bind(SocketAddr::new(self.bind_ip, port)).await?;
        let local_addr = listener.local_addr()?;

        let app = Router::new()
            .fallback(port_handler)
            .with_state(PortState {
                port,
                router: self.router.clone(),
            })
            .layer(TraceLayer::new_for_http())
            .into_make_service_with_connect_info::<SocketAddr>();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop_rx.await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(port, error = %e, "Port-based proxy stopped with error");
            }
        });

        tracing::info!(port, address = %local_addr, "Port proxy listening");
        Ok(PortHandle {
            stop: stop_tx,
            task,
            local_addr,
        })
    }
}

async fn stop(port: u16, handle: PortHandle) {
    let _ = handle.stop.send(());
    if let Err(e) = handle.task.await {
        tracing::warn!(port, error = %e, "Port proxy task ended abnormally");
    }
    tracing::info!(port, address = %handle.local_addr, "Port proxy stopped");
}

async fn port_handler(
    State(state): State<PortState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    state
        .router
        .handle_port(state.port, request, Some(peer.ip()))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{ProxyRule, RuleStore};
    use std::time::Duration;

    async fn free_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    fn listeners() -> (Arc<RuleStore>, PortListeners) {
        let store = Arc::new(RuleStore::default());
        let router = Arc::new(ProxyRouter::new(
            store.clone(),
            Duration::from_secs(1),
            Duration::from_secs(1),
        ));
        (store, PortListeners::new(router, "127.0.0.1".parse().unwrap()))
    }

    fn claimed_ports(store: &RuleStore) -> Vec<u16> {
        let mut ports: Vec<u16> = store.list().iter().filter_map(|r| r.port).collect();
        ports.sort_unstable();
        ports
    }

    #[tokio::test]
    async fn reconcile_starts_and_stops_listeners() {
        let (store, ports) = listeners();
        let port = free_port().await;
        store.add(ProxyRule::with_port(port, "http://127.0.0.1:1").id("p"));

        ports.reconcile().await;
        assert_eq!(ports.ports().await, vec![port]);

        // Idempotent.
        ports.reconcile().await;
        assert_eq!(ports.ports().await, vec![port]);

        store.delete("p");
        ports.reconcile().await;
        assert!(ports.ports().await.is_empty());

        // Port is free again once stopped.
        TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    }

    #[tokio::test]
    async fn bind_failure_is_not_fatal() {
        let (store, ports) = listeners();
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        store.add(ProxyRule::with_port(port, "http://127.0.0.1:1").id("p"));
        ports.reconcile().await;
        assert!(ports.ports().await.is_empty());
        ports.shutdown_all().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_add_and_delete_leave_no_orphaned_listener() {
        for _ in 0..20 {
            let (store, ports) = listeners();
            let ports = Arc::new(ports);
            let port = free_port().await;

            let add = {
                let (store, ports) = (store.clone(), ports.clone());
                tokio::spawn(async move {
                    store.add(ProxyRule::with_port(port, "http://127.0.0.1:1").id("p"));
                    ports.reconcile().await;
                })
            };
            let delete = {
                let (store, ports) = (store.clone(), ports.clone());
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    store.delete("p");
                    ports.reconcile().await;
                })
            };
            add.await.unwrap();
            delete.await.unwrap();

            assert_eq!(ports.ports().await, claimed_ports(&store));
            ports.shutdown_all().await;
        }
    }
}
