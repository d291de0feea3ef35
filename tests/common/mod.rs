//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use twinserve::http::AppState;
use twinserve::{HttpServer, ServerConfig, Shutdown};

/// Start a backend that answers every request with a description of what it received:
///
/// ```text
/// path=/users?x=1
/// host=127.0.0.1:4000
/// x-forwarded-host=127.0.0.1:8080
/// x-forwarded-proto=http
/// x-forwarded-for=127.0.0.1
/// tag=<tag>
/// ```
pub async fn start_echo_backend(tag: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(echo(socket, tag));
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn echo(mut socket: TcpStream, tag: &'static str) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&buf).to_string();
    let mut lines = head.split("\r\n");
    let target = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string();

    let header = |name: &str| {
        head.split("\r\n")
            .skip(1)
            .filter_map(|line| line.split_once(':'))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(name))
            .map(|(_, v)| v.trim().to_string())
            .unwrap_or_default()
    };

    let body = format!(
        "path={}\nhost={}\nx-forwarded-host={}\nx-forwarded-proto={}\nx-forwarded-for={}\ntag={}\n",
        target,
        header("host"),
        header("x-forwarded-host"),
        header("x-forwarded-proto"),
        header("x-forwarded-for"),
        tag,
    );
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a backend that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A port that was free a moment ago.
pub async fn free_port() -> u16 {
    dead_address().await.port()
}

/// Configuration for a test server rooted at `root`, on an ephemeral port.
pub fn test_config(root: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.files.root = root.to_path_buf();
    config.live_reload.debounce_ms = 100;
    config.timeouts.connect_secs = 2;
    config
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server to exit.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked");
        result.unwrap();
    }
}

pub async fn spawn_server(config: ServerConfig) -> TestServer {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let state = server.state().clone();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    // Let the watcher register before tests start touching files.
    tokio::time::sleep(Duration::from_millis(100)).await;

    TestServer {
        addr,
        state,
        shutdown,
        handle,
    }
}
