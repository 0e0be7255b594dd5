//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use stub_server::observability::logging;
use stub_server::{Dispatcher, Hooks, Listener, Result, ServerConfig, StubServer};
use tokio::sync::broadcast;

/// Loopback, ephemeral port, no interrupt handler.
///
/// Also installs the test log subscriber at the configured level.
pub fn test_config() -> ServerConfig {
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        install_interrupt_handler: false,
        ..ServerConfig::default()
    };
    logging::init(&config.log_level);
    config
}

/// A client that never reuses connections between requests.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// A started server on an ephemeral port.
pub async fn started_server() -> StubServer {
    let mut server = StubServer::new(test_config());
    server.start().await.unwrap();
    server
}

pub fn url(server: &StubServer, path: &str) -> String {
    server.url(path).unwrap().to_string()
}

fn unbound() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

/// Binds nothing and never reports that it started.
pub struct HangingListener;

impl Listener for HangingListener {
    async fn bind(_config: &ServerConfig, _dispatcher: Arc<Dispatcher>) -> Result<Self> {
        Ok(HangingListener)
    }

    fn local_addr(&self) -> SocketAddr {
        unbound()
    }

    async fn serve(self, _hooks: Hooks, _shutdown: broadcast::Receiver<()>) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Reports a stop without ever reporting a start.
pub struct EarlyStopListener;

impl Listener for EarlyStopListener {
    async fn bind(_config: &ServerConfig, _dispatcher: Arc<Dispatcher>) -> Result<Self> {
        Ok(EarlyStopListener)
    }

    fn local_addr(&self) -> SocketAddr {
        unbound()
    }

    async fn serve(self, mut hooks: Hooks, _shutdown: broadcast::Receiver<()>) -> Result<()> {
        hooks.stopped();
        Ok(())
    }
}

/// Fails its accept loop before starting.
pub struct FailingListener;

impl Listener for FailingListener {
    async fn bind(_config: &ServerConfig, _dispatcher: Arc<Dispatcher>) -> Result<Self> {
        Ok(FailingListener)
    }

    fn local_addr(&self) -> SocketAddr {
        unbound()
    }

    async fn serve(self, _hooks: Hooks, _shutdown: broadcast::Receiver<()>) -> Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "accept refused").into())
    }
}

/// Panics inside its accept loop.
pub struct PanickingListener;

impl Listener for PanickingListener {
    async fn bind(_config: &ServerConfig, _dispatcher: Arc<Dispatcher>) -> Result<Self> {
        Ok(PanickingListener)
    }

    fn local_addr(&self) -> SocketAddr {
        unbound()
    }

    async fn serve(self, _hooks: Hooks, _shutdown: broadcast::Receiver<()>) -> Result<()> {
        panic!("accept loop exploded");
    }
}

/// Starts fine, then fails when asked to shut down.
pub struct CrashOnShutdownListener;

impl Listener for CrashOnShutdownListener {
    async fn bind(_config: &ServerConfig, _dispatcher: Arc<Dispatcher>) -> Result<Self> {
        Ok(CrashOnShutdownListener)
    }

    fn local_addr(&self) -> SocketAddr {
        unbound()
    }

    async fn serve(self, mut hooks: Hooks, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        hooks.started();
        let _ = shutdown.recv().await;
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "socket vanished").into())
    }
}

/// Reports a clean stop, then fails after nobody is waiting anymore.
pub struct LateFailureListener;

impl Listener for LateFailureListener {
    async fn bind(_config: &ServerConfig, _dispatcher: Arc<Dispatcher>) -> Result<Self> {
        Ok(LateFailureListener)
    }

    fn local_addr(&self) -> SocketAddr {
        unbound()
    }

    async fn serve(self, mut hooks: Hooks, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        hooks.started();
        let _ = shutdown.recv().await;
        hooks.stopped();
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "late accept error").into())
    }
}
