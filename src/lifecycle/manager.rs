//! The stub server lifecycle manager.
//!
//! # Responsibilities
//! - Bind the listener on the caller's task, run it on a background task
//! - Block `start` until the listener confirms it is accepting
//! - Block `stop` until the listener confirms it released its socket
//! - Save and restore the interrupt handler around a run
//!
//! # Design Decisions
//! - `start` / `stop` take `&mut self`: one writer per instance
//! - A start timeout leaves the task in place; only `stop` cleans it up
//! - Stop escalates from a graceful join to aborting the task

use std::any::Any;
use std::marker::PhantomData;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use url::Url;

use crate::config::{validate_config, ServerConfig};
use crate::error::{Result, StubError};
use crate::http::{HttpListener, Response};
use crate::lifecycle::shutdown::{join_or_abort, Shutdown};
use crate::lifecycle::signals::InterruptGuard;
use crate::lifecycle::startup::{self, Handshake, HandshakeReceiver};
use crate::net::Listener;
use crate::observability::metrics;
use crate::routing::{Dispatcher, PathSpec};

/// Where a `StubServer` is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Starting,
    Running,
    Stopping,
}

/// What the manager keeps about a bound listener.
#[derive(Debug)]
struct ListenerHandle {
    shutdown: Shutdown,
    local_addr: SocketAddr,
}

/// A programmable HTTP stub server for tests.
///
/// ```no_run
/// # async fn demo() -> stub_server::Result<()> {
/// use stub_server::{Response, ServerConfig, StubServer};
///
/// let mut server = StubServer::new(ServerConfig { port: 0, ..ServerConfig::default() });
/// server.get("/widgets/1", Response::ok(r#"{"id": 1}"#))?;
/// server.start().await?;
/// // ... exercise the client against server.base_url() ...
/// server.stop().await?;
/// server.clear();
/// # Ok(())
/// # }
/// ```
pub struct StubServer<L: Listener = HttpListener> {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
    state: State,
    listener: Option<ListenerHandle>,
    task: Option<JoinHandle<()>>,
    handshake: Option<HandshakeReceiver>,
    interrupt: Option<InterruptGuard>,
    _listener: PhantomData<fn() -> L>,
}

impl StubServer<HttpListener> {
    /// A server using the default Axum listener.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_listener(config)
    }
}

impl Default for StubServer<HttpListener> {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

impl<L: Listener> StubServer<L> {
    /// A server driving a custom listener implementation.
    pub fn with_listener(config: ServerConfig) -> Self {
        Self::with_dispatcher(config, Arc::new(Dispatcher::new()))
    }

    /// A server serving an existing dispatcher.
    pub fn with_dispatcher(config: ServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            config,
            dispatcher,
            state: State::Idle,
            listener: None,
            task: None,
            handshake: None,
            interrupt: None,
            _listener: PhantomData,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    /// The bound address, while a listener exists.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().map(|handle| handle.local_addr)
    }

    /// `http://<bound address>/`, while a listener exists.
    pub fn base_url(&self) -> Option<Url> {
        let addr = self.local_addr()?;
        Url::parse(&format!("http://{addr}")).ok()
    }

    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> Option<Url> {
        self.base_url()?.join(path).ok()
    }

    pub fn get(&self, path: impl Into<PathSpec>, response: Response) -> Result<()> {
        self.dispatcher.get(path, response)
    }

    pub fn put(&self, path: impl Into<PathSpec>, response: Response) -> Result<()> {
        self.dispatcher.put(path, response)
    }

    pub fn post(&self, path: impl Into<PathSpec>, response: Response) -> Result<()> {
        self.dispatcher.post(path, response)
    }

    pub fn delete(&self, path: impl Into<PathSpec>, response: Response) -> Result<()> {
        self.dispatcher.delete(path, response)
    }

    /// Drop all stubs and recorded requests.
    pub fn clear(&self) {
        self.dispatcher.clear();
    }

    /// Start with the configured timeout.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        self.start_within(self.config.timeout()).await
    }

    /// Start the listener and wait up to `timeout` for it to accept.
    pub async fn start_within(&mut self, timeout: Duration) -> Result<SocketAddr> {
        if self.state != State::Idle || self.listener.is_some() {
            return Err(StubError::AlreadyStarted);
        }
        validate_config(&self.config).map_err(StubError::InvalidConfig)?;

        let listener = match L::bind(&self.config, Arc::clone(&self.dispatcher)).await {
            Ok(listener) => listener,
            Err(e) => {
                metrics::record_start("bind_failed");
                return Err(e);
            }
        };
        let local_addr = listener.local_addr();

        if self.config.install_interrupt_handler {
            match InterruptGuard::install() {
                Ok(guard) => self.interrupt = Some(guard),
                Err(e) => tracing::warn!(error = %e, "Failed to install interrupt handler"),
            }
        }
        self.state = State::Starting;

        let (tx, mut rx) = startup::channel();
        let hooks = tx.hooks();
        let shutdown = Shutdown::new();
        let signal = shutdown.subscribe();
        let task = tokio::spawn(async move {
            match AssertUnwindSafe(listener.serve(hooks, signal))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tx.report(Handshake::Failed(e)),
                Err(panic) => tx.report(Handshake::Failed(StubError::ListenerPanicked(
                    panic_message(&*panic),
                ))),
            }
        });
        self.listener = Some(ListenerHandle {
            shutdown,
            local_addr,
        });
        self.task = Some(task);

        let event = startup::wait(&mut rx, timeout).await;
        self.handshake = Some(rx);

        match event {
            Some(Handshake::Started) => {
                self.state = State::Running;
                metrics::record_start("started");
                tracing::info!(
                    address = %local_addr,
                    environment = %self.config.environment,
                    "Stub server running"
                );
                Ok(local_addr)
            }
            Some(Handshake::Stopped) => {
                metrics::record_start("stopped_before_start");
                self.abandon_start(timeout).await;
                Err(StubError::StoppedBeforeStart)
            }
            Some(Handshake::Failed(cause)) => {
                metrics::record_start("failed");
                self.abandon_start(timeout).await;
                Err(cause)
            }
            None => {
                metrics::record_start("timeout");
                tracing::warn!(
                    address = %local_addr,
                    timeout = ?timeout,
                    "Stub server did not confirm startup; call stop() to clean up"
                );
                Err(StubError::StartTimeout(timeout))
            }
        }
    }

    /// Stop with the configured timeout.
    pub async fn stop(&mut self) -> Result<()> {
        self.stop_within(self.config.timeout()).await
    }

    /// Stop the listener and wait up to `timeout` for it to let go.
    ///
    /// A no-op when nothing was started.
    pub async fn stop_within(&mut self, timeout: Duration) -> Result<()> {
        drop(self.interrupt.take());

        let Some(handle) = self.listener.as_ref() else {
            return Ok(());
        };
        let address = handle.local_addr;
        self.state = State::Stopping;
        handle.shutdown.trigger();

        let event = match self.handshake.as_mut() {
            Some(rx) => startup::wait_for_stop(rx, timeout).await,
            None => Some(Handshake::Stopped),
        };
        self.teardown(timeout).await;

        match event {
            Some(Handshake::Failed(cause)) => {
                tracing::error!(address = %address, error = %cause, "Stub server failed while running");
                Err(cause)
            }
            Some(_) => {
                tracing::info!(address = %address, "Stub server stopped");
                Ok(())
            }
            None => {
                tracing::warn!(
                    address = %address,
                    timeout = ?timeout,
                    "Stub server did not confirm shutdown in time"
                );
                Ok(())
            }
        }
    }

    async fn abandon_start(&mut self, timeout: Duration) {
        drop(self.interrupt.take());
        self.teardown(timeout).await;
    }

    async fn teardown(&mut self, timeout: Duration) {
        self.listener = None;
        if let Some(task) = self.task.take() {
            let outcome = join_or_abort(task, timeout).await;
            tracing::debug!(outcome = ?outcome, "Listener task joined");
        }
        if let Some(mut rx) = self.handshake.take() {
            startup::drain_lost(&mut rx);
        }
        self.state = State::Idle;
    }
}

impl<L: Listener> Drop for StubServer<L> {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.shutdown.trigger();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            install_interrupt_handler: false,
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let mut server = StubServer::new(config());
        assert!(server.stop().await.is_ok());
        assert_eq!(server.state(), State::Idle);
        assert!(server.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let mut server = StubServer::new(config());
        let addr = server.start().await.unwrap();
        assert!(server.is_running());
        assert_eq!(server.local_addr(), Some(addr));
        assert_eq!(
            server.url("/a?b=1").unwrap().as_str(),
            format!("http://{addr}/a?b=1")
        );

        server.stop().await.unwrap();
        assert_eq!(server.state(), State::Idle);
        assert!(server.base_url().is_none());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut server = StubServer::new(ServerConfig {
            timeout_secs: 0,
            ..config()
        });
        assert!(matches!(
            server.start_within(Duration::from_secs(1)).await,
            Err(StubError::InvalidConfig(_))
        ));
        assert_eq!(server.state(), State::Idle);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*boxed), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*boxed), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*boxed), "unknown panic");
    }
}
