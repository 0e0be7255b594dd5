//! The contract between the lifecycle manager and an HTTP listener.
//!
//! # Responsibilities
//! - Bind the socket on the caller's task so bind errors surface at once
//! - Serve requests through the shared `Dispatcher`
//! - Report "started" and "stopped" through `Hooks`
//! - Stop when the shutdown signal fires
//!
//! # Design Decisions
//! - `bind` and `serve` are split: `serve` is what runs on the background task
//! - Hooks fire at most once each; firing them is the listener's job

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::routing::Dispatcher;

type Callback = Box<dyn FnOnce() + Send>;

/// Startup and shutdown notifications handed to `Listener::serve`.
pub struct Hooks {
    on_started: Option<Callback>,
    on_stopped: Option<Callback>,
}

impl Hooks {
    pub fn new<S, T>(on_started: S, on_stopped: T) -> Self
    where
        S: FnOnce() + Send + 'static,
        T: FnOnce() + Send + 'static,
    {
        Self {
            on_started: Some(Box::new(on_started)),
            on_stopped: Some(Box::new(on_stopped)),
        }
    }

    /// Report that the listener is accepting connections.
    pub fn started(&mut self) {
        if let Some(callback) = self.on_started.take() {
            callback();
        }
    }

    /// Report that the listener has released its socket.
    pub fn stopped(&mut self) {
        if let Some(callback) = self.on_stopped.take() {
            callback();
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("started_pending", &self.on_started.is_some())
            .field("stopped_pending", &self.on_stopped.is_some())
            .finish()
    }
}

/// An HTTP listener the lifecycle manager can drive.
pub trait Listener: Sized + Send + 'static {
    /// Bind the listening socket for `config`, routing requests to `dispatcher`.
    fn bind(
        config: &ServerConfig,
        dispatcher: Arc<Dispatcher>,
    ) -> impl Future<Output = Result<Self>> + Send;

    /// The address actually bound (resolves port `0`).
    fn local_addr(&self) -> SocketAddr;

    /// Run the accept loop until `shutdown` fires.
    ///
    /// Must call `hooks.started()` once accepting and `hooks.stopped()` once
    /// the socket has been released.
    fn serve(
        self,
        hooks: Hooks,
        shutdown: broadcast::Receiver<()>,
    ) -> impl Future<Output = Result<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_hooks_fire_once() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let (s, t) = (started.clone(), stopped.clone());
        let mut hooks = Hooks::new(
            move || {
                s.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                t.fetch_add(1, Ordering::SeqCst);
            },
        );

        hooks.started();
        hooks.started();
        hooks.stopped();
        hooks.stopped();

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }
}
