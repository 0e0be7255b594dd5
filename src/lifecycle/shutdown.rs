//! Shutdown coordination for the listener task.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

/// Tells the listener to stop accepting connections.
///
/// Cheap to trigger from any task; triggering more than once is harmless.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver handed to `Listener::serve`.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// How the background task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Finished,
    Panicked,
    Aborted,
}

/// Join `task` within `timeout`, aborting it if it does not finish in time.
///
/// Never fails: teardown has to hand control back to the test runner.
pub async fn join_or_abort(mut task: JoinHandle<()>, timeout: Duration) -> JoinOutcome {
    match time::timeout(timeout, &mut task).await {
        Ok(Ok(())) => JoinOutcome::Finished,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Listener task ended abnormally");
            JoinOutcome::Panicked
        }
        Err(_) => {
            tracing::warn!(timeout = ?timeout, "Listener task did not finish in time, aborting");
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "Listener task failed while aborting");
                }
            }
            JoinOutcome::Aborted
        }
    }
}
