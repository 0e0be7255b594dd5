//! Startup handshake between the caller and the background listener task.
//!
//! # Responsibilities
//! - Carry `Started`, `Stopped` or `Failed` from the listener task
//! - Wire listener hooks to the handshake channel
//! - Bound every wait by a wall-clock timeout
//!
//! # Design Decisions
//! - Bounded channel: at most a handful of messages per server run
//! - Sending never blocks; a message that cannot be delivered is logged
//!   as a lost error instead of being dropped silently

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::error::StubError;
use crate::net::Hooks;

const HANDSHAKE_CAPACITY: usize = 4;

/// A lifecycle event reported by the listener task.
#[derive(Debug)]
pub enum Handshake {
    Started,
    Stopped,
    Failed(StubError),
}

/// Sending half, owned by the background task and the hooks.
#[derive(Debug, Clone)]
pub struct HandshakeSender {
    tx: mpsc::Sender<Handshake>,
}

/// Receiving half, owned by the lifecycle manager.
pub type HandshakeReceiver = mpsc::Receiver<Handshake>;

/// Create a new handshake channel.
pub fn channel() -> (HandshakeSender, HandshakeReceiver) {
    let (tx, rx) = mpsc::channel(HANDSHAKE_CAPACITY);
    (HandshakeSender { tx }, rx)
}

impl HandshakeSender {
    /// Push an event without blocking.
    pub fn report(&self, event: Handshake) {
        if let Err(e) = self.tx.try_send(event) {
            match e.into_inner() {
                Handshake::Failed(cause) => {
                    tracing::error!(error = %cause, "Listener error lost: nobody is waiting on the handshake");
                }
                event => {
                    tracing::debug!(event = ?event, "Handshake event dropped");
                }
            }
        }
    }

    /// Hooks that report `Started` / `Stopped` on this channel.
    pub fn hooks(&self) -> Hooks {
        let started = self.clone();
        let stopped = self.clone();
        Hooks::new(
            move || started.report(Handshake::Started),
            move || stopped.report(Handshake::Stopped),
        )
    }
}

/// Wait for the first event, up to `timeout`.
///
/// `None` means the timeout expired. A closed channel counts as `Stopped`:
/// the listener task is gone without saying anything else.
pub async fn wait(rx: &mut HandshakeReceiver, timeout: Duration) -> Option<Handshake> {
    match time::timeout(timeout, rx.recv()).await {
        Ok(Some(event)) => Some(event),
        Ok(None) => Some(Handshake::Stopped),
        Err(_) => None,
    }
}

/// Wait until the listener reports it stopped or failed, up to `timeout`.
///
/// Late `Started` events are skipped. Returns `None` on timeout.
pub async fn wait_for_stop(rx: &mut HandshakeReceiver, timeout: Duration) -> Option<Handshake> {
    let deadline = Instant::now() + timeout;
    loop {
        match time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(Handshake::Started)) => continue,
            Ok(Some(event)) => return Some(event),
            Ok(None) => return Some(Handshake::Stopped),
            Err(_) => return None,
        }
    }
}

/// Log whatever is still queued once nobody will wait for it anymore.
pub fn drain_lost(rx: &mut HandshakeReceiver) {
    while let Ok(event) = rx.try_recv() {
        if let Handshake::Failed(cause) = event {
            tracing::error!(error = %cause, "Listener error arrived after the handshake completed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hooks_report_on_channel() {
        let (tx, mut rx) = channel();
        let mut hooks = tx.hooks();

        hooks.started();
        assert!(matches!(
            wait(&mut rx, Duration::from_secs(1)).await,
            Some(Handshake::Started)
        ));

        hooks.stopped();
        assert!(matches!(
            wait(&mut rx, Duration::from_secs(1)).await,
            Some(Handshake::Stopped)
        ));
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let (_tx, mut rx) = channel();
        let started = std::time::Instant::now();
        assert!(wait(&mut rx, Duration::from_millis(50)).await.is_none());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_closed_channel_counts_as_stopped() {
        let (tx, mut rx) = channel();
        drop(tx);
        assert!(matches!(
            wait(&mut rx, Duration::from_secs(1)).await,
            Some(Handshake::Stopped)
        ));
    }

    #[tokio::test]
    async fn test_wait_for_stop_skips_started() {
        let (tx, mut rx) = channel();
        tx.report(Handshake::Started);
        tx.report(Handshake::Failed(StubError::StoppedBeforeStart));

        let event = wait_for_stop(&mut rx, Duration::from_secs(1)).await;
        assert!(matches!(
            event,
            Some(Handshake::Failed(StubError::StoppedBeforeStart))
        ));
    }

    #[tokio::test]
    async fn test_report_never_blocks_when_full() {
        let (tx, mut rx) = channel();
        for _ in 0..HANDSHAKE_CAPACITY {
            tx.report(Handshake::Started);
        }
        // Channel is full: the failure is logged as lost, not queued.
        tx.report(Handshake::Failed(StubError::StoppedBeforeStart));

        for _ in 0..HANDSHAKE_CAPACITY {
            assert!(matches!(rx.try_recv(), Ok(Handshake::Started)));
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_report_after_receiver_dropped() {
        let (tx, rx) = channel();
        drop(rx);
        tx.report(Handshake::Failed(StubError::StoppedBeforeStart));
        tx.report(Handshake::Stopped);
    }

    #[tokio::test]
    async fn test_drain_lost_empties_the_channel() {
        let (tx, mut rx) = channel();
        tx.report(Handshake::Stopped);
        tx.report(Handshake::Failed(StubError::StoppedBeforeStart));

        drain_lost(&mut rx);
        assert!(rx.try_recv().is_err());
    }
}
