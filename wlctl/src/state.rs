//! Shared connection state and bounded waits on it.
//!
//! The event listener and the controller share one [`ConnectionState`]. It
//! lives inside a `tokio::sync::watch` channel: every mutation happens under
//! the channel's lock and wakes every waiter, and a waiter re-checks its
//! predicate against the current value before and after each wake. A signal
//! set before the waiter starts waiting is therefore still observed, and
//! spurious wakes are harmless.
//!
//! The `*_signal` fields behave like latched events: the listener sets them,
//! the controller clears them right before it starts the operation whose
//! outcome it is going to wait for.

use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::models::{Lifecycle, NetworkId};

/// Mutable record of one controller session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub lifecycle: Lifecycle,
    pub active_network_id: Option<NetworkId>,
    /// Set when the link dropped while it was expected to stay up.
    pub unexpected_disconnect: bool,
    /// Whether a `DISCONNECTED` event should count as unexpected.
    pub watching_for_unexpected: bool,
    pub connected_signal: bool,
    pub disconnected_signal: bool,
    pub scan_signal: bool,
}

/// Handle to the state shared between the listener and the controller.
#[derive(Debug, Clone)]
pub(crate) struct SharedState {
    tx: Arc<watch::Sender<ConnectionState>>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Copy of the current state.
    pub(crate) fn snapshot(&self) -> ConnectionState {
        self.tx.borrow().clone()
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        self.tx.borrow().lifecycle
    }

    /// Mutates the state under the lock and wakes all waiters.
    pub(crate) fn update(&self, f: impl FnOnce(&mut ConnectionState)) {
        self.tx.send_modify(f);
    }

    /// Resets every field, returning the session to `Stopped`.
    pub(crate) fn reset(&self) {
        self.update(|state| *state = ConnectionState::default());
    }

    /// Waits until `predicate` holds or `limit` elapses.
    ///
    /// Returns `true` if the predicate was observed to hold.
    pub(crate) async fn wait_until(
        &self,
        limit: Duration,
        predicate: impl FnMut(&ConnectionState) -> bool,
    ) -> bool {
        let mut rx = self.tx.subscribe();
        match timeout(limit, rx.wait_for(predicate)).await {
            Ok(Ok(_)) => true,
            Ok(Err(_)) => false,
            Err(_) => {
                debug!("Wait on connection state timed out after {limit:?}");
                false
            }
        }
    }

    pub(crate) async fn wait_for_connected(&self, limit: Duration) -> bool {
        self.wait_until(limit, |s| s.connected_signal).await
    }

    pub(crate) async fn wait_for_disconnected(&self, limit: Duration) -> bool {
        self.wait_until(limit, |s| s.disconnected_signal).await
    }

    pub(crate) async fn wait_for_scan_results(&self, limit: Duration) -> bool {
        self.wait_until(limit, |s| s.scan_signal).await
    }
}
