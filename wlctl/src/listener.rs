//! Background event listener.
//!
//! One tokio task per session owns the event channel. It drains every pending
//! notification, classifies it, and updates the shared [`ConnectionState`]
//! (which wakes anyone waiting on it). Between drains it sleeps for the poll
//! interval or until told to quit, whichever comes first.
//!
//! Notifications look like `<3>CTRL-EVENT-CONNECTED - Connection to ...`.
//! Only the token after `CTRL-EVENT-` matters; anything unrecognized is
//! ignored so newer daemons cannot break monitoring.
//!
//! [`ConnectionState`]: crate::state::ConnectionState

use log::{debug, trace, warn};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::channel::EventChannel;
use crate::constants::event;
use crate::state::SharedState;

/// Notification classes the controller reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupplicantEvent {
    Connected,
    Disconnected,
    ScanResults,
    /// Any other `CTRL-EVENT-*` token.
    Other(String),
}

impl SupplicantEvent {
    /// Classifies a raw notification.
    ///
    /// Returns `None` for messages that are not `CTRL-EVENT-*` notifications.
    pub fn parse(message: &str) -> Option<Self> {
        let body = strip_priority(message.trim_start());
        let rest = body.strip_prefix(event::PREFIX)?;

        let token_len = rest
            .find(|c: char| !(c.is_ascii_uppercase() || c == '-' || c == '_'))
            .unwrap_or(rest.len());
        let token = &rest[..token_len];
        if token.is_empty() {
            return None;
        }

        Some(match token {
            event::CONNECTED => Self::Connected,
            event::DISCONNECTED => Self::Disconnected,
            event::SCAN_RESULTS => Self::ScanResults,
            other => Self::Other(other.to_string()),
        })
    }
}

/// Drops a leading `<N>` priority marker.
fn strip_priority(message: &str) -> &str {
    if let Some(rest) = message.strip_prefix('<')
        && let Some(end) = rest.find('>')
        && rest[..end].chars().all(|c| c.is_ascii_digit())
    {
        return &rest[end + 1..];
    }
    message
}

/// Applies one notification to the shared state.
pub(crate) fn apply_event(state: &SharedState, event: &SupplicantEvent) {
    match event {
        SupplicantEvent::Disconnected => {
            let mut unexpected = false;
            state.update(|s| {
                s.disconnected_signal = true;
                if s.watching_for_unexpected {
                    s.unexpected_disconnect = true;
                    unexpected = true;
                }
            });
            if unexpected {
                debug!("Unexpected disconnection");
            }
        }
        SupplicantEvent::Connected => state.update(|s| s.connected_signal = true),
        SupplicantEvent::ScanResults => state.update(|s| s.scan_signal = true),
        SupplicantEvent::Other(token) => trace!("Ignoring event {token}"),
    }
}

/// Handle to a running listener task.
pub(crate) struct EventListener {
    quit: CancellationToken,
    handle: JoinHandle<()>,
}

impl EventListener {
    /// Spawns the listener on the current runtime.
    ///
    /// `events` must already be attached.
    pub(crate) fn spawn(
        events: Box<dyn EventChannel>,
        state: SharedState,
        poll_interval: Duration,
    ) -> Self {
        let quit = CancellationToken::new();
        let handle = tokio::spawn(run(events, state, quit.clone(), poll_interval));
        Self { quit, handle }
    }

    /// Tells the listener to quit and waits up to `limit` for it to finish.
    ///
    /// A listener that overruns is aborted.
    pub(crate) async fn shutdown(mut self, limit: Duration) {
        self.quit.cancel();
        match tokio::time::timeout(limit, &mut self.handle).await {
            Ok(Ok(())) => debug!("Event listener stopped"),
            Ok(Err(e)) => warn!("Event listener ended abnormally: {e}"),
            Err(_) => {
                warn!("Event listener did not stop within {limit:?}, aborting");
                self.handle.abort();
            }
        }
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        self.quit.cancel();
    }
}

async fn run(
    mut events: Box<dyn EventChannel>,
    state: SharedState,
    quit: CancellationToken,
    poll_interval: Duration,
) {
    debug!("Event listener running");

    while !quit.is_cancelled() {
        drain(events.as_mut(), &state, &quit).await;

        tokio::select! {
            _ = quit.cancelled() => break,
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }

    if let Err(e) = events.detach().await {
        warn!("Failed to detach event channel: {e}");
    }
    debug!("Event listener exiting");
}

/// Receives and applies every message that is already waiting.
async fn drain(events: &mut dyn EventChannel, state: &SharedState, quit: &CancellationToken) {
    while !quit.is_cancelled() {
        match events.pending().await {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                warn!("Failed to poll event channel: {e}");
                return;
            }
        }

        let message = match events.receive().await {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to receive event: {e}");
                return;
            }
        };
        debug!("{}", message.trim_end());

        if let Some(event) = SupplicantEvent::parse(&message) {
            apply_event(state, &event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[test]
    fn parse_connected_and_disconnected() {
        assert_eq!(
            SupplicantEvent::parse(
                "<3>CTRL-EVENT-CONNECTED - Connection to 00:11:22:33:44:55 completed [id=0 id_str=]"
            ),
            Some(SupplicantEvent::Connected)
        );
        assert_eq!(
            SupplicantEvent::parse(
                "<3>CTRL-EVENT-DISCONNECTED bssid=00:11:22:33:44:55 reason=3 locally_generated=1"
            ),
            Some(SupplicantEvent::Disconnected)
        );
    }

    #[test]
    fn parse_without_priority_marker() {
        assert_eq!(
            SupplicantEvent::parse("CTRL-EVENT-CONNECTED"),
            Some(SupplicantEvent::Connected)
        );
    }

    #[test]
    fn parse_scan_results_and_other_tokens() {
        assert_eq!(
            SupplicantEvent::parse("<2>CTRL-EVENT-SCAN-RESULTS "),
            Some(SupplicantEvent::ScanResults)
        );
        assert_eq!(
            SupplicantEvent::parse("<3>CTRL-EVENT-SSID-TEMP-DISABLED id=0 ssid=\"lab-net\""),
            Some(SupplicantEvent::Other("SSID-TEMP-DISABLED".into()))
        );
    }

    #[test]
    fn parse_rejects_non_events() {
        assert_eq!(SupplicantEvent::parse("OK"), None);
        assert_eq!(SupplicantEvent::parse("<3>WPA: Key negotiation completed"), None);
        assert_eq!(SupplicantEvent::parse("<3>CTRL-EVENT-"), None);
        assert_eq!(SupplicantEvent::parse(""), None);
    }

    #[test]
    fn disconnect_counts_as_unexpected_only_when_watching() {
        let state = SharedState::new();
        apply_event(&state, &SupplicantEvent::Disconnected);
        let snap = state.snapshot();
        assert!(snap.disconnected_signal);
        assert!(!snap.unexpected_disconnect);

        state.update(|s| {
            s.disconnected_signal = false;
            s.watching_for_unexpected = true;
        });
        apply_event(&state, &SupplicantEvent::Disconnected);
        let snap = state.snapshot();
        assert!(snap.disconnected_signal);
        assert!(snap.unexpected_disconnect);
    }

    #[test]
    fn other_events_leave_state_untouched() {
        let state = SharedState::new();
        apply_event(&state, &SupplicantEvent::Other("BSS-ADDED".into()));
        assert_eq!(state.snapshot(), crate::state::ConnectionState::default());
    }

    #[derive(Default)]
    struct Scripted {
        queue: Arc<Mutex<VecDeque<String>>>,
        detached: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl EventChannel for Scripted {
        async fn attach(&mut self) -> Result<()> {
            Ok(())
        }

        async fn detach(&mut self) -> Result<()> {
            *self.detached.lock().unwrap() = true;
            Ok(())
        }

        async fn pending(&mut self) -> Result<bool> {
            Ok(!self.queue.lock().unwrap().is_empty())
        }

        async fn receive(&mut self) -> Result<String> {
            Ok(self.queue.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn listener_applies_events_and_detaches_on_shutdown() {
        let channel = Scripted::default();
        let queue = channel.queue.clone();
        let detached = channel.detached.clone();
        let state = SharedState::new();

        let listener = EventListener::spawn(
            Box::new(channel),
            state.clone(),
            Duration::from_millis(10),
        );

        queue
            .lock()
            .unwrap()
            .extend(["garbage".to_string(), "<3>CTRL-EVENT-CONNECTED".to_string()]);
        assert!(state.wait_for_connected(Duration::from_secs(2)).await);

        listener.shutdown(Duration::from_secs(2)).await;
        assert!(*detached.lock().unwrap());
    }
}
