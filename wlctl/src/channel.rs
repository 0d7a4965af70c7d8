//! Collaborator interfaces to the supplicant's two control channels.
//!
//! The daemon exposes a request/response channel and a notification channel.
//! The controller only ever talks to them through these traits, so the real
//! socket transport in [`wpa_ctrl`](crate::wpa_ctrl) can be swapped for a
//! simulated daemon in tests.

use async_trait::async_trait;
use std::path::Path;

use crate::Result;

/// Synchronous request/response channel.
#[async_trait]
pub trait CommandChannel: Send {
    /// Sends `command` and returns the daemon's full reply.
    ///
    /// Completes only once the daemon answers. Callers that need a deadline
    /// wrap the returned future in a timeout.
    async fn request(&mut self, command: &str) -> Result<String>;
}

/// Unsolicited notification channel.
#[async_trait]
pub trait EventChannel: Send {
    /// Registers this channel as an event monitor.
    async fn attach(&mut self) -> Result<()>;

    /// Unregisters the monitor. Called once when the listener exits.
    async fn detach(&mut self) -> Result<()>;

    /// Returns `true` if a message can be received without waiting.
    async fn pending(&mut self) -> Result<bool>;

    /// Returns the next message.
    async fn receive(&mut self) -> Result<String>;
}

/// Opens both channels for a control socket.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open_command(&self, socket: &Path) -> Result<Box<dyn CommandChannel>>;

    async fn open_events(&self, socket: &Path) -> Result<Box<dyn EventChannel>>;
}
