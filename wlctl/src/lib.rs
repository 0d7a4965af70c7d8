//! A Rust library for driving Wi-Fi connections through wpa_supplicant.
//!
//! This crate talks to a running wpa_supplicant daemon over its control
//! sockets and turns the daemon's fire-and-forget commands into operations
//! that wait for their outcome:
//!
//! - Starting and stopping a session on one wireless interface
//! - Connecting to open, WPA, WPA2 and mixed WPA/WPA2 networks
//! - Disconnecting, with detection of links that dropped on their own
//! - Scanning for nearby networks
//!
//! # Example
//!
//! ```no_run
//! use wlctl::{ControllerConfig, Encryption, WifiController};
//!
//! # async fn example() -> wlctl::Result<()> {
//! let mut wifi = WifiController::new(ControllerConfig::new().with_interface("wlan0"));
//! wifi.start().await?;
//!
//! // List visible networks
//! for net in wifi.scan().await? {
//!     println!("{} ({} dBm)", net.ssid, net.signal_level);
//! }
//!
//! // Connect, then release the network again
//! let id = wifi
//!     .connect("MyNetwork", Encryption::Wpa2, Some("password123"), None)
//!     .await?;
//! wifi.disconnect(true, Some(id)).await?;
//! wifi.stop().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All operations return `Result<T, ConnectionError>`. The error type separates
//! caller mistakes (`InvalidState`, `MissingCredential`,
//! `UnsupportedEncryption`), daemon trouble (`DaemonUnresponsive`,
//! `CommandFailed`) and link outcomes (`ConnectTimeout`, `DisconnectTimeout`,
//! `ConnectionLost`).
//!
//! # Event-Based State Monitoring
//!
//! While a session runs, a background task listens on the daemon's event
//! socket. `connect` and `disconnect` wait on the connection state it keeps
//! instead of polling the daemon, and a link that drops between operations is
//! remembered until [`WifiController::check_connection`] or the next
//! `disconnect` reports it.
//!
//! # Testing
//!
//! The controller only reaches the daemon through the [`Transport`] and
//! [`Provisioner`] traits, so a simulated daemon can stand in for the real one.
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`. For example:
//!
//! ```no_run,ignore
//! env_logger::init();
//! // ...
//! ```
//!
//! Pre-shared keys never appear in log output.

// Internal implementation modules
mod constants;
mod listener;
mod scan;
mod state;
mod utils;

// Public API modules
pub mod channel;
pub mod config;
pub mod controller;
pub mod models;
pub mod provision;
pub mod wpa_ctrl;

// Re-exported public API
pub use channel::{CommandChannel, EventChannel, Transport};
pub use config::ControllerConfig;
pub use controller::WifiController;
pub use listener::SupplicantEvent;
pub use models::{
    ConnectionError, Encryption, Lifecycle, NetworkId, ScanFlags, ScannedNetwork,
};
pub use provision::{NoopProvisioner, Provisioner, SystemProvisioner};
pub use scan::parse_scan_results;
pub use state::ConnectionState;
pub use wpa_ctrl::{WpaCtrl, WpaTransport};

/// A specialized `Result` type for controller operations.
pub type Result<T> = std::result::Result<T, ConnectionError>;
