//! Controller configuration.
//!
//! Every duration the controller waits on, and the location of the daemon's
//! control sockets, is set here. Defaults suit a stock wpa_supplicant setup:
//!
//! ```
//! use std::time::Duration;
//! use wlctl::ControllerConfig;
//!
//! let config = ControllerConfig::new()
//!     .with_interface("wlan0")
//!     .with_connect_timeout(Duration::from_secs(30));
//!
//! assert_eq!(
//!     config.socket_path().unwrap(),
//!     std::path::Path::new("/var/run/wpa_supplicant/wlan0")
//! );
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{paths, timeouts};

/// Paths and timeouts used by [`WifiController`](crate::WifiController).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Directory holding the daemon's per-interface control sockets.
    pub socket_dir: PathBuf,
    /// Wireless interface to control. Must be set before `start`.
    pub interface: Option<String>,
    /// Group granted access to `socket_dir` while a session is running.
    pub socket_group: String,
    /// Default wait for the link to come up in `connect`.
    pub connect_timeout: Duration,
    /// Grace period for the link to go down in `disconnect`.
    pub disconnect_timeout: Duration,
    /// Deadline for a single daemon request.
    pub command_timeout: Duration,
    /// Wait for `CTRL-EVENT-SCAN-RESULTS` after requesting a scan.
    pub scan_timeout: Duration,
    /// How often the event listener polls its channel.
    pub poll_interval: Duration,
    /// How long `stop` waits for the event listener to exit.
    pub join_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            socket_dir: PathBuf::from(paths::DEFAULT_SOCKET_DIR),
            interface: None,
            socket_group: paths::DEFAULT_SOCKET_GROUP.to_string(),
            connect_timeout: timeouts::connect_timeout(),
            disconnect_timeout: timeouts::disconnect_timeout(),
            command_timeout: timeouts::command_timeout(),
            scan_timeout: timeouts::scan_timeout(),
            poll_interval: timeouts::poll_interval(),
            join_timeout: timeouts::join_timeout(),
        }
    }
}

impl ControllerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_socket_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.socket_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_interface(mut self, ifname: impl Into<String>) -> Self {
        self.interface = Some(ifname.into());
        self
    }

    pub fn with_socket_group(mut self, group: impl Into<String>) -> Self {
        self.socket_group = group.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_disconnect_timeout(mut self, timeout: Duration) -> Self {
        self.disconnect_timeout = timeout;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Control socket of the configured interface, if one is set.
    pub fn socket_path(&self) -> Option<PathBuf> {
        self.interface
            .as_deref()
            .map(|ifname| self.socket_dir.join(ifname))
    }
}
