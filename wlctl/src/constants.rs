//! Constants for the supplicant control protocol.
//!
//! Command verbs and event tokens understood by wpa_supplicant's control
//! interface, plus the default paths and durations the controller uses.

/// Control interface command verbs.
pub mod command {
    pub const ADD_NETWORK: &str = "ADD_NETWORK";
    pub const SET_NETWORK: &str = "SET_NETWORK";
    pub const SELECT_NETWORK: &str = "SELECT_NETWORK";
    pub const ENABLE_NETWORK: &str = "ENABLE_NETWORK";
    pub const DISABLE_NETWORK: &str = "DISABLE_NETWORK";
    pub const REMOVE_ALL_NETWORKS: &str = "REMOVE_NETWORK all";
    pub const SCAN: &str = "SCAN";
    pub const SCAN_RESULTS: &str = "SCAN_RESULTS";
    pub const ATTACH: &str = "ATTACH";
    pub const DETACH: &str = "DETACH";
}

/// Well-known reply prefixes.
pub mod reply {
    pub const OK: &str = "OK";
    pub const FAIL: &str = "FAIL";
}

/// Unsolicited event tokens (the part after `CTRL-EVENT-`).
pub mod event {
    pub const PREFIX: &str = "CTRL-EVENT-";
    pub const CONNECTED: &str = "CONNECTED";
    pub const DISCONNECTED: &str = "DISCONNECTED";
    pub const SCAN_RESULTS: &str = "SCAN-RESULTS";
}

/// Default filesystem locations and ownership.
pub mod paths {
    pub const DEFAULT_SOCKET_DIR: &str = "/var/run/wpa_supplicant";
    pub const DEFAULT_SOCKET_GROUP: &str = "netdev";
    pub const LOCAL_SOCKET_PREFIX: &str = "wlctl";
}

/// Timeout and delay constants (in milliseconds)
pub mod timeouts {
    use std::time::Duration;

    pub const CONNECT_TIMEOUT_MS: u64 = 10_000;
    pub const DISCONNECT_TIMEOUT_MS: u64 = 4_000;
    pub const COMMAND_TIMEOUT_MS: u64 = 5_000;
    pub const SCAN_TIMEOUT_MS: u64 = 3_000;
    pub const POLL_INTERVAL_MS: u64 = 100;
    pub const JOIN_TIMEOUT_MS: u64 = 2_000;

    pub fn connect_timeout() -> Duration {
        Duration::from_millis(CONNECT_TIMEOUT_MS)
    }

    pub fn disconnect_timeout() -> Duration {
        Duration::from_millis(DISCONNECT_TIMEOUT_MS)
    }

    pub fn command_timeout() -> Duration {
        Duration::from_millis(COMMAND_TIMEOUT_MS)
    }

    pub fn scan_timeout() -> Duration {
        Duration::from_millis(SCAN_TIMEOUT_MS)
    }

    pub fn poll_interval() -> Duration {
        Duration::from_millis(POLL_INTERVAL_MS)
    }

    pub fn join_timeout() -> Duration {
        Duration::from_millis(JOIN_TIMEOUT_MS)
    }
}

/// Control socket buffer sizing.
pub mod limits {
    /// Largest datagram the daemon sends (scan results included).
    pub const MAX_REPLY_LEN: usize = 65_535;
    /// Unsolicited messages tolerated while waiting for a command reply.
    pub const MAX_REPLY_ATTEMPTS: usize = 5;
}

/// WiFi frequency constants (MHz)
pub mod frequency {
    pub const BAND_2_4_START: u32 = 2412;
    pub const BAND_2_4_END: u32 = 2472;
    pub const BAND_2_4_CH14: u32 = 2484;
    pub const BAND_5_START: u32 = 5000;
    pub const BAND_5_END: u32 = 5900;
    pub const BAND_6_START: u32 = 5955;
    pub const BAND_6_END: u32 = 7115;
    pub const CHANNEL_SPACING: u32 = 5;
}
