use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::utils::channel_from_freq;

/// Lifecycle of a controller session.
///
/// `Stopped` is both the initial and the terminal state. A session moves
/// `Stopped -> Started -> Connecting -> Connected -> Disconnecting -> Started`
/// and finally back to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// No session: channels closed, listener not running.
    #[default]
    Stopped,
    /// Session open, no network selected.
    Started,
    /// A network was configured and enabled; waiting for the daemon.
    Connecting,
    /// The daemon reported the link up.
    Connected,
    /// A disable request was issued; waiting for the daemon.
    Disconnecting,
}

impl Display for Lifecycle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Started => write!(f, "started"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnecting => write!(f, "disconnecting"),
        }
    }
}

/// Identifier the daemon assigns to a configured network (`ADD_NETWORK` reply).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetworkId(pub u32);

impl NetworkId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for NetworkId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for NetworkId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Security mode requested for a new network.
///
/// Parses from the daemon-style names `NONE`, `WPA`, `WPA2` and `WPA-WPA2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encryption {
    /// Open network, no key management.
    None,
    /// WPA-PSK with any protocol.
    Wpa,
    /// WPA-PSK pinned to RSN.
    Wpa2,
    /// WPA-PSK with mixed CCMP/TKIP ciphers.
    WpaWpa2,
}

impl Encryption {
    /// Whether a pre-shared key must accompany this mode.
    pub fn requires_key(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl FromStr for Encryption {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(Self::None),
            "WPA" => Ok(Self::Wpa),
            "WPA2" => Ok(Self::Wpa2),
            "WPA-WPA2" => Ok(Self::WpaWpa2),
            other => Err(ConnectionError::UnsupportedEncryption(other.to_string())),
        }
    }
}

impl Display for Encryption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Wpa => write!(f, "WPA"),
            Self::Wpa2 => write!(f, "WPA2"),
            Self::WpaWpa2 => write!(f, "WPA-WPA2"),
        }
    }
}

bitflags! {
    /// Capabilities advertised in the flags column of `SCAN_RESULTS`,
    /// e.g. `[WPA2-PSK-CCMP][WPS][ESS]`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ScanFlags: u32 {
        const WEP  = 0x01;
        const WPA  = 0x02;
        const WPA2 = 0x04;
        const PSK  = 0x08;
        const EAP  = 0x10;
        const ESS  = 0x20;
        const IBSS = 0x40;
        const WPS  = 0x80;
    }
}

impl ScanFlags {
    /// Decodes the bracketed flag groups reported by the daemon.
    ///
    /// Unknown groups are ignored.
    pub fn parse(raw: &str) -> Self {
        let mut flags = Self::empty();
        for group in raw.split(['[', ']']).filter(|g| !g.is_empty()) {
            let mut parts = group.split('-');
            match parts.next() {
                Some("WEP") => flags |= Self::WEP,
                Some("WPA") => flags |= Self::WPA,
                Some("WPA2") | Some("RSN") => flags |= Self::WPA2,
                Some("ESS") => flags |= Self::ESS,
                Some("IBSS") => flags |= Self::IBSS,
                Some("WPS") => flags |= Self::WPS,
                _ => continue,
            }
            for part in parts {
                match part {
                    "PSK" => flags |= Self::PSK,
                    "EAP" => flags |= Self::EAP,
                    _ => {}
                }
            }
        }
        flags
    }

    /// Whether any link-layer protection is advertised.
    pub fn is_secured(self) -> bool {
        self.intersects(Self::WEP | Self::WPA | Self::WPA2)
    }
}

/// A network reported by `SCAN_RESULTS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedNetwork {
    pub bssid: String,
    /// Frequency in MHz.
    pub frequency: u32,
    /// Signal level in dBm.
    pub signal_level: i32,
    pub flags: String,
    pub ssid: String,
}

impl ScannedNetwork {
    /// Channel number derived from the frequency, if it falls in a known band.
    pub fn channel(&self) -> Option<u16> {
        channel_from_freq(self.frequency)
    }

    pub fn security(&self) -> ScanFlags {
        ScanFlags::parse(&self.flags)
    }

    pub fn is_secured(&self) -> bool {
        self.security().is_secured()
    }
}

impl Display for ScannedNetwork {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "bssid: {} frequency: {} signal level: {} flags: {} ssid: \"{}\"",
            self.bssid, self.frequency, self.signal_level, self.flags, self.ssid
        )
    }
}

/// Errors that can occur while driving the supplicant.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The operation is not allowed in the current lifecycle state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: Lifecycle,
    },

    /// A daemon request did not complete within its deadline.
    #[error("daemon did not answer '{command}' in time")]
    DaemonUnresponsive { command: String },

    /// The requested security mode needs a key and none was given.
    #[error("no key provided")]
    MissingCredential,

    /// The requested security mode is not one the controller knows.
    #[error("unsupported encryption method: {0}")]
    UnsupportedEncryption(String),

    /// The daemon did not report the link up before the deadline.
    #[error("can't connect to ssid {0}")]
    ConnectTimeout(String),

    /// The daemon did not report the link down before the grace period ended.
    #[error("can't disconnect from network {0}")]
    DisconnectTimeout(NetworkId),

    /// The link dropped since the last successful connect.
    #[error("connection lost")]
    ConnectionLost,

    /// No interface was configured before `start`.
    #[error("no Wi-Fi interface configured")]
    NoInterface,

    /// The control socket for the interface does not exist.
    #[error("control socket {0} doesn't exist")]
    SocketNotFound(PathBuf),

    /// The daemon rejected a command.
    #[error("command '{command}' failed: {reply}")]
    CommandFailed { command: String, reply: String },

    /// The daemon answered with something the controller cannot interpret.
    #[error("unexpected reply to '{command}': {reply}")]
    UnexpectedReply { command: String, reply: String },

    /// Bringing the interface up or fixing socket ownership failed.
    #[error("provisioning failed: {0}")]
    Provisioning(String),

    /// Socket I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
