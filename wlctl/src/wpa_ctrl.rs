//! Unix datagram transport to wpa_supplicant's control interface.
//!
//! Each [`WpaCtrl`] binds its own local socket in the temp directory and
//! connects it to the daemon's per-interface socket (`<socket_dir>/<ifname>`).
//! Commands and replies are single datagrams. A monitor connection receives
//! `<N>CTRL-EVENT-...` notifications after `ATTACH`.

use async_trait::async_trait;
use log::{debug, trace};
use std::collections::VecDeque;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::net::UnixDatagram;
use uuid::Uuid;

use crate::Result;
use crate::channel::{CommandChannel, EventChannel, Transport};
use crate::constants::{command, limits, paths, reply};
use crate::models::ConnectionError;
use crate::utils::redact_command;

/// Removes the local socket file when the connection goes away.
struct LocalSocketCleanup {
    path: PathBuf,
}

impl Drop for LocalSocketCleanup {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn build_local_socket_path(control_path: &Path) -> PathBuf {
    let iface: String = control_path
        .file_name()
        .map(|name| name.to_string_lossy().chars().take(16).collect())
        .unwrap_or_default();
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    let filename = format!("{}_{}_{}", paths::LOCAL_SOCKET_PREFIX, iface, suffix);
    std::env::temp_dir().join(filename)
}

/// A connection to one control socket.
///
/// Used both as a [`CommandChannel`] and, once attached, as an
/// [`EventChannel`].
pub struct WpaCtrl {
    socket: UnixDatagram,
    control_path: PathBuf,
    buf: Vec<u8>,
    stashed: VecDeque<String>,
    _cleanup: LocalSocketCleanup,
}

impl WpaCtrl {
    /// Connects to the control socket at `control_path`.
    ///
    /// # Errors
    ///
    /// Returns `SocketNotFound` if the socket does not exist, or an I/O error
    /// if the local socket cannot be bound or connected.
    pub fn open(control_path: &Path) -> Result<Self> {
        if !control_path.exists() {
            return Err(ConnectionError::SocketNotFound(control_path.to_path_buf()));
        }

        let local_path = build_local_socket_path(control_path);
        if local_path.exists() {
            let _ = fs::remove_file(&local_path);
        }

        let socket = UnixDatagram::bind(&local_path)?;
        let cleanup = LocalSocketCleanup { path: local_path };
        socket.connect(control_path)?;

        debug!("Opened control connection to {}", control_path.display());

        Ok(Self {
            socket,
            control_path: control_path.to_path_buf(),
            buf: vec![0u8; limits::MAX_REPLY_LEN],
            stashed: VecDeque::new(),
            _cleanup: cleanup,
        })
    }

    /// Path of the daemon socket this connection talks to.
    pub fn control_path(&self) -> &Path {
        &self.control_path
    }

    async fn recv_message(&mut self) -> Result<String> {
        let n = self.socket.recv(&mut self.buf).await?;
        Ok(String::from_utf8_lossy(&self.buf[..n]).into_owned())
    }

    /// Clears datagrams that arrived while no request was waiting.
    ///
    /// A request abandoned after its deadline still gets answered eventually;
    /// that late reply must not be taken for the answer to the next command.
    /// Events are kept for the event side.
    fn discard_stale_replies(&mut self) -> Result<()> {
        loop {
            match self.socket.try_recv(&mut self.buf) {
                Ok(n) => {
                    let message = String::from_utf8_lossy(&self.buf[..n]).into_owned();
                    if message.starts_with('<') {
                        self.stashed.push_back(message);
                    } else if !message.is_empty() {
                        debug!("Discarding stale reply: {}", message.trim_end());
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn expect_ok(&mut self, cmd: &str) -> Result<()> {
        let response = self.request(cmd).await?;
        if response.trim() == reply::OK {
            Ok(())
        } else {
            Err(ConnectionError::UnexpectedReply {
                command: cmd.to_string(),
                reply: response.trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl CommandChannel for WpaCtrl {
    async fn request(&mut self, cmd: &str) -> Result<String> {
        self.discard_stale_replies()?;

        trace!("-> {}", redact_command(cmd));
        let sent = self.socket.send(cmd.as_bytes()).await?;
        if sent != cmd.len() {
            return Err(ConnectionError::Io(std::io::Error::new(
                ErrorKind::WriteZero,
                format!("short write ({sent} of {} bytes)", cmd.len()),
            )));
        }

        for _ in 0..limits::MAX_REPLY_ATTEMPTS {
            let response = self.recv_message().await?;
            if response.is_empty() {
                continue;
            }
            if response.starts_with('<') {
                // Unsolicited event on a monitor connection.
                self.stashed.push_back(response);
                continue;
            }
            if response.starts_with(reply::FAIL) {
                return Err(ConnectionError::CommandFailed {
                    command: redact_command(cmd),
                    reply: response.trim().to_string(),
                });
            }
            trace!("<- {}", response.trim_end());
            return Ok(response);
        }

        Err(ConnectionError::UnexpectedReply {
            command: redact_command(cmd),
            reply: "no reply".to_string(),
        })
    }
}

#[async_trait]
impl EventChannel for WpaCtrl {
    async fn attach(&mut self) -> Result<()> {
        self.expect_ok(command::ATTACH).await
    }

    async fn detach(&mut self) -> Result<()> {
        self.expect_ok(command::DETACH).await
    }

    async fn pending(&mut self) -> Result<bool> {
        if !self.stashed.is_empty() {
            return Ok(true);
        }
        match self.socket.try_recv(&mut self.buf) {
            Ok(n) => {
                let message = String::from_utf8_lossy(&self.buf[..n]).into_owned();
                self.stashed.push_back(message);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn receive(&mut self) -> Result<String> {
        match self.stashed.pop_front() {
            Some(message) => Ok(message),
            None => self.recv_message().await,
        }
    }
}

/// Opens [`WpaCtrl`] connections for the controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct WpaTransport;

#[async_trait]
impl Transport for WpaTransport {
    async fn open_command(&self, socket: &Path) -> Result<Box<dyn CommandChannel>> {
        Ok(Box::new(WpaCtrl::open(socket)?))
    }

    async fn open_events(&self, socket: &Path) -> Result<Box<dyn EventChannel>> {
        Ok(Box::new(WpaCtrl::open(socket)?))
    }
}
