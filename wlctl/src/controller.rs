use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::Result;
use crate::channel::{CommandChannel, Transport};
use crate::config::ControllerConfig;
use crate::constants::command;
use crate::listener::EventListener;
use crate::models::{ConnectionError, Encryption, Lifecycle, NetworkId, ScannedNetwork};
use crate::provision::{Provisioner, SystemProvisioner};
use crate::scan::parse_scan_results;
use crate::state::{ConnectionState, SharedState};
use crate::utils::{first_line, quoted, redact_command};
use crate::wpa_ctrl::WpaTransport;

/// Resources that only exist while a session is running.
struct Session {
    commands: Box<dyn CommandChannel>,
    listener: EventListener,
}

/// Connection-lifecycle controller for one wireless interface.
///
/// Wraps the supplicant's command channel and event channel into a single
/// object whose operations wait for the outcome they requested: `connect`
/// returns once the daemon reports the link up, `disconnect` once it reports
/// the link down, each bounded by a timeout.
///
/// Operations take `&mut self`; a controller serves one caller at a time.
/// A background task started by [`start`](Self::start) watches the event
/// channel for the whole session and records unexpected link drops, which
/// [`check_connection`](Self::check_connection) reports.
///
/// # Example
///
/// ```no_run
/// use wlctl::{ControllerConfig, Encryption, WifiController};
///
/// # async fn example() -> wlctl::Result<()> {
/// let config = ControllerConfig::new().with_interface("wlan0");
/// let mut wifi = WifiController::new(config);
///
/// wifi.start().await?;
/// let id = wifi
///     .connect("lab-net", Encryption::Wpa2, Some("s3cr3t!"), None)
///     .await?;
///
/// // ... use the link ...
///
/// wifi.check_connection(true)?;
/// wifi.disconnect(true, Some(id)).await?;
/// wifi.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct WifiController {
    config: ControllerConfig,
    transport: Arc<dyn Transport>,
    provisioner: Arc<dyn Provisioner>,
    state: SharedState,
    session: Option<Session>,
}

impl WifiController {
    /// Creates a controller that talks to wpa_supplicant's control sockets and
    /// provisions the host with system tools.
    pub fn new(config: ControllerConfig) -> Self {
        let provisioner = SystemProvisioner::new(config.socket_group.clone());
        Self::with_collaborators(config, WpaTransport, provisioner)
    }

    /// Creates a controller with a custom transport and provisioner.
    pub fn with_collaborators(
        config: ControllerConfig,
        transport: impl Transport + 'static,
        provisioner: impl Provisioner + 'static,
    ) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
            provisioner: Arc::new(provisioner),
            state: SharedState::new(),
            session: None,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle()
    }

    /// Network selected by the last successful [`connect`](Self::connect).
    pub fn active_network_id(&self) -> Option<NetworkId> {
        self.state.snapshot().active_network_id
    }

    /// Snapshot of the session state.
    pub fn state(&self) -> ConnectionState {
        self.state.snapshot()
    }

    /// Interface the controller is configured for, if any.
    pub fn interface(&self) -> Option<&str> {
        self.config.interface.as_deref()
    }

    /// Changes the controlled interface.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` once the controller is started.
    pub fn set_interface(&mut self, ifname: impl Into<String>) -> Result<()> {
        self.require("change interface", &[Lifecycle::Stopped])?;
        self.config.interface = Some(ifname.into());
        Ok(())
    }

    /// Starts a session.
    ///
    /// Prepares the host, opens both control channels, starts the event
    /// listener and removes every network the daemon has configured.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if already started
    /// - `NoInterface` if no interface is configured
    /// - `Provisioning` if the host could not be prepared (nothing is opened)
    /// - `DaemonUnresponsive` if the daemon does not answer within
    ///   `command_timeout`; the session is torn down again
    pub async fn start(&mut self) -> Result<()> {
        self.require("start", &[Lifecycle::Stopped])?;
        let (Some(ifname), Some(socket)) =
            (self.config.interface.clone(), self.config.socket_path())
        else {
            return Err(ConnectionError::NoInterface);
        };

        self.provisioner
            .fix_socket_permissions(&self.config.socket_dir)
            .await?;
        self.provisioner.bring_interface_up(&ifname).await?;

        let commands = self.transport.open_command(&socket).await?;
        let mut events = self.transport.open_events(&socket).await?;
        match timeout(self.config.command_timeout, events.attach()).await {
            Ok(attached) => attached?,
            Err(_) => {
                return Err(ConnectionError::DaemonUnresponsive {
                    command: command::ATTACH.to_string(),
                });
            }
        }

        self.state.reset();
        self.state.update(|s| s.lifecycle = Lifecycle::Started);
        let listener = EventListener::spawn(events, self.state.clone(), self.config.poll_interval);
        self.session = Some(Session { commands, listener });

        if let Err(e) = self.request(command::REMOVE_ALL_NETWORKS).await {
            warn!("Failed to clear configured networks: {e}");
            self.teardown().await;
            return Err(e);
        }

        info!("WiFi controller started on {}", socket.display());
        Ok(())
    }

    /// Ends the session.
    ///
    /// Networks configured on the daemon are left in place; disconnect first
    /// to release the active one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the controller is started or connected.
    pub async fn stop(&mut self) -> Result<()> {
        let state = self.require("stop", &[Lifecycle::Started, Lifecycle::Connected])?;
        if state == Lifecycle::Connected
            && let Some(id) = self.active_network_id()
        {
            warn!("Stopping while connected; network {id} stays configured");
        }

        self.teardown().await;

        if let Err(e) = self
            .provisioner
            .restore_socket_permissions(&self.config.socket_dir)
            .await
        {
            warn!("Failed to restore control socket ownership: {e}");
        }

        info!("WiFi controller stopped");
        Ok(())
    }

    /// Stops and starts the controller again.
    pub async fn restart(&mut self) -> Result<()> {
        self.stop().await?;
        self.start().await
    }

    /// Configures a network and waits for the daemon to connect to it.
    ///
    /// `wait` defaults to the configured connect timeout.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless the controller is started and not connected
    /// - `MissingCredential` if the mode needs a key and none (or an empty
    ///   one) was given; nothing is sent to the daemon
    /// - `ConnectTimeout` if the link does not come up in time. The network
    ///   entry stays configured on the daemon.
    pub async fn connect(
        &mut self,
        ssid: &str,
        encryption: Encryption,
        key: Option<&str>,
        wait: Option<Duration>,
    ) -> Result<NetworkId> {
        self.require("connect", &[Lifecycle::Started])?;
        let key = match key {
            _ if !encryption.requires_key() => None,
            Some(key) if !key.is_empty() => Some(key),
            _ => return Err(ConnectionError::MissingCredential),
        };
        let limit = wait.unwrap_or(self.config.connect_timeout);

        debug!("Connecting to '{ssid}' | encryption={encryption}");
        self.state.update(|s| s.lifecycle = Lifecycle::Connecting);

        match self.try_connect(ssid, encryption, key, limit).await {
            Ok(id) => {
                info!("Connected to ssid {ssid} (network {id})");
                Ok(id)
            }
            Err(e) => {
                self.state.update(|s| s.lifecycle = Lifecycle::Started);
                Err(e)
            }
        }
    }

    async fn try_connect(
        &mut self,
        ssid: &str,
        encryption: Encryption,
        key: Option<&str>,
        limit: Duration,
    ) -> Result<NetworkId> {
        let id = self.add_network().await?;
        self.set_network(id, "ssid", &quoted(ssid)).await?;
        self.configure_security(id, encryption, key).await?;

        self.state.update(|s| {
            s.unexpected_disconnect = false;
            s.connected_signal = false;
            s.watching_for_unexpected = false;
        });
        self.request(&format!("{} {id}", command::SELECT_NETWORK))
            .await?;
        self.request(&format!("{} {id}", command::ENABLE_NETWORK))
            .await?;

        if !self.state.wait_for_connected(limit).await {
            warn!("Connection to '{ssid}' timed out after {limit:?}");
            return Err(ConnectionError::ConnectTimeout(ssid.to_string()));
        }

        self.state.update(|s| {
            s.lifecycle = Lifecycle::Connected;
            s.active_network_id = Some(id);
            s.watching_for_unexpected = true;
            s.disconnected_signal = false;
        });
        Ok(id)
    }

    async fn configure_security(
        &mut self,
        id: NetworkId,
        encryption: Encryption,
        key: Option<&str>,
    ) -> Result<()> {
        match encryption {
            Encryption::None => {
                return self.set_network(id, "key_mgmt", "NONE").await;
            }
            Encryption::Wpa => {
                self.set_network(id, "key_mgmt", "WPA-PSK").await?;
            }
            Encryption::Wpa2 => {
                self.set_network(id, "key_mgmt", "WPA-PSK").await?;
                self.set_network(id, "proto", "RSN").await?;
            }
            Encryption::WpaWpa2 => {
                self.set_network(id, "key_mgmt", "WPA-PSK").await?;
                self.set_network(id, "pairwise", "CCMP TKIP").await?;
                self.set_network(id, "group", "CCMP TKIP").await?;
            }
        }

        match key {
            Some(key) => self.set_network(id, "psk", &quoted(key)).await,
            None => Err(ConnectionError::MissingCredential),
        }
    }

    /// Disables the active network and waits for the link to go down.
    ///
    /// `network_id` defaults to the network selected by the last connect. If
    /// the link already dropped on its own, the wait is skipped.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless the controller is connected
    /// - `ConnectionLost` if `raise_on_unexpected` is set and the link dropped
    ///   since the last connect; nothing is sent and the controller stays
    ///   connected, so a later `disconnect(false, ..)` can still clean up
    /// - `DisconnectTimeout` if the daemon does not report the link down
    ///   within the disconnect grace period
    pub async fn disconnect(
        &mut self,
        raise_on_unexpected: bool,
        network_id: Option<NetworkId>,
    ) -> Result<()> {
        let state = self.require("disconnect", &[Lifecycle::Connected])?;
        let id = network_id
            .or_else(|| self.active_network_id())
            .ok_or(ConnectionError::InvalidState {
                operation: "disconnect",
                state,
            })?;

        let mut link_down = false;
        self.state.update(|s| {
            s.watching_for_unexpected = false;
            link_down = s.unexpected_disconnect;
            s.disconnected_signal = false;
        });

        if raise_on_unexpected {
            self.check_connection(true)?;
        }

        self.state.update(|s| {
            s.unexpected_disconnect = false;
            s.lifecycle = Lifecycle::Disconnecting;
        });

        if let Err(e) = self
            .request(&format!("{} {id}", command::DISABLE_NETWORK))
            .await
        {
            self.state.update(|s| s.lifecycle = Lifecycle::Connected);
            return Err(e);
        }

        if link_down {
            debug!("Link already down, not waiting for disconnection");
        } else if !self
            .state
            .wait_for_disconnected(self.config.disconnect_timeout)
            .await
        {
            warn!(
                "Disconnect from network {id} timed out after {:?}",
                self.config.disconnect_timeout
            );
            self.state.update(|s| s.lifecycle = Lifecycle::Connected);
            return Err(ConnectionError::DisconnectTimeout(id));
        }

        self.state.update(|s| {
            s.active_network_id = None;
            s.connected_signal = false;
            s.lifecycle = Lifecycle::Started;
        });

        info!("Disconnected from network {id}");
        Ok(())
    }

    /// Reports whether the link has stayed up since the last connect.
    ///
    /// Returns `false` after an unexpected disconnection, `true` otherwise.
    /// Never blocks and never changes the state.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionLost` instead of `false` when `raise_on_unexpected`
    /// is set.
    pub fn check_connection(&self, raise_on_unexpected: bool) -> Result<bool> {
        let lost = self.state.snapshot().unexpected_disconnect;
        if lost && raise_on_unexpected {
            return Err(ConnectionError::ConnectionLost);
        }
        Ok(!lost)
    }

    /// Scans for networks.
    ///
    /// Waits up to the configured scan timeout for the daemon to announce
    /// fresh results, then reads whatever results it has.
    pub async fn scan(&mut self) -> Result<Vec<ScannedNetwork>> {
        self.require("scan", &[Lifecycle::Started, Lifecycle::Connected])?;

        self.state.update(|s| s.scan_signal = false);
        match self.request(command::SCAN).await {
            Ok(_) => {}
            Err(ConnectionError::CommandFailed { reply, .. }) if reply == "FAIL-BUSY" => {
                debug!("Scan already in progress");
            }
            Err(e) => return Err(e),
        }

        if !self
            .state
            .wait_for_scan_results(self.config.scan_timeout)
            .await
        {
            debug!("No scan completion event, reading current results");
        }

        let raw = self.request(command::SCAN_RESULTS).await?;
        let networks = parse_scan_results(&raw);
        debug!("Scan found {} networks", networks.len());
        Ok(networks)
    }

    /// Scans and writes every network found to the log.
    pub async fn log_scanned_networks(&mut self) -> Result<()> {
        for net in self.scan().await? {
            info!("{net}");
        }
        Ok(())
    }

    fn require(&self, operation: &'static str, allowed: &[Lifecycle]) -> Result<Lifecycle> {
        let state = self.state.lifecycle();
        if allowed.contains(&state) {
            Ok(state)
        } else {
            Err(ConnectionError::InvalidState { operation, state })
        }
    }

    /// Sends one command, bounded by the command timeout.
    async fn request(&mut self, cmd: &str) -> Result<String> {
        let state = self.state.lifecycle();
        let limit = self.config.command_timeout;
        let session = self
            .session
            .as_mut()
            .ok_or(ConnectionError::InvalidState {
                operation: "send commands",
                state,
            })?;

        debug!("Sending {}", redact_command(cmd));
        match timeout(limit, session.commands.request(cmd)).await {
            Ok(reply) => reply,
            Err(_) => {
                warn!(
                    "Daemon did not answer '{}' within {limit:?}",
                    redact_command(cmd)
                );
                Err(ConnectionError::DaemonUnresponsive {
                    command: redact_command(cmd),
                })
            }
        }
    }

    async fn add_network(&mut self) -> Result<NetworkId> {
        let reply = self.request(command::ADD_NETWORK).await?;
        first_line(&reply)
            .parse::<u32>()
            .map(NetworkId)
            .map_err(|_| ConnectionError::UnexpectedReply {
                command: command::ADD_NETWORK.to_string(),
                reply: reply.trim().to_string(),
            })
    }

    async fn set_network(&mut self, id: NetworkId, field: &str, value: &str) -> Result<()> {
        self.request(&format!("{} {id} {field} {value}", command::SET_NETWORK))
            .await
            .map(|_| ())
    }

    /// Stops the listener, closes both channels and resets the state.
    async fn teardown(&mut self) {
        if let Some(Session { commands, listener }) = self.session.take() {
            listener.shutdown(self.config.join_timeout).await;
            drop(commands);
        }
        self.state.reset();
    }
}
