//! Simulated supplicant daemon for driving `WifiController` in tests.
//!
//! Every command is recorded. `ADD_NETWORK` hands out increasing ids,
//! `SCAN_RESULTS` returns the configured table and everything else answers
//! `OK`. Reactions turn commands into events on the event channel, and
//! stalled commands never answer.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use wlctl::{
    CommandChannel, ConnectionError, ControllerConfig, EventChannel, Provisioner, Result,
    Transport, WifiController,
};

pub const CONNECTED: &str =
    "<3>CTRL-EVENT-CONNECTED - Connection to 00:11:22:33:44:55 completed [id=0 id_str=]";
pub const DISCONNECTED: &str =
    "<3>CTRL-EVENT-DISCONNECTED bssid=00:11:22:33:44:55 reason=3 locally_generated=1";
pub const SCAN_DONE: &str = "<2>CTRL-EVENT-SCAN-RESULTS ";

#[derive(Default)]
struct Inner {
    log: Mutex<Vec<String>>,
    next_id: AtomicU32,
    stalled: Mutex<Vec<String>>,
    delayed: Mutex<Vec<(String, Duration)>>,
    failing: Mutex<HashMap<String, String>>,
    reactions: Mutex<Vec<(String, String)>>,
    scan_table: Mutex<String>,
    events: Mutex<Option<mpsc::UnboundedSender<String>>>,
    opened: Mutex<Vec<PathBuf>>,
}

/// Handle to the simulated daemon. Clones share the same daemon.
#[derive(Clone, Default)]
pub struct FakeDaemon {
    inner: Arc<Inner>,
}

impl FakeDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    /// A daemon that links up on `ENABLE_NETWORK` and down on
    /// `DISABLE_NETWORK`, like a reachable access point.
    pub fn cooperative() -> Self {
        let daemon = Self::new();
        daemon.react("ENABLE_NETWORK", CONNECTED);
        daemon.react("DISABLE_NETWORK", DISCONNECTED);
        daemon
    }

    /// Emits `event` every time a command starting with `prefix` is handled.
    pub fn react(&self, prefix: &str, event: &str) {
        self.inner
            .reactions
            .lock()
            .unwrap()
            .push((prefix.to_string(), event.to_string()));
    }

    /// Commands starting with `prefix` never get an answer.
    pub fn stall(&self, prefix: &str) {
        self.inner.stalled.lock().unwrap().push(prefix.to_string());
    }

    /// Commands starting with `prefix` are answered after `delay`, once their
    /// reactions have been emitted.
    pub fn delay(&self, prefix: &str, delay: Duration) {
        self.inner
            .delayed
            .lock()
            .unwrap()
            .push((prefix.to_string(), delay));
    }

    /// `command` is answered with `reply` (a `FAIL*`).
    pub fn fail(&self, command: &str, reply: &str) {
        self.inner
            .failing
            .lock()
            .unwrap()
            .insert(command.to_string(), reply.to_string());
    }

    pub fn set_scan_table(&self, table: &str) {
        *self.inner.scan_table.lock().unwrap() = table.to_string();
    }

    /// Pushes an unsolicited event to the attached event channel, if any.
    pub fn emit(&self, event: &str) {
        if let Some(tx) = self.inner.events.lock().unwrap().as_ref() {
            let _ = tx.send(event.to_string());
        }
    }

    /// Every command received so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.inner.log.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.commands()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Socket paths the controller opened channels on.
    pub fn opened(&self) -> Vec<PathBuf> {
        self.inner.opened.lock().unwrap().clone()
    }

    fn is_stalled(&self, command: &str) -> bool {
        self.inner
            .stalled
            .lock()
            .unwrap()
            .iter()
            .any(|p| command.starts_with(p.as_str()))
    }

    fn delay_for(&self, command: &str) -> Option<Duration> {
        self.inner
            .delayed
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| command.starts_with(p.as_str()))
            .map(|(_, d)| *d)
    }

    fn failure(&self, command: &str) -> Option<String> {
        self.inner
            .failing
            .lock()
            .unwrap()
            .get(command)
            .cloned()
    }

    fn react_to(&self, command: &str) {
        let events: Vec<String> = self
            .inner
            .reactions
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| command.starts_with(p.as_str()))
            .map(|(_, e)| e.clone())
            .collect();
        for event in events {
            self.emit(&event);
        }
    }

    async fn handle(&self, command: &str) -> Result<String> {
        self.inner.log.lock().unwrap().push(command.to_string());

        if self.is_stalled(command) {
            std::future::pending::<()>().await;
        }
        if let Some(reply) = self.failure(command) {
            return Err(ConnectionError::CommandFailed {
                command: command.to_string(),
                reply,
            });
        }

        let reply = match command {
            "ADD_NETWORK" => format!("{}\n", self.inner.next_id.fetch_add(1, Ordering::SeqCst)),
            "SCAN_RESULTS" => self.inner.scan_table.lock().unwrap().clone(),
            _ => "OK\n".to_string(),
        };
        self.react_to(command);
        if let Some(delay) = self.delay_for(command) {
            tokio::time::sleep(delay).await;
        }
        Ok(reply)
    }
}

pub struct FakeCommands {
    daemon: FakeDaemon,
}

#[async_trait]
impl CommandChannel for FakeCommands {
    async fn request(&mut self, command: &str) -> Result<String> {
        self.daemon.handle(command).await
    }
}

pub struct FakeEvents {
    daemon: FakeDaemon,
    rx: mpsc::UnboundedReceiver<String>,
    buffered: VecDeque<String>,
}

#[async_trait]
impl EventChannel for FakeEvents {
    async fn attach(&mut self) -> Result<()> {
        self.daemon.handle("ATTACH").await.map(|_| ())
    }

    async fn detach(&mut self) -> Result<()> {
        self.daemon.handle("DETACH").await.map(|_| ())
    }

    async fn pending(&mut self) -> Result<bool> {
        if !self.buffered.is_empty() {
            return Ok(true);
        }
        match self.rx.try_recv() {
            Ok(message) => {
                self.buffered.push_back(message);
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    async fn receive(&mut self) -> Result<String> {
        if let Some(message) = self.buffered.pop_front() {
            return Ok(message);
        }
        self.rx
            .recv()
            .await
            .ok_or_else(|| std::io::Error::other("event channel closed").into())
    }
}

#[async_trait]
impl Transport for FakeDaemon {
    async fn open_command(&self, socket: &Path) -> Result<Box<dyn CommandChannel>> {
        self.inner.opened.lock().unwrap().push(socket.to_path_buf());
        Ok(Box::new(FakeCommands {
            daemon: self.clone(),
        }))
    }

    async fn open_events(&self, socket: &Path) -> Result<Box<dyn EventChannel>> {
        self.inner.opened.lock().unwrap().push(socket.to_path_buf());
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.events.lock().unwrap() = Some(tx);
        Ok(Box::new(FakeEvents {
            daemon: self.clone(),
            rx,
            buffered: VecDeque::new(),
        }))
    }
}

/// Provisioner that records its calls and can be told to fail.
#[derive(Clone, Default)]
pub struct RecordingProvisioner {
    calls: Arc<Mutex<Vec<String>>>,
    fail_fix: bool,
    fail_restore: bool,
}

impl RecordingProvisioner {
    pub fn failing_fix() -> Self {
        Self {
            fail_fix: true,
            ..Self::default()
        }
    }

    pub fn failing_restore() -> Self {
        Self {
            fail_restore: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Provisioner for RecordingProvisioner {
    async fn bring_interface_up(&self, ifname: &str) -> Result<()> {
        self.record(format!("up {ifname}"));
        Ok(())
    }

    async fn fix_socket_permissions(&self, dir: &Path) -> Result<()> {
        self.record(format!("fix {}", dir.display()));
        if self.fail_fix {
            return Err(ConnectionError::Provisioning("chgrp failed".into()));
        }
        Ok(())
    }

    async fn restore_socket_permissions(&self, dir: &Path) -> Result<()> {
        self.record(format!("restore {}", dir.display()));
        if self.fail_restore {
            return Err(ConnectionError::Provisioning("chown failed".into()));
        }
        Ok(())
    }
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Short timeouts so failure paths finish quickly.
pub fn test_config() -> ControllerConfig {
    ControllerConfig::new()
        .with_socket_dir("/run/wpa_supplicant")
        .with_interface("wlan0")
        .with_connect_timeout(ms(300))
        .with_disconnect_timeout(ms(300))
        .with_command_timeout(ms(200))
        .with_scan_timeout(ms(200))
        .with_poll_interval(ms(5))
        .with_join_timeout(ms(500))
}

pub fn controller(daemon: &FakeDaemon) -> (WifiController, RecordingProvisioner) {
    controller_with(daemon, RecordingProvisioner::default())
}

pub fn controller_with(
    daemon: &FakeDaemon,
    provisioner: RecordingProvisioner,
) -> (WifiController, RecordingProvisioner) {
    let wifi =
        WifiController::with_collaborators(test_config(), daemon.clone(), provisioner.clone());
    (wifi, provisioner)
}
