//! Host preparation around a controller session.
//!
//! Before the control sockets can be opened the wireless interface must be up
//! and the socket directory must be reachable by the calling user. After the
//! session ends, ownership is handed back to root.

use async_trait::async_trait;
use log::debug;
use std::path::Path;
use tokio::process::Command;

use crate::Result;
use crate::models::ConnectionError;

/// Operating-system side of a session.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Brings the network interface administratively up.
    async fn bring_interface_up(&self, ifname: &str) -> Result<()>;

    /// Grants the session's group access to the control socket directory.
    async fn fix_socket_permissions(&self, dir: &Path) -> Result<()>;

    /// Returns the control socket directory to root ownership.
    async fn restore_socket_permissions(&self, dir: &Path) -> Result<()>;
}

/// Provisions the host with `ip`, `chgrp` and `chown`.
#[derive(Debug, Clone)]
pub struct SystemProvisioner {
    group: String,
    use_sudo: bool,
}

impl SystemProvisioner {
    /// Creates a provisioner that hands the socket directory to `group`.
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            use_sudo: false,
        }
    }

    /// Runs every command through `sudo`.
    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    fn program_args<'a>(&self, program: &'a str, args: &[&'a str]) -> (&'a str, Vec<&'a str>) {
        if self.use_sudo {
            let mut full = Vec::with_capacity(args.len() + 1);
            full.push(program);
            full.extend_from_slice(args);
            ("sudo", full)
        } else {
            (program, args.to_vec())
        }
    }

    async fn run(&self, program: &str, args: &[&str]) -> Result<()> {
        let (program, args) = self.program_args(program, args);
        debug!("Running {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(&args)
            .output()
            .await
            .map_err(|e| ConnectionError::Provisioning(format!("failed to run {program}: {e}")))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ConnectionError::Provisioning(format!(
                "{} {} exited with {}: {}",
                program,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

#[async_trait]
impl Provisioner for SystemProvisioner {
    async fn bring_interface_up(&self, ifname: &str) -> Result<()> {
        self.run("ip", &["link", "set", ifname, "up"]).await
    }

    async fn fix_socket_permissions(&self, dir: &Path) -> Result<()> {
        let dir = dir.to_string_lossy();
        self.run("chgrp", &["-R", &self.group, &dir]).await
    }

    async fn restore_socket_permissions(&self, dir: &Path) -> Result<()> {
        let dir = dir.to_string_lossy();
        self.run("chown", &["-R", "root:root", &dir]).await
    }
}

/// Leaves the host untouched, for setups where the interface and sockets are
/// managed elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProvisioner;

#[async_trait]
impl Provisioner for NoopProvisioner {
    async fn bring_interface_up(&self, _ifname: &str) -> Result<()> {
        Ok(())
    }

    async fn fix_socket_permissions(&self, _dir: &Path) -> Result<()> {
        Ok(())
    }

    async fn restore_socket_permissions(&self, _dir: &Path) -> Result<()> {
        Ok(())
    }
}
