//! Zone Manager Configuration
//!
//! Loaded from a TOML file; every field has a default so a partial file (or
//! no file at all) is enough to run against the standard zone.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::zone::Skeleton;

/// Main configuration for the zone manager
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    // === Zone ===

    /// Zone file managed by this service
    pub zone_file: PathBuf,

    /// Write the default skeleton when the zone file is missing at startup
    pub create_if_missing: bool,

    /// Reload the name server after every successful Add/Delete
    pub auto_reload: bool,

    // === Network ===

    /// Address the HTTP API binds to
    pub listen_address: String,

    /// Port for HTTP API
    pub api_port: u16,

    // === Sub-sections ===

    /// Default zone skeleton
    pub skeleton: Skeleton,

    /// Name-server control commands
    pub nameserver: NameServerCommands,
}

/// Commands used to drive the local name server
///
/// Each command is an argv vector; the first element is the program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameServerCommands {
    pub reload_command: Vec<String>,
    pub status_command: Vec<String>,
    pub restart_command: Vec<String>,
}

impl Default for NameServerCommands {
    fn default() -> Self {
        let argv = |args: &[&str]| args.iter().map(|s| s.to_string()).collect();
        Self {
            reload_command: argv(&["rndc", "reload", "chn"]),
            status_command: argv(&["systemctl", "status", "named"]),
            restart_command: argv(&["systemctl", "restart", "named"]),
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            // Zone
            zone_file: PathBuf::from("/var/named/chn.zone"),
            create_if_missing: false,
            auto_reload: false,

            // Network
            listen_address: "0.0.0.0".to_string(),
            api_port: 80,

            skeleton: Skeleton::default(),
            nameserver: NameServerCommands::default(),
        }
    }
}

impl ManagerConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    // Builder-style methods for CLI overrides

    pub fn with_zone_file(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.zone_file = path;
        }
        self
    }

    pub fn with_api_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.api_port = port;
        }
        self
    }

    /// Socket address for the HTTP API
    pub fn api_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        let ip: std::net::IpAddr = self
            .listen_address
            .parse()
            .map_err(|_| anyhow::anyhow!("listen_address is not an IP address: {}", self.listen_address))?;
        Ok(std::net::SocketAddr::new(ip, self.api_port))
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.zone_file.as_os_str().is_empty() {
            anyhow::bail!("zone_file must not be empty");
        }

        self.api_addr()?;

        for (name, command) in [
            ("reload_command", &self.nameserver.reload_command),
            ("status_command", &self.nameserver.status_command),
            ("restart_command", &self.nameserver.restart_command),
        ] {
            if command.first().map_or(true, |program| program.trim().is_empty()) {
                anyhow::bail!("nameserver.{} must name a program", name);
            }
        }

        let skeleton = &self.skeleton;
        if !skeleton.origin.ends_with('.') {
            anyhow::bail!("skeleton.origin ({}) must be fully qualified", skeleton.origin);
        }

        for (name, value) in [
            ("default_ttl", skeleton.default_ttl),
            ("refresh", skeleton.refresh),
            ("retry", skeleton.retry),
            ("expire", skeleton.expire),
            ("minimum", skeleton.minimum),
        ] {
            if value == 0 {
                anyhow::bail!("skeleton.{} must be greater than 0", name);
            }
        }

        Ok(())
    }
}
