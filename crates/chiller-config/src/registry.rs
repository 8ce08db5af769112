//! Deployment registry — symbolic daemon and machine names.
//!
//! Configuration files refer to peer daemons and control machines by name.
//! The [`Registry`] maps those names to concrete endpoints and is loaded
//! once, before any configuration, from a TOML directory file:
//!
//! ```toml
//! [daemons.chiller]
//! host = "10.2.6.202"
//! port = 9034
//!
//! [machines]
//! TCS = "10.2.6.201"
//! ```
//!
//! Lookups fail closed: an unknown name is an error, never a default.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Network endpoint of a named daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonEndpoint {
    /// Registry name (e.g. "chiller", "power").
    pub name: String,
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl DaemonEndpoint {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }

    /// `host:port`, suitable for binding or connecting.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Network address of a named control machine.
pub type MachineAddress = IpAddr;

/// A symbolic name that the registry does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("unknown daemon \"{0}\"")]
    UnknownDaemon(String),

    #[error("unknown machine \"{0}\"")]
    UnknownMachine(String),
}

/// Errors from loading the registry file.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read registry file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse registry TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    daemons: BTreeMap<String, DaemonEntry>,
    #[serde(default)]
    machines: BTreeMap<String, IpAddr>,
}

#[derive(Debug, Deserialize)]
struct DaemonEntry {
    host: String,
    port: u16,
}

/// Read-only directory of known daemons and machines.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    daemons: HashMap<String, DaemonEndpoint>,
    machines: HashMap<String, MachineAddress>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the registry from a TOML file using async I/O.
    pub async fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parse the registry from a TOML string.
    pub fn parse(s: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = toml::from_str(s)?;
        let daemons = file
            .daemons
            .into_iter()
            .map(|(name, entry)| {
                let endpoint = DaemonEndpoint::new(name.clone(), entry.host, entry.port);
                (name, endpoint)
            })
            .collect();

        Ok(Self {
            daemons,
            machines: file.machines.into_iter().collect(),
        })
    }

    /// Add or replace a daemon entry.
    pub fn with_daemon(mut self, name: &str, host: &str, port: u16) -> Self {
        self.daemons
            .insert(name.to_string(), DaemonEndpoint::new(name, host, port));
        self
    }

    /// Add or replace a machine entry.
    pub fn with_machine(mut self, name: &str, address: MachineAddress) -> Self {
        self.machines.insert(name.to_string(), address);
        self
    }

    /// Resolve a daemon name to its endpoint.
    pub fn resolve_daemon(&self, name: &str) -> Result<DaemonEndpoint, ResolveError> {
        self.daemons
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownDaemon(name.to_string()))
    }

    /// Resolve a machine name to its address.
    pub fn resolve_machine(&self, name: &str) -> Result<MachineAddress, ResolveError> {
        self.machines
            .get(name)
            .copied()
            .ok_or_else(|| ResolveError::UnknownMachine(name.to_string()))
    }

    pub fn daemon_count(&self) -> usize {
        self.daemons.len()
    }

    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }
}
