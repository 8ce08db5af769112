#![deny(unsafe_code)]

//! Configuration loading and validation for chillerd.
//!
//! A chiller daemon configuration is a JSON document. Loading runs three
//! steps and stops at the first failure:
//!
//! 1. parse the document,
//! 2. validate it against [`config_schema`] with the `daemon_name` and
//!    `machine_name` tags bound to the deployment [`Registry`],
//! 3. resolve every symbolic name and coerce the numeric fields.
//!
//! The result is an immutable [`ChillerConfig`]. No partially populated
//! configuration is ever returned.

/// Declarative schema and validator engine.
pub mod schema;
/// Deployment registry of daemon and machine names.
pub mod registry;

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub use registry::{DaemonEndpoint, MachineAddress, Registry, RegistryError, ResolveError};
pub use schema::{Schema, SchemaViolation, SemanticValidator, ValidatorRegistry};

/// Tag for strings that must name a daemon in the registry.
pub const DAEMON_NAME: &str = "daemon_name";
/// Tag for strings that must name a machine in the registry.
pub const MACHINE_NAME: &str = "machine_name";

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("schema violation: {0}")]
    Schema(#[from] SchemaViolation),

    #[error("unresolvable reference: {0}")]
    Resolve(#[from] ResolveError),
}

/// Upper bound for the integer-coerced serial fields.
pub const SERIAL_INTEGER_MAX: f64 = u32::MAX as f64;

/// The fixed schema every chiller configuration must satisfy.
pub fn config_schema() -> Schema {
    Schema::object()
        .deny_additional()
        .required("daemon", Schema::string().tag(DAEMON_NAME))
        .required("log_name", Schema::string())
        .required(
            "control_machines",
            Schema::array(Schema::string().tag(MACHINE_NAME)),
        )
        .required("serial_port", Schema::string())
        .required(
            "serial_baud",
            Schema::number().min(0.0).max(SERIAL_INTEGER_MAX),
        )
        .required(
            "serial_timeout",
            Schema::number().min(0.0).max(SERIAL_INTEGER_MAX),
        )
        .required("query_delay", Schema::number().min(0.0))
        .required("power_daemon", Schema::string().tag(DAEMON_NAME))
        .required("power_channels", Schema::array(Schema::string()))
        .required("temperature_daemon", Schema::string().tag(DAEMON_NAME))
        .required("temperature_value_key", Schema::string())
        .optional("temperature_valid_key", Schema::string())
        .required("antifreeze_enable_limit", Schema::number())
        .required("antifreeze_disable_limit", Schema::number())
}

/// Validators for the registry-backed tags used by [`config_schema`].
pub fn registry_validators(registry: &Registry) -> ValidatorRegistry<'_> {
    ValidatorRegistry::new()
        .with(DAEMON_NAME, move |value: &Value| match value.as_str() {
            Some(name) => registry
                .resolve_daemon(name)
                .map(|_| ())
                .map_err(|e| e.to_string()),
            None => Err("expected a daemon name".to_string()),
        })
        .with(MACHINE_NAME, move |value: &Value| match value.as_str() {
            Some(name) => registry
                .resolve_machine(name)
                .map(|_| ())
                .map_err(|e| e.to_string()),
            None => Err("expected a machine name".to_string()),
        })
}

/// The document as written, after schema validation.
#[derive(Debug, Deserialize)]
struct RawConfig {
    daemon: String,
    log_name: String,
    control_machines: Vec<String>,
    serial_port: String,
    serial_baud: f64,
    serial_timeout: f64,
    query_delay: f64,
    power_daemon: String,
    power_channels: Vec<String>,
    temperature_daemon: String,
    temperature_value_key: String,
    temperature_valid_key: Option<String>,
    antifreeze_enable_limit: f64,
    antifreeze_disable_limit: f64,
}

/// Resolved configuration for one chiller daemon instance.
///
/// `antifreeze_enable_limit` and `antifreeze_disable_limit` are independent;
/// no ordering between them is checked here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChillerConfig {
    /// This daemon's own endpoint.
    pub daemon: DaemonEndpoint,
    /// Identifier used for log output.
    pub log_name: String,
    /// Addresses allowed to issue commands, in file order.
    pub control_ips: Vec<IpAddr>,
    /// Serial device path.
    pub serial_port: String,
    pub serial_baud: u32,
    /// Serial read timeout in seconds.
    pub serial_timeout: u64,
    /// Delay between status queries in seconds.
    pub query_delay: f64,
    pub power_daemon: DaemonEndpoint,
    pub power_channels: Vec<String>,
    pub temperature_daemon: DaemonEndpoint,
    pub temperature_value_key: String,
    /// `None` when the document omits the key; an empty string is a valid key.
    pub temperature_valid_key: Option<String>,
    pub antifreeze_enable_limit: f64,
    pub antifreeze_disable_limit: f64,
}

impl ChillerConfig {
    /// Load configuration from a JSON file at the given path using async I/O.
    pub async fn load(path: &Path, registry: &Registry) -> Result<Self, ConfigError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        let document: Value = serde_json::from_slice(&bytes)?;
        let config = Self::from_document(document, registry)?;
        debug!(path = %path.display(), daemon = %config.daemon.name, "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn parse(s: &str, registry: &Registry) -> Result<Self, ConfigError> {
        let document: Value = serde_json::from_str(s)?;
        Self::from_document(document, registry)
    }

    /// Validate and resolve an already-parsed document.
    pub fn from_document(document: Value, registry: &Registry) -> Result<Self, ConfigError> {
        let schema = config_schema();
        let validators = registry_validators(registry);
        validators.check_schema(&schema)?;
        schema::validate(&document, &schema, &validators)?;

        let raw: RawConfig = serde_json::from_value(document)?;
        let control_ips = raw
            .control_machines
            .iter()
            .map(|name| registry.resolve_machine(name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            daemon: registry.resolve_daemon(&raw.daemon)?,
            log_name: raw.log_name,
            control_ips,
            serial_port: raw.serial_port,
            // Bounds checked by the schema, so truncation is the only change.
            serial_baud: raw.serial_baud as u32,
            serial_timeout: raw.serial_timeout as u64,
            query_delay: raw.query_delay,
            power_daemon: registry.resolve_daemon(&raw.power_daemon)?,
            power_channels: raw.power_channels,
            temperature_daemon: registry.resolve_daemon(&raw.temperature_daemon)?,
            temperature_value_key: raw.temperature_value_key,
            temperature_valid_key: raw.temperature_valid_key,
            antifreeze_enable_limit: raw.antifreeze_enable_limit,
            antifreeze_disable_limit: raw.antifreeze_disable_limit,
        })
    }

    /// Whether `addr` may issue commands to this daemon.
    pub fn is_control_ip(&self, addr: IpAddr) -> bool {
        self.control_ips.contains(&addr)
    }
}
