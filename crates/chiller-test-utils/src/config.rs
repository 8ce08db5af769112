//! Configuration builders for tests.
//!
//! [`TestConfigBuilder`] keeps a registry and a JSON document side by side
//! so tests can tweak either one and then resolve them into a
//! [`ChillerConfig`], or write them out as files for the loaders.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use chiller_config::{ChillerConfig, ConfigError, Registry};
use serde_json::{Value, json};

/// Fluent builder for a registry plus a valid chiller config document.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .control_ip("TCS", "10.2.6.201".parse().unwrap())
///     .query_delay(0.5)
///     .build();
/// ```
pub struct TestConfigBuilder {
    daemons: BTreeMap<String, (String, u16)>,
    machines: BTreeMap<String, IpAddr>,
    document: Value,
}

impl TestConfigBuilder {
    /// Defaults: daemons `chiller`, `power`, `temperature` on localhost and
    /// one control machine, `Local` at 127.0.0.1.
    pub fn new() -> Self {
        let daemons = [
            ("chiller", 9034),
            ("power", 9035),
            ("temperature", 9036),
        ]
        .into_iter()
        .map(|(name, port)| (name.to_string(), ("127.0.0.1".to_string(), port)))
        .collect();
        let machines = [("Local".to_string(), IpAddr::V4(Ipv4Addr::LOCALHOST))]
            .into_iter()
            .collect();

        Self {
            daemons,
            machines,
            document: json!({
                "daemon": "chiller",
                "log_name": "chillerd",
                "control_machines": ["Local"],
                "serial_port": "/dev/chiller",
                "serial_baud": 9600,
                "serial_timeout": 5,
                "query_delay": 1.0,
                "power_daemon": "power",
                "power_channels": ["Chiller"],
                "temperature_daemon": "temperature",
                "temperature_value_key": "ext_temp",
                "temperature_valid_key": "ext_temp_valid",
                "antifreeze_enable_limit": 2.0,
                "antifreeze_disable_limit": 5.0,
            }),
        }
    }

    /// Register a machine and authorize it as a control machine.
    pub fn control_ip(mut self, name: &str, address: IpAddr) -> Self {
        self.machines.insert(name.to_string(), address);
        if let Some(list) = self.document["control_machines"].as_array_mut() {
            list.push(json!(name));
        }
        self
    }

    /// Authorize nobody.
    pub fn no_control_machines(mut self) -> Self {
        self.document["control_machines"] = json!([]);
        self
    }

    /// Move the chiller daemon's own endpoint.
    pub fn daemon_endpoint(mut self, host: &str, port: u16) -> Self {
        self.daemons
            .insert("chiller".to_string(), (host.to_string(), port));
        self
    }

    pub fn query_delay(self, seconds: f64) -> Self {
        self.set("query_delay", json!(seconds))
    }

    /// Overwrite one top-level document key.
    pub fn set(mut self, key: &str, value: Value) -> Self {
        self.document[key] = value;
        self
    }

    /// Drop one top-level document key.
    pub fn remove(mut self, key: &str) -> Self {
        if let Some(map) = self.document.as_object_mut() {
            map.remove(key);
        }
        self
    }

    /// The config document as it would be written to disk.
    pub fn document(&self) -> Value {
        self.document.clone()
    }

    pub fn registry(&self) -> Registry {
        let registry = self
            .daemons
            .iter()
            .fold(Registry::new(), |reg, (name, (host, port))| {
                reg.with_daemon(name, host, *port)
            });
        self.machines
            .iter()
            .fold(registry, |reg, (name, address)| reg.with_machine(name, *address))
    }

    /// The registry rendered in its on-disk TOML form.
    pub fn registry_toml(&self) -> String {
        let mut out = String::new();
        for (name, (host, port)) in &self.daemons {
            out.push_str(&format!("[daemons.{name}]\nhost = \"{host}\"\nport = {port}\n\n"));
        }
        out.push_str("[machines]\n");
        for (name, address) in &self.machines {
            out.push_str(&format!("{name} = \"{address}\"\n"));
        }
        out
    }

    /// Resolve without panicking, for tests that expect a failure.
    pub fn try_build(&self) -> Result<ChillerConfig, ConfigError> {
        ChillerConfig::from_document(self.document(), &self.registry())
    }

    pub fn build(self) -> ChillerConfig {
        self.try_build().expect("test config should resolve")
    }

    /// Write `chiller.json` and `registry.toml` into `dir`.
    pub fn write_to(&self, dir: &Path) -> (PathBuf, PathBuf) {
        let config_path = dir.join("chiller.json");
        let registry_path = dir.join("registry.toml");
        let document =
            serde_json::to_string_pretty(&self.document).expect("document should serialize");
        std::fs::write(&config_path, document).expect("failed to write test config");
        std::fs::write(&registry_path, self.registry_toml())
            .expect("failed to write test registry");
        (config_path, registry_path)
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
