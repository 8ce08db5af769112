//! Fuzz target for the JSON configuration loader.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Feeds arbitrary text through `ChillerConfig::parse()` against a small
//! fixed registry, covering JSON parsing, schema validation, and name
//! resolution.

#![no_main]

use std::net::{IpAddr, Ipv4Addr};

use chiller_config::{ChillerConfig, Registry};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let registry = Registry::new()
        .with_daemon("chiller", "127.0.0.1", 9034)
        .with_daemon("power", "127.0.0.1", 9035)
        .with_machine("Local", IpAddr::V4(Ipv4Addr::LOCALHOST));

    // Any document may be rejected; none may panic.
    if let Ok(config) = ChillerConfig::parse(s, &registry) {
        let _ = serde_json::to_string(&config);
    }
});
