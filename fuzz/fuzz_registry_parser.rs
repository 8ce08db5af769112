//! Fuzz target for the TOML registry parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_registry_parser

#![no_main]

use chiller_config::Registry;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(registry) = Registry::parse(s) {
            let _ = registry.resolve_daemon("chiller");
            let _ = registry.resolve_machine("Local");
        }
    }
});
