#![deny(unsafe_code)]

//! Shared test utilities for the chillerd workspace.
//!
//! Provides config builders, a scripted driver, and a loopback daemon so
//! that individual crate tests stay concise.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! chiller-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod daemon;
pub mod driver;
