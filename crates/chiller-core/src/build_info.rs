//! Build metadata embedded by `build.rs`.

/// Short git commit hash, or `unknown` outside a checkout.
pub const GIT_HASH: &str = env!("CHILLERD_GIT_HASH");

/// Build time as Unix epoch seconds.
pub const BUILD_TIMESTAMP: &str = env!("CHILLERD_BUILD_TIMESTAMP");

/// Cargo profile (`debug` or `release`).
pub const BUILD_PROFILE: &str = env!("CHILLERD_BUILD_PROFILE");

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// e.g. `"0.1.0 (abc1234, debug)"`
pub fn version_string() -> String {
    format!("{VERSION} ({GIT_HASH}, {BUILD_PROFILE})")
}
