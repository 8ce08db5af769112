//! Tracing subscriber setup.
//!
//! Under systemd, events go to the journal tagged with the configured log
//! name. Everywhere else they go to stdout through the fmt subscriber.
//! `RUST_LOG` overrides the default filter in both cases.

use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Socket whose presence indicates a running systemd journal.
pub const JOURNAL_SOCKET: &str = "/run/systemd/journal/socket";

/// Where log output ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Journald,
    Stdout,
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global subscriber.
///
/// With `log_name` set and a journal present, logs go to journald with
/// `log_name` as the syslog identifier. Safe to call more than once; only
/// the first call installs anything.
pub fn init(log_name: Option<&str>, default_filter: &str) -> LogTarget {
    if let Some(name) = log_name
        && Path::new(JOURNAL_SOCKET).exists()
    {
        match tracing_journald::layer() {
            Ok(layer) => {
                let installed = tracing_subscriber::registry()
                    .with(env_filter(default_filter))
                    .with(layer.with_syslog_identifier(name.to_string()))
                    .try_init()
                    .is_ok();
                if installed {
                    return LogTarget::Journald;
                }
            }
            Err(e) => eprintln!("journald unavailable ({e}), logging to stdout"),
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .try_init();
    LogTarget::Stdout
}

/// Map a `-v` count to a default filter.
pub fn verbosity_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}
