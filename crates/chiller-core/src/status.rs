//! Mode, hardware status, and command result taxonomies.
//!
//! The enums carry semantics only. Presentation lives in the free functions
//! ([`mode_label`], [`status_label`], [`command_result_message`]) which accept
//! raw integer codes and are total: every input yields a string.
//!
//! Styled labels wrap the plain label in bold/colour markup
//! (`[b][green]AUTOMATIC[/green][/b]`); the label text itself never changes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fallback label for an unrecognised mode code.
pub const UNKNOWN_MODE_LABEL: &str = "UNKNOWN";

/// Fallback label for an unrecognised hardware status code.
pub const UNKNOWN_STATUS_LABEL: &str = "UNKNOWN STATUS";

/// Chiller control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Commands from control machines drive the chiller.
    Manual,
    /// Antifreeze protection drives the chiller.
    Automatic,
}

impl Mode {
    pub const fn code(self) -> i64 {
        match self {
            Self::Manual => 0,
            Self::Automatic => 1,
        }
    }

    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Manual),
            1 => Some(Self::Automatic),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::Automatic => "AUTOMATIC",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Hardware state reported by the driver layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareStatus {
    Disabled,
    Idle,
    Cooling,
    Heating,
}

impl HardwareStatus {
    pub const fn code(self) -> i64 {
        match self {
            Self::Disabled => 0,
            Self::Idle => 1,
            Self::Cooling => 2,
            Self::Heating => 3,
        }
    }

    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Disabled),
            1 => Some(Self::Idle),
            2 => Some(Self::Cooling),
            3 => Some(Self::Heating),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Disabled => "OFFLINE",
            Self::Idle => "IDLE",
            Self::Cooling => "COOLING",
            Self::Heating => "HEATING",
        }
    }
}

impl fmt::Display for HardwareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of a command, carried over the wire as an integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandResult {
    Succeeded,
    Failed,
    /// Another command is already executing.
    Blocked,
    /// The caller's address is not an authorized control machine.
    InvalidControlIp,
    /// The command needs manual mode but the chiller is automatic.
    ModeIsAutomatic,
    /// The driver layer could not be reached.
    DriverUnreachable,
}

impl CommandResult {
    pub const ALL: [Self; 6] = [
        Self::Succeeded,
        Self::Failed,
        Self::Blocked,
        Self::InvalidControlIp,
        Self::ModeIsAutomatic,
        Self::DriverUnreachable,
    ];

    pub const fn code(self) -> i64 {
        match self {
            Self::Succeeded => 0,
            Self::Failed => 1,
            Self::Blocked => 2,
            Self::InvalidControlIp => 3,
            Self::ModeIsAutomatic => 10,
            Self::DriverUnreachable => -101,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.code() == code)
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "command failed",
            Self::Blocked => "another command already running",
            Self::InvalidControlIp => "command not accepted from this caller's address",
            Self::ModeIsAutomatic => "chiller is not in manual mode",
            Self::DriverUnreachable => "unable to communicate with the chiller driver",
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

// ── Presentation ────────────────────────────────────────────────────────

/// Markup colour used by styled labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Default,
    Red,
    Yellow,
    Green,
    Cyan,
}

impl Color {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Cyan => "cyan",
        }
    }
}

pub const fn mode_color(mode: Mode) -> Color {
    match mode {
        Mode::Manual => Color::Yellow,
        Mode::Automatic => Color::Green,
    }
}

pub const fn status_color(status: HardwareStatus) -> Color {
    match status {
        HardwareStatus::Disabled => Color::Red,
        HardwareStatus::Idle => Color::Default,
        HardwareStatus::Cooling => Color::Cyan,
        HardwareStatus::Heating => Color::Yellow,
    }
}

/// Wrap `label` in bold and colour markup.
pub fn decorate(label: &str, color: Color) -> String {
    let c = color.name();
    format!("[b][{c}]{label}[/{c}][/b]")
}

fn render(label: &str, color: Color, styled: bool) -> String {
    if styled {
        decorate(label, color)
    } else {
        label.to_string()
    }
}

/// Label for a mode code. Unknown codes render as [`UNKNOWN_MODE_LABEL`].
pub fn mode_label(code: i64, styled: bool) -> String {
    match Mode::from_code(code) {
        Some(mode) => render(mode.label(), mode_color(mode), styled),
        None => render(UNKNOWN_MODE_LABEL, Color::Red, styled),
    }
}

/// Label for a hardware status code. Unknown codes render as [`UNKNOWN_STATUS_LABEL`].
pub fn status_label(code: i64, styled: bool) -> String {
    match HardwareStatus::from_code(code) {
        Some(status) => render(status.label(), status_color(status), styled),
        None => render(UNKNOWN_STATUS_LABEL, Color::Red, styled),
    }
}

/// Message for a command result code; unknown codes get a generated message.
pub fn command_result_message(code: i64) -> String {
    match CommandResult::from_code(code) {
        Some(result) => result.message().to_string(),
        None => format!("unknown error code {code}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mode_labels() {
        assert_eq!(mode_label(0, false), "MANUAL");
        assert_eq!(mode_label(1, false), "AUTOMATIC");
        assert_eq!(mode_label(2, false), "UNKNOWN");
        assert_eq!(mode_label(-1, false), "UNKNOWN");
    }

    #[test]
    fn test_mode_labels_styled() {
        assert_eq!(mode_label(0, true), "[b][yellow]MANUAL[/yellow][/b]");
        assert_eq!(mode_label(1, true), "[b][green]AUTOMATIC[/green][/b]");
        assert_eq!(mode_label(7, true), "[b][red]UNKNOWN[/red][/b]");
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(status_label(0, false), "OFFLINE");
        assert_eq!(status_label(1, false), "IDLE");
        assert_eq!(status_label(2, false), "COOLING");
        assert_eq!(status_label(3, false), "HEATING");
        assert_eq!(status_label(4, false), "UNKNOWN STATUS");
    }

    #[test]
    fn test_status_labels_styled() {
        assert_eq!(status_label(0, true), "[b][red]OFFLINE[/red][/b]");
        assert_eq!(status_label(1, true), "[b][default]IDLE[/default][/b]");
        assert_eq!(status_label(2, true), "[b][cyan]COOLING[/cyan][/b]");
        assert_eq!(status_label(3, true), "[b][yellow]HEATING[/yellow][/b]");
        assert_eq!(status_label(99, true), "[b][red]UNKNOWN STATUS[/red][/b]");
    }

    #[test]
    fn test_styling_never_changes_label_text() {
        for code in -3..8 {
            assert!(mode_label(code, true).contains(&mode_label(code, false)));
            assert!(status_label(code, true).contains(&status_label(code, false)));
        }
    }

    #[test]
    fn test_labels_total_over_extremes() {
        for code in [i64::MIN, -101, i64::MAX] {
            assert_eq!(mode_label(code, false), UNKNOWN_MODE_LABEL);
            assert_eq!(status_label(code, false), UNKNOWN_STATUS_LABEL);
            assert!(!command_result_message(code).is_empty());
        }
    }

    #[test]
    fn test_command_result_table() {
        assert_eq!(command_result_message(0), "succeeded");
        assert_eq!(command_result_message(1), "command failed");
        assert_eq!(command_result_message(2), "another command already running");
        assert_eq!(
            command_result_message(3),
            "command not accepted from this caller's address"
        );
        assert_eq!(command_result_message(10), "chiller is not in manual mode");
        assert_eq!(
            command_result_message(-101),
            "unable to communicate with the chiller driver"
        );
    }

    #[test]
    fn test_unknown_command_result_embeds_code() {
        let msg = command_result_message(42);
        assert!(msg.contains("42"));
        assert_eq!(msg, "unknown error code 42");
    }

    #[test]
    fn test_only_succeeded_is_success() {
        let successes: Vec<_> = CommandResult::ALL
            .into_iter()
            .filter(|r| r.is_success())
            .collect();
        assert_eq!(successes, vec![CommandResult::Succeeded]);
    }

    #[test]
    fn test_code_round_trip_for_known_values() {
        for result in CommandResult::ALL {
            assert_eq!(CommandResult::from_code(result.code()), Some(result));
        }
        assert_eq!(Mode::from_code(Mode::Automatic.code()), Some(Mode::Automatic));
        assert_eq!(
            HardwareStatus::from_code(HardwareStatus::Heating.code()),
            Some(HardwareStatus::Heating)
        );
    }

    #[test]
    fn test_mode_serde_names() {
        assert_eq!(serde_json::to_string(&Mode::Automatic).unwrap(), "\"automatic\"");
        let status: HardwareStatus = serde_json::from_str("\"cooling\"").unwrap();
        assert_eq!(status, HardwareStatus::Cooling);
    }
}
