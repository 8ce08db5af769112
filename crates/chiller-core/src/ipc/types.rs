//! Request/response types shared by the IPC server and client.

use serde::{Deserialize, Serialize};

use crate::status::CommandResult;

/// Daemon health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub git_hash: String,
    pub build_profile: String,
}

/// Chiller and daemon status.
///
/// Codes are carried alongside the plain labels so clients can render
/// their own styling with [`crate::status::mode_label`] and friends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub mode: i64,
    pub mode_label: String,
    pub status: i64,
    pub status_label: String,
    pub command_running: bool,
    pub driver: String,
    pub uptime_secs: u64,
}

/// Command request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

/// Command outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub code: i64,
    pub message: String,
}

impl From<CommandResult> for CommandResponse {
    fn from(result: CommandResult) -> Self {
        Self {
            code: result.code(),
            message: result.message().to_string(),
        }
    }
}

/// Generic error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
