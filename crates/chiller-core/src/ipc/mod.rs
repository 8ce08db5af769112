//! Control interface — HTTP/JSON over TCP.
//!
//! The daemon listens on its registry endpoint. Control machines and
//! monitors connect as clients; the peer address of each connection is the
//! caller identity used for command authorization.
//!
//! ```text
//! ┌──────────────┐        TCP         ┌──────────────┐
//! │ chillerd CLI │───────────────────▶│  IPC Server  │
//! │ monitors     │  HTTP/1.1 + JSON   │  (axum)      │
//! └──────────────┘                    └──────┬───────┘
//!                                            │
//!                                     ┌──────▼───────┐
//!                                     │ CommandGate  │
//!                                     │ + driver     │
//!                                     └──────────────┘
//! ```

pub mod client;
pub mod server;
pub mod types;

pub use client::{IpcClient, IpcClientError};
pub use server::IpcState;
pub use types::*;
