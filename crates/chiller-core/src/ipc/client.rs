//! IPC client for the CLI and other control machines.
//!
//! One TCP connection per call, HTTP/1.1 via `hyper`. Each call is bounded
//! by a timeout that covers connect, request and response.

use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use super::types::*;
use crate::command::ChillerCommand;

/// Default bound on a single client call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the IPC client.
#[derive(Debug, thiserror::Error)]
pub enum IpcClientError {
    #[error("failed to connect to chillerd at {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("no answer from chillerd at {addr} within {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    #[error("invalid request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("HTTP exchange failed: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid JSON in exchange: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chillerd answered {status}: {message}")]
    Daemon { status: StatusCode, message: String },
}

/// Typed client for one daemon endpoint.
#[derive(Debug, Clone)]
pub struct IpcClient {
    addr: String,
    timeout: Duration,
}

impl IpcClient {
    /// Client for the daemon listening on `host:port`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub async fn health(&self) -> Result<HealthResponse, IpcClientError> {
        self.call(Method::GET, "/health", None::<&()>).await
    }

    pub async fn status(&self) -> Result<StatusResponse, IpcClientError> {
        self.call(Method::GET, "/status", None::<&()>).await
    }

    /// Issue `command`. Rejections come back as a non-zero `code`, not an `Err`.
    pub async fn command(&self, command: ChillerCommand) -> Result<CommandResponse, IpcClientError> {
        let request = CommandRequest {
            command: command.name().to_string(),
        };
        self.call(Method::POST, "/command", Some(&request)).await
    }

    /// Ask the daemon to shut down.
    pub async fn stop(&self) -> Result<CommandResponse, IpcClientError> {
        self.call(Method::POST, "/stop", None::<&()>).await
    }

    async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, IpcClientError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let payload = body.map(serde_json::to_vec).transpose()?;
        let exchange = self.exchange(method, path, payload);
        let (status, bytes) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| IpcClientError::Timeout {
                addr: self.addr.clone(),
                timeout: self.timeout,
            })??;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorResponse>(&bytes)
                .map(|e| e.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(IpcClientError::Daemon { status, message });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn exchange(
        &self,
        method: Method,
        path: &str,
        payload: Option<Vec<u8>>,
    ) -> Result<(StatusCode, Bytes), IpcClientError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| IpcClientError::Connect {
                addr: self.addr.clone(),
                source,
            })?;

        let (mut sender, conn) =
            hyper::client::conn::http1::handshake::<_, Full<Bytes>>(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                warn!(error = %e, "IPC connection error");
            }
        });

        debug!(%method, path, addr = %self.addr, "IPC request");
        let mut request = hyper::Request::builder()
            .method(method)
            .uri(path)
            .header(hyper::header::HOST, self.addr.as_str());
        if payload.is_some() {
            request = request.header(hyper::header::CONTENT_TYPE, "application/json");
        }
        let request = request.body(Full::new(Bytes::from(payload.unwrap_or_default())))?;

        let response = sender.send_request(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        Ok((status, bytes))
    }
}
