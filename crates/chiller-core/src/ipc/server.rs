//! IPC server — axum router over TCP.
//!
//! Read-only routes (`/health`, `/status`) are open to any caller. Routes
//! that change state (`/command`, `/stop`) authorize the peer address first.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use super::types::*;
use crate::authorizer::CommandGate;
use crate::command::ChillerCommand;
use crate::daemon::ShutdownSignal;
use crate::driver::ChillerDriver;
use crate::status::{self, CommandResult, HardwareStatus};

/// Shared state accessible to all IPC route handlers.
pub struct IpcState {
    pub gate: Arc<CommandGate>,
    pub driver: Arc<dyn ChillerDriver>,
    pub status: watch::Receiver<HardwareStatus>,
    pub shutdown_tx: broadcast::Sender<ShutdownSignal>,
    pub started_at: Instant,
}

/// Build the axum router with all IPC routes.
pub fn router(state: Arc<IpcState>) -> axum::Router {
    axum::Router::new()
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .route("/command", post(handle_command))
        .route("/stop", post(handle_stop))
        .with_state(state)
}

/// Serve the IPC routes on `listener` until a shutdown signal arrives.
pub async fn serve(
    listener: TcpListener,
    state: Arc<IpcState>,
    mut shutdown_rx: broadcast::Receiver<ShutdownSignal>,
) -> Result<(), std::io::Error> {
    info!(addr = %listener.local_addr()?, "IPC server listening");

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("IPC server shutting down");
        })
        .await
}

// ── Route handlers ──────────────────────────────────────────────────────

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::build_info::VERSION.to_string(),
        git_hash: crate::build_info::GIT_HASH.to_string(),
        build_profile: crate::build_info::BUILD_PROFILE.to_string(),
    })
}

async fn handle_status(State(state): State<Arc<IpcState>>) -> Json<StatusResponse> {
    let control = state.gate.snapshot();
    let hardware = *state.status.borrow();

    Json(StatusResponse {
        mode: control.mode.code(),
        mode_label: status::mode_label(control.mode.code(), false),
        status: hardware.code(),
        status_label: status::status_label(hardware.code(), false),
        command_running: control.in_flight,
        driver: state.driver.name().to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

async fn handle_command(
    State(state): State<Arc<IpcState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, (StatusCode, Json<ErrorResponse>)> {
    let command = req.command.parse::<ChillerCommand>().map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    let caller = peer.ip().to_canonical();
    let gate = Arc::clone(&state.gate);
    let driver = Arc::clone(&state.driver);
    // Detached so a dropped connection cannot abandon the command midway.
    let task = tokio::spawn(async move { gate.execute(command, caller, driver.as_ref()).await });
    let result = task.await.unwrap_or_else(|e| {
        warn!(%command, %caller, error = %e, "Command task failed");
        CommandResult::Failed
    });
    Ok(Json(result.into()))
}

async fn handle_stop(
    State(state): State<Arc<IpcState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Json<CommandResponse> {
    let caller = peer.ip().to_canonical();
    if let Err(result) = state.gate.check_caller(caller) {
        return Json(result.into());
    }

    info!(%caller, "Stop requested via IPC");
    let _ = state.shutdown_tx.send(ShutdownSignal);
    Json(CommandResult::Succeeded.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SimulatedDriver;
    use crate::status::Mode;
    use axum::body::Body;
    use axum::http::Request;
    use chiller_test_utils::config::TestConfigBuilder;
    use pretty_assertions::assert_eq;
    use std::net::{IpAddr, Ipv4Addr};
    use tower::ServiceExt;

    const TCS: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 2, 6, 201));

    fn test_state() -> Arc<IpcState> {
        let config = Arc::new(TestConfigBuilder::new().control_ip("TCS", TCS).build());
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);
        let (_, status_rx) = watch::channel(HardwareStatus::Idle);

        Arc::new(IpcState {
            gate: Arc::new(CommandGate::new(config)),
            driver: Arc::new(SimulatedDriver::new()),
            status: status_rx,
            shutdown_tx,
            started_at: Instant::now(),
        })
    }

    fn post_from(uri: &str, caller: IpAddr, body: Body) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .extension(ConnectInfo(SocketAddr::new(caller, 40000)))
            .body(body)
            .unwrap()
    }

    fn command_from(caller: IpAddr, command: &str) -> Request<Body> {
        let body = serde_json::to_string(&CommandRequest {
            command: command.to_string(),
        })
        .unwrap();
        post_from("/command", caller, Body::from(body))
    }

    async fn read_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = router(test_state());
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let health: HealthResponse = read_json(resp).await;
        assert_eq!(health.status, "ok");
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let app = router(test_state());
        let req = Request::get("/status").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let status: StatusResponse = read_json(resp).await;
        assert_eq!(status.mode, Mode::Manual.code());
        assert_eq!(status.mode_label, "MANUAL");
        assert_eq!(status.status_label, "IDLE");
        assert!(!status.command_running);
        assert_eq!(status.driver, "simulated");
    }

    #[tokio::test]
    async fn test_command_from_control_machine() {
        let state = test_state();
        let app = router(Arc::clone(&state));
        let resp = app.oneshot(command_from(TCS, "enable")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let outcome: CommandResponse = read_json(resp).await;
        assert_eq!(outcome, CommandResponse::from(CommandResult::Succeeded));
        assert_eq!(state.driver.status().await, Ok(HardwareStatus::Idle));
    }

    #[tokio::test]
    async fn test_command_from_stranger_rejected() {
        let state = test_state();
        let stranger = IpAddr::V4(Ipv4Addr::new(192, 168, 0, 9));
        let resp = router(Arc::clone(&state))
            .oneshot(command_from(stranger, "automatic"))
            .await
            .unwrap();

        let outcome: CommandResponse = read_json(resp).await;
        assert_eq!(outcome.code, 3);
        assert_eq!(state.gate.mode(), Mode::Manual);
    }

    #[tokio::test]
    async fn test_ipv4_mapped_caller_is_canonicalized() {
        let mapped = match TCS {
            IpAddr::V4(v4) => IpAddr::V6(v4.to_ipv6_mapped()),
            other => other,
        };
        let resp = router(test_state())
            .oneshot(command_from(mapped, "manual"))
            .await
            .unwrap();
        let outcome: CommandResponse = read_json(resp).await;
        assert_eq!(outcome.code, 0);
    }

    #[tokio::test]
    async fn test_mode_blocks_hardware_commands() {
        let state = test_state();
        router(Arc::clone(&state))
            .oneshot(command_from(TCS, "automatic"))
            .await
            .unwrap();

        let resp = router(state)
            .oneshot(command_from(TCS, "disable"))
            .await
            .unwrap();
        let outcome: CommandResponse = read_json(resp).await;
        assert_eq!(outcome.code, 10);
        assert_eq!(outcome.message, "chiller is not in manual mode");
    }

    #[tokio::test]
    async fn test_unknown_command_is_bad_request() {
        let resp = router(test_state())
            .oneshot(command_from(TCS, "defrost"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let err: ErrorResponse = read_json(resp).await;
        assert!(err.error.contains("defrost"));
    }

    #[tokio::test]
    async fn test_stop_requires_control_machine() {
        let state = test_state();
        let mut rx = state.shutdown_tx.subscribe();
        let stranger = IpAddr::V4(Ipv4Addr::new(192, 168, 0, 9));

        let resp = router(Arc::clone(&state))
            .oneshot(post_from("/stop", stranger, Body::empty()))
            .await
            .unwrap();
        let outcome: CommandResponse = read_json(resp).await;
        assert_eq!(outcome.code, 3);
        assert!(rx.try_recv().is_err());

        let resp = router(state)
            .oneshot(post_from("/stop", TCS, Body::empty()))
            .await
            .unwrap();
        let outcome: CommandResponse = read_json(resp).await;
        assert_eq!(outcome.code, 0);
        assert!(rx.try_recv().is_ok());
    }
}
