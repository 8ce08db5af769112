//! End-to-end tests: a real daemon on loopback, driven through `IpcClient`.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use chiller_core::ipc::IpcClientError;
use chiller_core::status::{self, CommandResult, HardwareStatus, Mode};
use chiller_core::{ChillerCommand, DriverError, SimulatedDriver};
use chiller_test_utils::config::TestConfigBuilder;
use chiller_test_utils::daemon::TestDaemon;
use chiller_test_utils::driver::ScriptedDriver;
use pretty_assertions::assert_eq;

const TCS: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 2, 6, 201));

#[test_log::test(tokio::test)]
async fn test_health_and_status_over_tcp() {
    let daemon = TestDaemon::start(
        TestConfigBuilder::new().build(),
        Arc::new(SimulatedDriver::new()),
    )
    .await;
    let client = daemon.client();

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, chiller_core::build_info::VERSION);

    let status = client.status().await.unwrap();
    assert_eq!(status.mode, Mode::Manual.code());
    assert_eq!(status.mode_label, "MANUAL");
    assert_eq!(status.driver, "simulated");
    assert!(!status.command_running);

    daemon.stop().await.unwrap();
}

#[tokio::test]
async fn test_loopback_control_machine_runs_commands() {
    let driver = Arc::new(ScriptedDriver::new(HardwareStatus::Disabled));
    let daemon = TestDaemon::start(TestConfigBuilder::new().build(), driver.clone()).await;
    let client = daemon.client();

    let outcome = client.command(ChillerCommand::Enable).await.unwrap();
    assert_eq!(outcome.code, CommandResult::Succeeded.code());
    assert_eq!(outcome.message, "succeeded");
    assert_eq!(driver.received(), vec![ChillerCommand::Enable]);

    daemon.stop().await.unwrap();
}

#[tokio::test]
async fn test_automatic_mode_blocks_hardware_commands() {
    let driver = Arc::new(ScriptedDriver::new(HardwareStatus::Idle));
    let daemon = TestDaemon::start(TestConfigBuilder::new().build(), driver.clone()).await;
    let client = daemon.client();

    let outcome = client
        .command(ChillerCommand::SetMode(Mode::Automatic))
        .await
        .unwrap();
    assert_eq!(outcome.code, 0);
    assert_eq!(client.status().await.unwrap().mode_label, "AUTOMATIC");

    let outcome = client.command(ChillerCommand::Disable).await.unwrap();
    assert_eq!(outcome.code, CommandResult::ModeIsAutomatic.code());
    assert_eq!(
        status::command_result_message(outcome.code),
        "chiller is not in manual mode"
    );
    assert!(driver.received().is_empty());

    client
        .command(ChillerCommand::SetMode(Mode::Manual))
        .await
        .unwrap();
    let outcome = client.command(ChillerCommand::Disable).await.unwrap();
    assert_eq!(outcome.code, 0);

    daemon.stop().await.unwrap();
}

#[tokio::test]
async fn test_driver_failures_reach_the_client() {
    let driver = Arc::new(ScriptedDriver::new(HardwareStatus::Idle));
    driver.push_outcome(Err(DriverError::Rejected("interlock".into())));
    driver.push_outcome(Err(DriverError::Communication("timeout".into())));
    let daemon = TestDaemon::start(TestConfigBuilder::new().build(), driver.clone()).await;
    let client = daemon.client();

    let outcome = client.command(ChillerCommand::Enable).await.unwrap();
    assert_eq!(outcome.code, CommandResult::Failed.code());

    let outcome = client.command(ChillerCommand::Enable).await.unwrap();
    assert_eq!(outcome.code, CommandResult::DriverUnreachable.code());

    // The gate is free again after both failures.
    let outcome = client.command(ChillerCommand::Enable).await.unwrap();
    assert_eq!(outcome.code, 0);

    daemon.stop().await.unwrap();
}

#[tokio::test]
async fn test_non_control_caller_is_refused() {
    // Loopback is registered but not authorized.
    let config = TestConfigBuilder::new()
        .no_control_machines()
        .control_ip("TCS", TCS)
        .build();
    let driver = Arc::new(ScriptedDriver::new(HardwareStatus::Idle));
    let mut daemon = TestDaemon::start(config, driver.clone()).await;
    let client = daemon.client();

    // Read-only routes stay open.
    assert!(client.status().await.is_ok());

    let outcome = client.command(ChillerCommand::Enable).await.unwrap();
    assert_eq!(outcome.code, CommandResult::InvalidControlIp.code());
    assert!(driver.received().is_empty());

    let outcome = client.stop().await.unwrap();
    assert_eq!(outcome.code, CommandResult::InvalidControlIp.code());
    assert!(client.health().await.is_ok());

    daemon.daemon.shutdown();
    daemon.join().await.unwrap();
}

#[tokio::test]
async fn test_stop_over_ipc_shuts_daemon_down() {
    let mut daemon = TestDaemon::start(
        TestConfigBuilder::new().build(),
        Arc::new(SimulatedDriver::new()),
    )
    .await;
    let client = daemon.client();

    let outcome = client.stop().await.unwrap();
    assert_eq!(outcome.code, 0);
    daemon.join().await.unwrap();

    let err = client.status().await.unwrap_err();
    assert!(matches!(err, IpcClientError::Connect { .. }));
}

#[tokio::test]
async fn test_status_poll_reflects_driver() {
    let driver = Arc::new(ScriptedDriver::new(HardwareStatus::Cooling));
    let daemon = TestDaemon::start(
        TestConfigBuilder::new().query_delay(0.1).build(),
        driver.clone(),
    )
    .await;

    assert_eq!(daemon.daemon.poll_once().await, HardwareStatus::Cooling);
    let status = daemon.client().status().await.unwrap();
    assert_eq!(status.status, HardwareStatus::Cooling.code());
    assert_eq!(status.status_label, "COOLING");

    driver.set_status(Err(DriverError::Communication("serial timeout".into())));
    assert_eq!(daemon.daemon.poll_once().await, HardwareStatus::Disabled);
    let status = daemon.client().status().await.unwrap();
    assert_eq!(status.status_label, "OFFLINE");

    daemon.stop().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_client_disconnect_does_not_cancel_command() {
    let driver = Arc::new(
        ScriptedDriver::new(HardwareStatus::Disabled).with_delay(Duration::from_millis(600)),
    );
    let daemon = TestDaemon::start(TestConfigBuilder::new().build(), driver.clone()).await;

    let impatient = daemon.client().with_timeout(Duration::from_millis(100));
    let err = impatient.command(ChillerCommand::Enable).await.unwrap_err();
    assert!(matches!(err, IpcClientError::Timeout { .. }));

    // The exchange is still running and still holds the gate.
    assert_eq!(driver.completed(), 0);
    assert!(daemon.daemon.gate().snapshot().in_flight);
    let outcome = daemon.client().command(ChillerCommand::Disable).await.unwrap();
    assert_eq!(outcome.code, CommandResult::Blocked.code());

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while driver.completed() == 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(driver.completed(), 1);
    while daemon.daemon.gate().snapshot().in_flight && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!daemon.daemon.gate().snapshot().in_flight);

    daemon.stop().await.unwrap();
}
