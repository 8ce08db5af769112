#![deny(unsafe_code)]

//! chillerd — chiller daemon and its command-line control client.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use chiller_config::{ChillerConfig, Registry};
use chiller_core::ipc::{CommandResponse, IpcClient, IpcClientError};
use chiller_core::status::{self, CommandResult, Mode};
use chiller_core::{ChillerCommand, Daemon, SimulatedDriver, build_info, logging};

/// chillerd — operate a telescope chiller over TCP.
#[derive(Parser)]
#[command(name = "chillerd", version = build_info::VERSION, about, long_about = None)]
struct Cli {
    /// Path to the daemon configuration file (JSON).
    #[arg(short, long, default_value = "chiller.json")]
    config: PathBuf,

    /// Path to the daemon and machine registry (TOML).
    #[arg(short, long, default_value = "registry.toml")]
    registry: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon in the foreground.
    Start,

    /// Ask a running daemon to stop.
    Stop,

    /// Show the chiller mode and hardware status.
    Status {
        /// Render labels with colour markup.
        #[arg(long)]
        styled: bool,
    },

    /// Switch the chiller on.
    Enable,

    /// Switch the chiller off.
    Disable,

    /// Hand control to the automatic controller.
    Automatic,

    /// Take manual control.
    Manual,

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

impl Commands {
    /// The chiller command this subcommand sends, if any.
    fn chiller_command(&self) -> Option<ChillerCommand> {
        match self {
            Self::Enable => Some(ChillerCommand::Enable),
            Self::Disable => Some(ChillerCommand::Disable),
            Self::Automatic => Some(ChillerCommand::SetMode(Mode::Automatic)),
            Self::Manual => Some(ChillerCommand::SetMode(Mode::Manual)),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let filter = logging::verbosity_filter(cli.verbose);

    let config = load_config(&cli.config, &cli.registry).await?;

    if let Commands::Start = cli.command {
        logging::init(Some(&config.log_name), filter);
        cmd_start(config).await?;
        return Ok(ExitCode::SUCCESS);
    }

    logging::init(None, filter);
    if let Commands::Config { show } = cli.command {
        return cmd_config(&cli.config, &config, show);
    }

    let client = IpcClient::new(config.daemon.address());
    match cmd_client(&cli.command, &client).await {
        Ok(code) => Ok(code),
        Err(e) => daemon_unreachable(e),
    }
}

async fn cmd_client(command: &Commands, client: &IpcClient) -> Result<ExitCode, IpcClientError> {
    if let Some(command) = command.chiller_command() {
        let response = client.command(command).await?;
        return Ok(report(&response));
    }

    match command {
        Commands::Stop => {
            info!(addr = client.addr(), "Sending stop request");
            let response = client.stop().await?;
            Ok(report(&response))
        }
        Commands::Status { styled } => cmd_status(client, *styled).await,
        _ => Ok(ExitCode::SUCCESS),
    }
}

async fn cmd_start(config: ChillerConfig) -> Result<()> {
    info!(version = %build_info::version_string(), "Starting chillerd");
    let daemon = Daemon::new(config, Arc::new(SimulatedDriver::new()));
    daemon.run().await?;
    Ok(())
}

async fn cmd_status(client: &IpcClient, styled: bool) -> Result<ExitCode, IpcClientError> {
    let status = client.status().await?;
    println!("mode:    {}", status::mode_label(status.mode, styled));
    println!("status:  {}", status::status_label(status.status, styled));
    println!(
        "command: {}",
        if status.command_running { "running" } else { "none" }
    );
    println!("driver:  {}", status.driver);
    println!("uptime:  {}s", status.uptime_secs);
    Ok(ExitCode::SUCCESS)
}

fn cmd_config(path: &Path, config: &ChillerConfig, show: bool) -> Result<ExitCode> {
    if show {
        let json = serde_json::to_string_pretty(config).context("failed to render configuration")?;
        println!("{json}");
    } else {
        println!("Configuration at '{}' is valid.", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

/// Print a command outcome; a non-zero code becomes a failing exit status.
fn report(response: &CommandResponse) -> ExitCode {
    if CommandResult::from_code(response.code).is_some_and(CommandResult::is_success) {
        println!("{}", response.message);
        ExitCode::SUCCESS
    } else {
        eprintln!(
            "error: {} (code {})",
            status::command_result_message(response.code),
            response.code
        );
        ExitCode::FAILURE
    }
}

/// A daemon that cannot be reached is reported with the reserved
/// communication-failure code; other client errors propagate.
fn daemon_unreachable(err: IpcClientError) -> Result<ExitCode> {
    match err {
        IpcClientError::Connect { .. } | IpcClientError::Timeout { .. } | IpcClientError::Http(_) => {
            let code = CommandResult::DriverUnreachable.code();
            eprintln!(
                "error: {} (code {code}): {err}",
                status::command_result_message(code)
            );
            Ok(ExitCode::FAILURE)
        }
        other => Err(other.into()),
    }
}

async fn load_config(config_path: &Path, registry_path: &Path) -> Result<ChillerConfig> {
    let registry = Registry::load(registry_path)
        .await
        .with_context(|| format!("failed to load registry '{}'", registry_path.display()))?;
    let config = ChillerConfig::load(config_path, &registry)
        .await
        .with_context(|| format!("invalid configuration '{}'", config_path.display()))?;
    Ok(config)
}
