// # dynipd - Dynamic Address Propagation Daemon
//
// Thin integration layer: parses the command line, loads the YAML
// configuration, sets up logging and wires the components from
// `dynip-core` together. All cycle logic lives in `dynip-core`.
//
// ## Commands
//
// - `dynipd run [--config PATH]`: run until SIGTERM or SIGINT
// - `dynipd config [--config PATH]`: validate and summarize the configuration
//
// The configuration path defaults to `/etc/dynip/config.yml` and can be
// set through `DYNIP_CONFIG`.
//
// ## Example
//
// ```yaml
// listen:
//   interface: eth0
//   interval: 5
// state:
//   type: file
//   path: /var/lib/dynip/state.json
// destinations:
//   - type: cloudflare
//     access:
//       token: your_token
//     zones:
//       example.ch:
//         record: dynip
// logging:
//   destination: console
//   level: info
// ```

mod cli;
mod components;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use dynip_core::{CycleSettings, DynipConfig, Orchestrator, Scheduler};
use std::process::ExitCode;
use tracing::{error, info};

use cli::{Cli, Command};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DynipExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DynipExitCode> for ExitCode {
    fn from(code: DynipExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match DynipConfig::from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error ({}): {}", cli.config.display(), e);
            return DynipExitCode::ConfigError.into();
        }
    };

    if cli.command == Command::Config {
        println!("configuration {} is valid", cli.config.display());
        println!("{}", config);
        return DynipExitCode::CleanShutdown.into();
    }

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("Logging setup error: {:#}", e);
        return DynipExitCode::ConfigError.into();
    }

    info!("Starting dynipd daemon");
    info!("Configuration loaded: {}", config);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DynipExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let scheduler = match build(&config).await {
            Ok(scheduler) => scheduler,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return DynipExitCode::ConfigError;
            }
        };

        match run_daemon(scheduler).await {
            Ok(()) => DynipExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DynipExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Construct every component; failures here prevent startup
async fn build(config: &DynipConfig) -> Result<Scheduler> {
    let probe = components::probe(&config.listen)?;
    let state_span = tracing::info_span!("state", backend = config.state.type_name());
    let store = dynip_core::state::open(&config.state, state_span)
        .await
        .context("failed to open state store")?;
    let destinations = components::destinations(&config.destinations)?;

    info!(
        "probe: {}; state: {}; destinations: {}",
        probe.name(),
        store.backend(),
        destinations.len()
    );

    let orchestrator = Orchestrator::new(
        probe,
        store,
        destinations,
        CycleSettings::from(&config.listen),
    )
    .await;

    Ok(Scheduler::new(orchestrator, config.listen.interval()))
}

/// Run the scheduler until a shutdown signal arrives
async fn run_daemon(scheduler: Scheduler) -> Result<()> {
    let handle = scheduler.start();

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);

    // A cycle in flight finishes before the scheduler exits
    handle
        .stop()
        .await
        .context("scheduler task failed")?;

    info!("Daemon stopped");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for CTRL-C")?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_exit_codes() {
        assert_eq!(DynipExitCode::CleanShutdown as u8, 0);
        assert_eq!(DynipExitCode::ConfigError as u8, 1);
        assert_eq!(DynipExitCode::RuntimeError as u8, 2);
    }

    #[cfg(feature = "local")]
    #[tokio::test]
    async fn test_build_from_file_config() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("zone.tpl");
        std::fs::write(&template, "{{ ip }}").unwrap();

        let config_path = dir.path().join("config.yml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        write!(
            file,
            "listen:\n  interface: eth0\n  interval: 2\nstate:\n  type: file\n  path: {}\ndestinations:\n  - type: file\n    template: {}\n    output: {}\n",
            dir.path().join("state").join("state.json").display(),
            template.display(),
            dir.path().join("zone.conf").display()
        )
        .unwrap();

        let config = DynipConfig::from_file(&config_path).unwrap();
        let scheduler = build(&config).await.unwrap();

        assert_eq!(scheduler.interval(), std::time::Duration::from_secs(120));
        assert!(dir.path().join("state").is_dir(), "state directory is created at startup");
    }
}
