//! DSUL daemon: owns the serial link and serves client commands

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

use dsul_app_lib::cli::DaemonArgs;
use dsul_app_lib::{logging, version_line};
use dsul_core::config::Config;
use dsul_core::daemon::Daemon;
use dsul_core::protocol::open_port;

async fn run(args: DaemonArgs) -> Result<()> {
    let mut config = Config::load_or_default().context("failed to load configuration")?;
    args.apply(&mut config);

    let port = open_port(&config.serial.port, config.serial.baud_rate)
        .with_context(|| format!("failed to open serial port {}", config.serial.port))?;

    let daemon = Daemon::new(config);
    info!(endpoint = %daemon.endpoint(), "starting daemon");

    tokio::select! {
        result = daemon.run(port) => result.context("daemon stopped")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            info!("shutting down");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match DaemonArgs::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    if args.version {
        println!("{}", version_line("dsuld"));
        return ExitCode::SUCCESS;
    }

    if let Err(e) = logging::init(args.verbose, args.debug) {
        eprintln!("dsuld: {}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "fatal");
            eprintln!("dsuld: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
