//! DSUL client: sends commands to the daemon

use anyhow::{bail, Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use tracing::{debug, info};

use dsul_app_lib::cli::{ClientArgs, CliError};
use dsul_app_lib::report::render_information;
use dsul_app_lib::{logging, version_line};
use dsul_core::client::{ClientGate, Responder, Response, RESPONSE_LINGER};
use dsul_core::config::Config;
use dsul_core::ipc::Endpoint;

async fn run(config: Config, args: &ClientArgs) -> Result<bool> {
    let commands = args.commands(&config)?;
    let expected = commands.len();

    let endpoint = Endpoint::for_client(&config.network);
    let mut gate = ClientGate::connect(endpoint.clone(), config.secret().map(str::to_string));
    for command in commands {
        gate.send(command).await?;
    }
    gate.close();

    if !gate.connected().await {
        gate.shutdown().await.context("could not reach daemon")?;
        bail!("could not reach daemon at {}", endpoint);
    }

    let mut responder = Responder::new(config.bounds());
    let responses = responder.collect(&mut gate, expected, RESPONSE_LINGER).await;
    debug!(received = responses.len(), expected, "responses collected");

    if responses.len() < expected {
        gate.shutdown().await.context("lost connection to daemon")?;
        bail!("daemon answered {} of {} commands", responses.len(), expected);
    }
    gate.shutdown().await?;

    for response in &responses {
        if let Response::Telemetry(telemetry) = response {
            print!(
                "{}",
                render_information(&config, responder.bounds(), Some(telemetry))
            );
        }
    }

    let (ok, failed) = responder.counts();
    info!(ok, failed, "done");
    Ok(failed == 0)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match ClientArgs::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    if args.version {
        println!("{}", version_line("dsulc"));
        return ExitCode::SUCCESS;
    }

    if let Err(e) = logging::init(args.verbose, false) {
        eprintln!("dsulc: {}", e);
        return ExitCode::FAILURE;
    }

    let mut config = match Config::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("dsulc: {}", e);
            return ExitCode::FAILURE;
        }
    };
    args.apply(&mut config);

    match run(config, &args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            match e.downcast_ref::<CliError>() {
                Some(CliError::NoAction) => {
                    let _ = ClientArgs::command().print_help();
                }
                Some(cli_error) => {
                    eprintln!("dsulc: {}\n", cli_error);
                    let _ = ClientArgs::command().print_help();
                }
                None => eprintln!("dsulc: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
