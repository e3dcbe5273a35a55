use std::process::ExitCode;

use charge_limiter::args::{ChargeLimiterArgs, Command};
use charge_limiter::driver::{ensure_supported_platform, SystemConnector};
use charge_limiter::service::{LaunchdConfig, LaunchdService, Transition};
use charge_limiter::{ChargeLimitController, Error, Result};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args: ChargeLimiterArgs = argh::from_env();
    setup_logging(args.verbose);

    if args.version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }
    let Some(command) = args.command else {
        eprintln!("Error: missing subcommand, see --help");
        return ExitCode::FAILURE;
    };

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Command) -> Result<()> {
    ensure_supported_platform()?;

    let config = LaunchdConfig::for_current_exe()
        .map_err(|err| Error::Persistence(err.into()))?;
    let controller = ChargeLimitController::new(SystemConnector, LaunchdService::new(config));

    match command {
        Command::Read(read) if read.raw => println!("{}", controller.read_register_byte()?),
        Command::Read(_) => println!("{}", controller.read()?),
        Command::Write(write) => {
            controller.write(write.value)?;
        }
        Command::Persist(_) => {
            if controller.persist_current()? == Transition::Unchanged {
                println!("Already persisted.");
            }
        }
        Command::Unpersist(_) => {
            if controller.unpersist()? == Transition::Unchanged {
                println!("Already not persisted.");
            }
        }
    }
    Ok(())
}
