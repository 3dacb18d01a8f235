//! `asl` binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use asl_cli::cli::{Cli, Commands};
use asl_cli::commands::{ConsolelogCommand, QueryCommand, SendlogCommand, open_facility};
use asl_cli::output::OutputFormat;

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), asl_cli::CliError> {
    let facility = open_facility(cli.store.as_deref())?;
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Consolelog(args) => {
            ConsolelogCommand::new(&facility).execute(&args)?;
        }
        Commands::Sendlog(args) => {
            SendlogCommand::new(&facility).execute(&args)?;
        }
        Commands::Query(args) => {
            QueryCommand::new(&facility).execute(&mut stdout, &format, &args)?;
        }
    }
    Ok(())
}
