mod commands;
mod helpers;

use clap::Parser;
use regress_core::domain::HarnessError;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let harness_error = error.as_harness_error();
            eprintln!("{}", harness_error.diagnostic_line());
            eprintln!("{}", harness_error.fatal_exit_line());
            harness_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("phosim-regress".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(name = "phosim-regress", about = "Regression harness for phosim image simulations")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Generate a star catalog, run the simulator per sensor, and collect outputs
    Run(commands::RunArgs),
    /// Compare a collected output tree against a reference tree
    Compare(commands::CompareArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Run(args) => commands::run_command(args),
        CliCommand::Compare(args) => commands::compare_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Harness(HarnessError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_harness_error(&self) -> HarnessError {
        match self {
            Self::Usage(message) => HarnessError::config("CONFIG.CLI_USAGE", message.clone()),
            Self::Harness(error) => error.clone(),
            Self::Internal(error) => HarnessError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
