mod commands;
mod helpers;

use armor_check_core::domain::HarnessError;
use clap::Parser;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let harness_error = error.as_harness_error();
            eprintln!("{}", harness_error.diagnostic_line());
            if let Some(summary_line) = harness_error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            harness_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("armor-check".to_string())
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
#[command(
    name = "armor-check",
    version,
    about = "Golden-artifact validation for the armor AST-diff tool"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Run every fixture case and suite listed in a manifest
    Run(commands::RunArgs),
    /// Compare a golden diff report with a produced one
    Compare(commands::CompareArgs),
    /// Compare two text reports line by line
    Lines(commands::LinesArgs),
    /// Print the trailing segments of a path
    NormalizePath(commands::NormalizePathArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Run(args) => commands::run_regression_command(args),
        CliCommand::Compare(args) => commands::run_compare_command(args),
        CliCommand::Lines(args) => commands::run_lines_command(args),
        CliCommand::NormalizePath(args) => commands::run_normalize_path_command(args),
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

impl From<HarnessError> for CliError {
    fn from(error: HarnessError) -> Self {
        Self::Harness(error)
    }
}

impl CliError {
    fn as_harness_error(&self) -> HarnessError {
        match self {
            Self::Usage(message) => {
                HarnessError::invalid_configuration("CONFIG.CLI_USAGE", message.trim_end())
            }
            Self::Harness(error) => error.clone(),
            Self::Internal(error) => HarnessError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
