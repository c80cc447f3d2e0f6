// tabrecon - reconcile two CSV files and report missing rows and discrepancies

mod exit_codes;
mod html;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tabrecon_core::ReconError;

use exit_codes::{recon_exit_code, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "tabrecon")]
#[command(about = "Reconcile two tables: rows missing on either side and field discrepancies")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize and reconcile two CSV files, then print the report
    #[command(after_help = "\
Examples:
  tabrecon run --source ledger.csv --target bank.csv
  tabrecon run -s ledger.csv -t bank.csv --format csv -o report.csv
  tabrecon run -s a.csv -t b.csv --date-column posted --fail-on-diff
  tabrecon run --config daily.recon.toml")]
    Run(recon::RunArgs),

    /// Validate a run config without reading any data
    #[command(after_help = "\
Examples:
  tabrecon validate daily.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::SchemaMismatch(msg) if msg.contains("nothing in common") => {
                Some("column names must match exactly between the two files".to_string())
            }
            ReconError::UnsupportedFormat(_) => Some("use --format json, csv or html".to_string()),
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Also bridges `log` records from tabrecon-core.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => recon::cmd_run(args),
        Commands::Validate { config } => recon::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
