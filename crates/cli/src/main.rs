// Shipvoid CLI - cross-reference the Shipvoid Forecast against Legacy Unbilled Cartons

mod exit_codes;
mod export;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{recon_exit_code, EXIT_ERROR, EXIT_SUCCESS};
use shipvoid_recon::ReconError;

#[derive(Parser)]
#[command(name = "shipvoid")]
#[command(about = "Shipvoid / Legacy cross-reference reconciliation")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the newest (or given) extracts and write the report
    #[command(after_help = "\
Examples:
  shipvoid run --local
  shipvoid run --shipvoid 'Shipvoid Forecast 01-14-2026_0600.xlsm' --legacy Legacy.csv --json
  shipvoid run --config dc6031.toml --output report.json --detail-csv details.csv
  shipvoid run --source-dir /mnt/share/6006 --date-bucket week --strict")]
    Run(run::RunArgs),

    /// Validate a config file without running
    #[command(after_help = "\
Examples:
  shipvoid validate dc6031.toml")]
    Validate {
        /// Path to the TOML config file
        config: PathBuf,
    },

    /// Show which extracts a run would use
    Discover(run::SourceArgs),
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  shipvoid-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout is reserved for --json
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => run::cmd_run(args),
        Commands::Validate { config } => run::cmd_validate(&config),
        Commands::Discover(args) => run::cmd_discover(args),
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

    pub fn error(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn from_recon(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let err_hint = match &err {
            ReconError::NoInput { .. } => {
                Some("pass --shipvoid/--legacy, or point --source-dir/--legacy-dir at the extracts")
            }
            ReconError::Load(shipvoid_io::LoadError::MissingColumn { .. }) => {
                Some("check the extract's header row, or map the column in the config file")
            }
            _ => None,
        };
        let cli_err = Self::new(code, err.to_string());
        match err_hint {
            Some(h) => cli_err.with_hint(h),
            None => cli_err,
        }
    }
}
