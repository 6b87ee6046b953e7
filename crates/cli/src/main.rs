// tradeaudit CLI - reconcile a clearing report against a broker report

mod exit_codes;
mod logging;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "tradeaudit")]
#[command(about = "Reconcile trade quantities and fees between two execution reports")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the primary report against the counterparty report
    #[command(after_help = "\
Examples:
  tradeaudit run firm58.csv broker.csv
  tradeaudit run firm58.csv broker.csv --config recon.toml --audit-dir out/
  tradeaudit run firm58.csv broker.csv --json > result.json
  tradeaudit run firm58.csv broker.csv --strict || echo 'breaks found'

Exit codes:
  0   reconciled (discrepancies are reported, not fatal)
  60  discrepancies found with --strict
  61  input report missing a column or not valid CSV
  62  invalid config
  63  cannot read input or write output")]
    Run {
        /// Primary (clearing) report CSV
        primary: PathBuf,

        /// Counterparty (execution venue) report CSV
        counterparty: PathBuf,

        /// Reconciliation config (TOML). Built-in venue table when omitted.
        #[arg(long, short = 'c', env = "TRADEAUDIT_CONFIG")]
        config: Option<PathBuf>,

        /// Print the full result as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Write the comparison table as CSV
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write comparison and per-source discrepancy CSVs into this directory
        #[arg(long, value_name = "DIR")]
        audit_dir: Option<PathBuf>,

        /// Exit 60 when any key has a nonzero discrepancy
        #[arg(long)]
        strict: bool,
    },

    /// Check a config file without running a reconciliation
    #[command(after_help = "\
Examples:
  tradeaudit validate recon.toml")]
    Validate {
        /// Config file (TOML)
        config: PathBuf,
    },

    /// List the venue-code table and consolidated venues
    #[command(after_help = "\
Examples:
  tradeaudit venues
  tradeaudit venues --config recon.toml --json")]
    Venues {
        /// Config file (TOML). Built-in table when omitted.
        #[arg(long, short = 'c', env = "TRADEAUDIT_CONFIG")]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Run { primary, counterparty, config, json, output, audit_dir, strict } => {
            recon::cmd_run(recon::RunArgs { primary, counterparty, config, json, output, audit_dir, strict })
        }
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Venues { config, json } => recon::cmd_venues(config, json),
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

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
