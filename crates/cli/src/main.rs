// Baseliner CLI - headless baseline reconciliation operations

mod compare;
mod exit_codes;
mod fabric;
mod ops;
mod run;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use baseliner_recon::config::MatchStrategy;
use baseliner_recon::EngineError;
use exit_codes::{
    EXIT_INVALID_CONFIG, EXIT_IO, EXIT_MISSING_COLUMN, EXIT_SCHEMA_MISMATCH, EXIT_SUCCESS,
};

pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Map engine errors onto the exit-code registry.
pub fn engine_err(err: EngineError) -> CliError {
    let code = match &err {
        EngineError::ConfigParse(_)
        | EngineError::ConfigValidation(_)
        | EngineError::UnknownSource(_) => EXIT_INVALID_CONFIG,
        EngineError::MissingColumn { .. } => EXIT_MISSING_COLUMN,
        EngineError::SchemaMismatch { .. } => EXIT_SCHEMA_MISMATCH,
        EngineError::Io(_) => EXIT_IO,
    };
    CliError::new(code, err.to_string())
}

#[derive(Parser)]
#[command(name = "blr")]
#[command(about = "Baseline reconciliation for firewall, fabric, and inventory exports")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    Exact,
    Similarity,
}

impl From<StrategyArg> for MatchStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Exact => MatchStrategy::Exact,
            StrategyArg::Similarity => MatchStrategy::Similarity,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a config-driven reconciliation pass
    #[command(after_help = "\
Examples:
  blr run sweep.recon.toml
  blr run sweep.recon.toml --json
  blr run sweep.recon.toml --output report.json")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Output the JSON report to stdout instead of a human summary
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Suppress stderr notes (e.g. skipped boundary values)
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  blr validate sweep.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },

    /// Annotate a rules CSV with baseline verdicts
    #[command(after_help = "\
Examples:
  blr classify rules.csv baseline.csv --source-column 'Source Address' --dest-column 'Destination Address'
  blr classify rules.csv baseline.csv --source-column Source -o annotated.csv")]
    Classify {
        /// Rules CSV to classify
        rules: PathBuf,

        /// Baseline CSV holding the approved boundaries
        baseline: PathBuf,

        /// Column of the baseline file holding boundary strings
        #[arg(long, default_value = "Boundary")]
        boundary_column: String,

        /// Rule column holding source addresses
        #[arg(long)]
        source_column: Option<String>,

        /// Rule column holding destination addresses
        #[arg(long)]
        dest_column: Option<String>,

        /// Output CSV (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Suppress stderr notes (e.g. skipped boundary values)
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Pair rows of two CSVs on key fields
    #[command(after_help = "\
Examples:
  blr join extraction.csv npd.csv --on Name
  blr join extraction.csv npd.csv --on 'Source Address,Destination Address,Service'
  blr join extraction.csv npd.csv --on Name --strategy similarity --threshold 0.8")]
    Join {
        /// Left CSV (drives output order)
        left: PathBuf,

        /// Right CSV
        right: PathBuf,

        /// Key fields, comma-separated. Repeatable.
        #[arg(long = "on", value_name = "FIELDS", value_delimiter = ',', required = true)]
        on: Vec<String>,

        /// Key field names on the right CSV when they differ
        #[arg(long = "right-on", value_name = "FIELDS", value_delimiter = ',')]
        right_on: Vec<String>,

        #[arg(long, value_enum, default_value_t = StrategyArg::Exact)]
        strategy: StrategyArg,

        /// Minimum blended similarity for --strategy similarity
        #[arg(long, default_value_t = 0.7)]
        threshold: f64,

        /// Output CSV (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Drop duplicate rows from a CSV, keeping first occurrences
    #[command(after_help = "\
Examples:
  blr dedupe rules.csv -o unique.csv
  blr dedupe rules.csv --on Name")]
    Dedupe {
        input: PathBuf,

        /// Compare only these fields instead of the full row
        #[arg(long = "on", value_name = "FIELDS", value_delimiter = ',')]
        on: Vec<String>,

        /// Output CSV (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Extract endpoint (EPG, IP) pairs from a fabric export
    #[command(after_help = "\
Examples:
  blr endpoints fabric.json -o endpoints.csv")]
    Endpoints {
        /// Fabric export JSON
        input: PathBuf,

        /// Output CSV (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Extract the contract catalog (or per-EPG links) from a fabric export
    #[command(after_help = "\
Examples:
  blr contracts fabric.json -o contracts_only.csv
  blr contracts fabric.json --links -o contract_links.csv")]
    Contracts {
        /// Fabric export JSON
        input: PathBuf,

        /// Emit consumer/provider links per EPG instead of the catalog
        #[arg(long)]
        links: bool,

        /// Output CSV (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Compare two same-schema CSVs into a styled Excel report
    #[command(after_help = "\
Examples:
  blr compare before.csv after.csv
  blr compare before.csv after.csv -t 0.8 -o drift.xlsx")]
    Compare {
        left: PathBuf,
        right: PathBuf,

        /// Minimum blended row similarity
        #[arg(long, short = 't', default_value_t = 0.7)]
        threshold: f64,

        #[arg(long, short = 'o', default_value = "comparison_results.xlsx")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli.command) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("error: {}", e.message);
            if let Some(hint) = e.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(e.code)
        }
    }
}

fn dispatch(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Run { config, json, output, quiet } => run::cmd_run(config, json, output, quiet),
        Commands::Validate { config } => run::cmd_validate(config),
        Commands::Classify {
            rules,
            baseline,
            boundary_column,
            source_column,
            dest_column,
            output,
            quiet,
        } => ops::cmd_classify(rules, baseline, boundary_column, source_column, dest_column, output, quiet),
        Commands::Join { left, right, on, right_on, strategy, threshold, output } => {
            ops::cmd_join(left, right, on, right_on, strategy.into(), threshold, output)
        }
        Commands::Dedupe { input, on, output } => ops::cmd_dedupe(input, on, output),
        Commands::Endpoints { input, output } => fabric::cmd_endpoints(input, output),
        Commands::Contracts { input, links, output } => fabric::cmd_contracts(input, links, output),
        Commands::Compare { left, right, threshold, output } => {
            compare::cmd_compare(left, right, threshold, output)
        }
    }
}
