// stockmerge CLI - join a product list with location stock files into one report

mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use stockmerge_recon::{DuplicatePolicy, InputError, KeyStrategy, Location, Placement, Separator};

use exit_codes::{EXIT_ERROR, EXIT_INPUT, EXIT_INVALID_JOB, EXIT_OUTPUT, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "stockmerge")]
#[command(about = "Merge location stock files into a product list and export one report")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the product list with each location's stock and write the report
    #[command(after_help = "\
Examples:
  stockmerge run --products products.xlsx --location Ecom=ecom.csv --location Wari=wari.xlsx
  stockmerge run --config daily.toml
  stockmerge run --config daily.toml --output today.xlsx --group-by auto
  stockmerge run --config daily.toml --dry-run --json")]
    Run(RunArgs),

    /// Parse and validate a job file without reading any inputs
    #[command(after_help = "\
Examples:
  stockmerge validate daily.toml")]
    Validate {
        /// Path to the job file
        config: PathBuf,
    },

    /// List the location names, in output column order
    Locations,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Job file (TOML); flags given here override it
    #[arg(long, short = 'c', env = "STOCKMERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Master product list (.xlsx, .xls, .ods, .csv, .tsv)
    #[arg(long, short = 'p')]
    pub products: Option<PathBuf>,

    /// Location stock file as NAME=FILE (repeatable)
    #[arg(long = "location", short = 'l', value_name = "NAME=FILE")]
    pub locations: Vec<String>,

    /// Report path (.xlsx, .csv or .tsv) [default: Inventory_Report.xlsx]
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Identifier column, for the product list and every location
    #[arg(long)]
    pub key_column: Option<String>,

    /// Quantity column in the location files
    #[arg(long)]
    pub stock_column: Option<String>,

    /// SKU column cross-checked against item names (title_size only)
    #[arg(long)]
    pub sku_column: Option<String>,

    /// Matching key: identifier | title_size
    #[arg(long)]
    pub strategy: Option<KeyStrategy>,

    /// Duplicate identifiers within one location: last | sum
    #[arg(long)]
    pub duplicates: Option<DuplicatePolicy>,

    /// Where the location columns go: end | after_key
    #[arg(long)]
    pub placement: Option<Placement>,

    /// Group rows by this column ("auto" picks an order or phone column)
    #[arg(long)]
    pub group_by: Option<String>,

    /// Group separator: colors | blank_row
    #[arg(long)]
    pub separator: Option<Separator>,

    /// Sheet name in the report
    #[arg(long)]
    pub sheet: Option<String>,

    /// Print a JSON report on stdout
    #[arg(long)]
    pub json: bool,

    /// Run the join but do not write the report
    #[arg(long)]
    pub dry_run: bool,

    /// Log the first N normalized keys of every input file
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "10")]
    pub debug_keys: Option<usize>,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

/// Install the log subscriber. `RUST_LOG` wins over the flags.
fn init_logging(verbose: u8, quiet: bool, debug_keys: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let default = if debug_keys {
        format!("{level},{}=debug", run::KEYS_LOG_TARGET)
    } else {
        level.to_string()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    // try_init: tests may install a subscriber first
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let debug_keys = matches!(&cli.command, Commands::Run(args) if args.debug_keys.is_some());
    init_logging(cli.verbose, cli.quiet, debug_keys);

    let result = match cli.command {
        Commands::Run(args) => run::cmd_run(args, cli.quiet),
        Commands::Validate { config } => run::cmd_validate(config),
        Commands::Locations => {
            for location in Location::ALL {
                println!("{location}");
            }
            Ok(())
        }
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
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INPUT, message: msg.into(), hint: None }
    }

    pub fn job(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INVALID_JOB, message: msg.into(), hint: None }
    }

    pub fn output(msg: impl Into<String>) -> Self {
        Self { code: EXIT_OUTPUT, message: msg.into(), hint: None }
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<InputError> for CliError {
    fn from(err: InputError) -> Self {
        match &err {
            InputError::ConfigParse(_) | InputError::ConfigValidation(_) => CliError::job(err.to_string()),
            InputError::UnknownLocation(_) => CliError::args(err.to_string()),
            InputError::DuplicateLocation(_) => CliError::args(err.to_string())
                .with_hint("each location may be given once"),
            InputError::NoProductList => CliError::input(err.to_string())
                .with_hint("pass --products FILE or set `products` in the job file"),
            InputError::MissingIdentifierColumn { .. } => CliError::input(err.to_string())
                .with_hint("name the column with --key-column or `key_column` in the job file"),
            _ => CliError::input(err.to_string()),
        }
    }
}
