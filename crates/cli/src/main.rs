mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{cmd_check, cmd_info, cmd_oracle, cmd_parse, cmd_schema, cmd_validate};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Business process test toolchain.
#[derive(Parser)]
#[command(
    name = "bptest",
    version,
    about = "Business process test toolchain: validate, parse and check test documents"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log debug events to stderr (RUST_LOG overrides)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a test document without resolving it
    Validate {
        /// Path to the YAML or JSON test document
        file: PathBuf,
    },

    /// Parse a test document and print the resolved model as JSON
    Parse {
        /// Path to the YAML or JSON test document
        file: PathBuf,
        /// Instant treated as "now" (RFC 3339), for reproducible output
        #[arg(long)]
        now: Option<String>,
    },

    /// Print the headline metadata of a test document
    Info {
        /// Path to the YAML or JSON test document
        file: PathBuf,
    },

    /// Print the JSON Schema of the test document format
    Schema,

    /// Run one business oracle against a record snapshot
    Oracle {
        /// Oracle name, e.g. accounting_equation
        kind: String,
        /// Path to the record snapshot JSON
        #[arg(long)]
        records: PathBuf,
        /// Oracle parameters as an inline JSON object
        #[arg(long)]
        params: Option<String>,
        /// Path to an oracle config TOML file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Evaluate every business assertion of a test against a record snapshot
    Check {
        /// Path to the YAML or JSON test document
        file: PathBuf,
        /// Path to the record snapshot JSON
        #[arg(long)]
        records: PathBuf,
        /// Path to an oracle config TOML file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Instant treated as "now" (RFC 3339) while resolving the document
        #[arg(long)]
        now: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Validate { file } => {
            cmd_validate(&file, cli.output, cli.quiet);
        }
        Commands::Parse { file, now } => {
            cmd_parse(&file, now.as_deref(), cli.output, cli.quiet);
        }
        Commands::Info { file } => {
            cmd_info(&file, cli.output, cli.quiet);
        }
        Commands::Schema => {
            cmd_schema();
        }
        Commands::Oracle {
            kind,
            records,
            params,
            config,
        } => {
            cmd_oracle(
                &kind,
                &records,
                params.as_deref(),
                config.as_deref(),
                cli.output,
                cli.quiet,
            );
        }
        Commands::Check {
            file,
            records,
            config,
            now,
        } => {
            cmd_check(
                &file,
                &records,
                config.as_deref(),
                now.as_deref(),
                cli.output,
                cli.quiet,
            );
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
