//! One module per subcommand. Each `cmd_*` prints its result and exits the
//! process with a non-zero code on failure.

mod check;
mod info;
mod oracle;
mod parse;
mod schema;
mod validate;

use std::path::Path;
use std::process;

use bptest_core::context::parse_instant;
use bptest_core::ParseOptions;
use bptest_oracle::OracleConfig;

use crate::{report_error, OutputFormat};

pub(crate) use check::cmd_check;
pub(crate) use info::cmd_info;
pub(crate) use oracle::cmd_oracle;
pub(crate) use parse::cmd_parse;
pub(crate) use schema::cmd_schema;
pub(crate) use validate::cmd_validate;

/// Exit code for unreadable or ill-formed inputs (as opposed to a failed check).
pub(crate) const EXIT_INPUT_ERROR: i32 = 2;

pub(crate) fn read_file(path: &Path, exit_code: i32, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(exit_code);
        }
    }
}

pub(crate) fn read_json(
    path: &Path,
    exit_code: i32,
    output: OutputFormat,
    quiet: bool,
) -> serde_json::Value {
    let text = read_file(path, exit_code, output, quiet);
    match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(exit_code);
        }
    }
}

/// `--now` as parse options; absent means the system clock.
pub(crate) fn parse_options(now: Option<&str>, output: OutputFormat, quiet: bool) -> ParseOptions {
    match now {
        None => ParseOptions::default(),
        Some(raw) => match parse_instant(raw) {
            Some(instant) => ParseOptions::at(instant),
            None => {
                let msg = format!("error: --now '{}' is not an RFC 3339 timestamp", raw);
                report_error(&msg, output, quiet);
                process::exit(EXIT_INPUT_ERROR);
            }
        },
    }
}

/// `--config` as an oracle config; absent means the defaults.
pub(crate) fn load_config(path: Option<&Path>, output: OutputFormat, quiet: bool) -> OracleConfig {
    let Some(path) = path else {
        return OracleConfig::default();
    };
    match OracleConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(EXIT_INPUT_ERROR);
        }
    }
}

pub(crate) fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!("serialization error: {}", e))
    );
}
