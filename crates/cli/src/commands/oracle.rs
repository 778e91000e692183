use std::path::Path;
use std::process;

use bptest_oracle::{evaluate_json, OracleKind};
use serde_json::Value;

use super::{load_config, print_json, read_json, EXIT_INPUT_ERROR};
use crate::{report_error, OutputFormat};

/// Exit 0 for a valid verdict, 1 for an invalid one, 2 when the inputs
/// could not be evaluated at all.
pub(crate) fn cmd_oracle(
    kind: &str,
    records_path: &Path,
    params: Option<&str>,
    config_path: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let kind: OracleKind = match kind.parse() {
        Ok(k) => k,
        Err(e) => {
            let msg = format!("error: {}", e);
            report_error(&msg, output, quiet);
            process::exit(EXIT_INPUT_ERROR);
        }
    };

    let params: Value = match params {
        None => Value::Null,
        Some(raw) => match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                let msg = format!("error: --params is not valid JSON: {}", e);
                report_error(&msg, output, quiet);
                process::exit(EXIT_INPUT_ERROR);
            }
        },
    };

    let records = read_json(records_path, EXIT_INPUT_ERROR, output, quiet);
    let config = load_config(config_path, output, quiet);

    let verdict = match evaluate_json(kind, &params, &records, &config) {
        Ok(v) => v,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(EXIT_INPUT_ERROR);
        }
    };

    if !quiet {
        match output {
            OutputFormat::Json => print_json(&verdict),
            OutputFormat::Text => {
                println!(
                    "{}: {}",
                    kind,
                    if verdict.valid() { "valid" } else { "invalid" }
                );
                print_json(&verdict);
            }
        }
    }

    if !verdict.valid() {
        process::exit(1);
    }
}
