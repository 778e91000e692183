use std::path::Path;
use std::process;

use bptest_core::validate_text;

use super::read_file;
use crate::OutputFormat;

pub(crate) fn cmd_validate(file: &Path, output: OutputFormat, quiet: bool) {
    let text = read_file(file, 1, output, quiet);
    let outcome = validate_text(&text);

    if outcome.valid {
        if !quiet {
            match output {
                OutputFormat::Text => println!("valid"),
                OutputFormat::Json => println!("{{\"valid\": true}}"),
            }
        }
        return;
    }

    match output {
        OutputFormat::Text => {
            if !quiet {
                eprintln!("invalid test document ({} errors)", outcome.errors.len());
                for err in &outcome.errors {
                    eprintln!("  - {}", err);
                }
            }
        }
        OutputFormat::Json => {
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&outcome).unwrap_or_default()
            );
        }
    }
    process::exit(1);
}
