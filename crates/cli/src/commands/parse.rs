use std::path::Path;
use std::process;

use bptest_core::parse_with_context;

use super::{parse_options, print_json, read_file};
use crate::OutputFormat;

/// Prints the resolved model. Failures print the tagged error as JSON in
/// either output mode, since callers of `parse` consume JSON.
pub(crate) fn cmd_parse(file: &Path, now: Option<&str>, output: OutputFormat, quiet: bool) {
    let options = parse_options(now, output, quiet);
    let text = read_file(file, 1, output, quiet);

    match parse_with_context(&text, &options) {
        Ok(parsed) => print_json(&parsed.test),
        Err(e) => {
            if output == OutputFormat::Text && !quiet {
                eprintln!("parse error: {}", e);
                for line in e.messages() {
                    eprintln!("  - {}", line);
                }
            }
            print_json(&e.to_json_value());
            process::exit(1);
        }
    }
}
