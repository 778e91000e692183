use std::path::Path;

use bptest_core::extract_metadata;

use super::{print_json, read_file};
use crate::OutputFormat;

pub(crate) fn cmd_info(file: &Path, output: OutputFormat, quiet: bool) {
    let text = read_file(file, 1, output, quiet);
    let summary = extract_metadata(&text);

    match output {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Text => {
            if summary.is_empty() {
                println!("{{}}");
                return;
            }
            let rows = [
                ("id", summary.id.clone()),
                ("title", summary.title.clone()),
                ("industry", summary.industry.clone()),
                ("steps", summary.step_count.map(|n| n.to_string())),
                ("personas", summary.persona_count.map(|n| n.to_string())),
                (
                    "estimated duration",
                    summary.estimated_duration.map(|s| format!("{}s", s)),
                ),
            ];
            for (label, value) in rows {
                if let Some(value) = value {
                    println!("{:<20}{}", format!("{}:", label), value);
                }
            }
        }
    }
}
