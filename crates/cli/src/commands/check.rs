use std::path::Path;
use std::process;

use bptest_core::model::Keyword;
use bptest_core::{parse_with_context, BusinessCheck, ParsedDocument, TemplateResolver};
use bptest_oracle::{evaluate, OracleConfig, OracleKind, Verdict};
use bptest_records::RecordSet;
use serde::Serialize;
use serde_json::Value;

use super::{load_config, parse_options, print_json, read_file, read_json, EXIT_INPUT_ERROR};
use crate::{report_error, OutputFormat};

/// One business assertion and what its oracle said.
#[derive(Debug, Serialize)]
struct AssertionOutcome {
    oracle: OracleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    expected: bool,
    passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    test: String,
    passed: usize,
    failed: usize,
    assertions: Vec<AssertionOutcome>,
}

pub(crate) fn cmd_check(
    file: &Path,
    records_path: &Path,
    config_path: Option<&Path>,
    now: Option<&str>,
    output: OutputFormat,
    quiet: bool,
) {
    let options = parse_options(now, output, quiet);
    let text = read_file(file, 1, output, quiet);
    let parsed = match parse_with_context(&text, &options) {
        Ok(p) => p,
        Err(e) => {
            let mut msg = format!("parse error: {}", e);
            for line in e.messages() {
                msg.push_str("\n  - ");
                msg.push_str(&line);
            }
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let snapshot = read_json(records_path, EXIT_INPUT_ERROR, output, quiet);
    let records = match RecordSet::from_json(&snapshot) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!("error: invalid records in '{}': {}", records_path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(EXIT_INPUT_ERROR);
        }
    };
    let config = load_config(config_path, output, quiet);

    let assertions: Vec<AssertionOutcome> = parsed
        .test
        .business_checks()
        .map(|check| run_check(check, &parsed, &records, &config))
        .collect();
    let failed = assertions.iter().filter(|a| !a.passed).count();
    let report = CheckReport {
        test: parsed.test.id.clone(),
        passed: assertions.len() - failed,
        failed,
        assertions,
    };
    tracing::debug!(
        test = %report.test,
        passed = report.passed,
        failed,
        "business assertions checked"
    );

    if !quiet {
        match output {
            OutputFormat::Json => print_json(&report),
            OutputFormat::Text => print_text(&report),
        }
    }

    if report.failed > 0 {
        process::exit(1);
    }
}

/// Resolve the assertion's params in the document's context, fill in the
/// industry workflow where one is needed, then compare the verdict with
/// the expected outcome.
fn run_check(
    check: &BusinessCheck,
    parsed: &ParsedDocument,
    records: &RecordSet,
    config: &OracleConfig,
) -> AssertionOutcome {
    let mut params = TemplateResolver::new(&parsed.context).resolve_map(&check.params);
    if check.oracle == OracleKind::DomainWorkflow && !params.contains_key("workflow") {
        params.insert(
            "workflow".to_string(),
            Value::from(parsed.test.context.industry.as_str()),
        );
    }

    let (verdict, error) = match evaluate(check.oracle, &params, records, config) {
        Ok(v) => (Some(v), None),
        Err(e) => (None, Some(e.to_string())),
    };
    let passed = verdict
        .as_ref()
        .is_some_and(|v| v.valid() == check.expected);

    AssertionOutcome {
        oracle: check.oracle,
        description: check.description.clone(),
        expected: check.expected,
        passed,
        verdict,
        error,
    }
}

fn print_text(report: &CheckReport) {
    println!("{}", report.test);
    for outcome in &report.assertions {
        let status = if outcome.passed { "PASS" } else { "FAIL" };
        let mut line = format!("  {} {}", status, outcome.oracle);
        if let Some(desc) = &outcome.description {
            line.push_str(&format!(" ({})", desc));
        }
        match (&outcome.verdict, &outcome.error) {
            (_, Some(err)) => line.push_str(&format!(": {}", err)),
            (Some(v), None) if !outcome.passed => line.push_str(&format!(
                ": expected valid={}, got valid={}",
                outcome.expected,
                v.valid()
            )),
            _ => {}
        }
        println!("{}", line);
    }
    println!("{} passed, {} failed", report.passed, report.failed);
}
