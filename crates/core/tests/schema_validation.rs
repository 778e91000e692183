//! Checks the published JSON Schema at schema/business-process-test.schema.json
//! against the fixture documents, and checks that it agrees with the built-in
//! validator on which documents are acceptable.

use std::path::{Path, PathBuf};

use serde_json::Value;

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn load_schema() -> jsonschema::Validator {
    let schema_path = workspace_root().join("schema/business-process-test.schema.json");
    let schema_src = std::fs::read_to_string(&schema_path)
        .unwrap_or_else(|e| panic!("Failed to read schema at {}: {}", schema_path.display(), e));
    let schema_value: Value = serde_json::from_str(&schema_src).unwrap();
    jsonschema::validator_for(&schema_value)
        .unwrap_or_else(|e| panic!("Failed to compile schema: {}", e))
}

/// YAML and JSON fixtures both load through serde_yaml.
fn load_document(path: &Path) -> Value {
    let src = std::fs::read_to_string(path).unwrap();
    serde_yaml::from_str(&src).unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
}

fn collect_documents(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .is_some_and(|e| e == "yaml" || e == "yml" || e == "json")
        })
        .collect();
    paths.sort();
    paths
}

#[test]
fn valid_fixtures_conform_to_published_schema() {
    let validator = load_schema();
    let docs = collect_documents(&workspace_root().join("fixtures/tests"));

    let mut failures = Vec::new();
    for path in &docs {
        let instance = load_document(path);
        for error in validator.iter_errors(&instance) {
            failures.push(format!("{}: {}", path.display(), error));
        }
        if let Err(violations) = bptest_core::schema::validate(&instance) {
            for v in violations {
                failures.push(format!("{}: built-in validator: {}", path.display(), v));
            }
        }
    }

    assert!(docs.len() >= 3, "expected fixture documents, found {}", docs.len());
    assert!(
        failures.is_empty(),
        "Schema validation failed:\n{}",
        failures.join("\n")
    );
}

#[test]
fn invalid_fixture_is_rejected_by_both_validators() {
    let validator = load_schema();
    let instance = load_document(&workspace_root().join("fixtures/invalid/many_violations.yaml"));

    assert!(!validator.is_valid(&instance));
    let violations = bptest_core::schema::validate(&instance).unwrap_err();
    assert!(violations.len() >= 6, "{:#?}", violations);
}

#[test]
fn defaulted_model_still_conforms_to_published_schema() {
    let validator = load_schema();
    for path in collect_documents(&workspace_root().join("fixtures/tests")) {
        let test = bptest_core::schema::validate(&load_document(&path)).unwrap();
        let reserialized = serde_json::to_value(&test).unwrap();
        let errors: Vec<String> = validator
            .iter_errors(&reserialized)
            .map(|e| e.to_string())
            .collect();
        assert!(errors.is_empty(), "{}: {:#?}", path.display(), errors);

        let again = bptest_core::schema::validate(&reserialized).unwrap();
        assert_eq!(again, test, "{} did not survive a round trip", path.display());
    }
}
