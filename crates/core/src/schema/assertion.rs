//! Assertion groups: the `type` discriminator and the per-type check shapes.

use bptest_records::OracleKind;
use serde_json::Value;

use super::fields::{index_path, json_type, Checker, Node};
use crate::model::*;

const GROUP_FIELDS: &[&str] = &["type", "description", "assertions"];
const UI_FIELDS: &[&str] = &["selector", "condition", "value"];
const DATABASE_FIELDS: &[&str] = &["table", "filter", "expected_count", "exists"];
const BUSINESS_FIELDS: &[&str] = &["oracle", "params", "expected", "description"];

pub(crate) fn validate_assertions(
    checker: &mut Checker,
    path: &str,
    items: &[Value],
) -> Vec<AssertionGroup> {
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| validate_group(checker, &index_path(path, i), item))
        .collect()
}

fn validate_group(checker: &mut Checker, path: &str, value: &Value) -> Option<AssertionGroup> {
    let map = checker.element(path, value)?;
    let node = Node::new(path, map);

    let assertion_type = match node.get("type") {
        None => {
            checker.error(node.path_of("type"), "missing required field");
            return None;
        }
        Some(Value::String(s)) => match AssertionType::from_keyword(s) {
            Some(t) => t,
            None => {
                checker.error(
                    node.path_of("type"),
                    format!(
                        "unknown assertion type '{}'; expected one of {}",
                        s,
                        AssertionType::expected()
                    ),
                );
                return None;
            }
        },
        Some(other) => {
            checker.error(
                node.path_of("type"),
                format!("expected string, found {}", json_type(other)),
            );
            return None;
        }
    };

    checker.unknown_fields(node, GROUP_FIELDS, "an assertion group");
    let description = checker.optional_str(node, "description");
    let items = checker.required_array(node, "assertions");
    let items_path = node.path_of("assertions");

    match assertion_type {
        AssertionType::Ui => {
            let checks = each(checker, &items_path, items, ui_check);
            Some(AssertionGroup::Ui(UiAssertions {
                description,
                assertions: checks?,
            }))
        }
        AssertionType::Database => {
            let checks = each(checker, &items_path, items, database_check);
            Some(AssertionGroup::Database(DatabaseAssertions {
                description,
                assertions: checks?,
            }))
        }
        AssertionType::Business => {
            let checks = each(checker, &items_path, items, business_check);
            Some(AssertionGroup::Business(BusinessAssertions {
                description,
                assertions: checks?,
            }))
        }
    }
}

/// Validate every check in `items`; `None` if the list itself was unusable.
fn each<T>(
    checker: &mut Checker,
    path: &str,
    items: Option<&Vec<Value>>,
    check: fn(&mut Checker, Node<'_>) -> Option<T>,
) -> Option<Vec<T>> {
    let items = items?;
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = index_path(path, i);
        if let Some(map) = checker.element(&item_path, item) {
            if let Some(parsed) = check(checker, Node::new(&item_path, map)) {
                out.push(parsed);
            }
        }
    }
    Some(out)
}

fn ui_check(checker: &mut Checker, node: Node<'_>) -> Option<UiCheck> {
    checker.unknown_fields(node, UI_FIELDS, "a ui assertion");
    let selector = checker.required_str(node, "selector");
    let condition = checker.required_keyword::<UiCondition>(node, "condition");
    let value = node.get("value").cloned();

    if let Some(c) = condition {
        if c.needs_value() && value.is_none() {
            checker.error(
                node.path_of("value"),
                format!("required when condition is '{}'", c.as_str()),
            );
        }
    }

    Some(UiCheck {
        selector: selector?,
        condition: condition?,
        value,
    })
}

fn database_check(checker: &mut Checker, node: Node<'_>) -> Option<DatabaseCheck> {
    checker.unknown_fields(node, DATABASE_FIELDS, "a database assertion");
    let table = checker.required_keyword::<UniversalTable>(node, "table");
    let filter = checker.optional_object(node, "filter").cloned().unwrap_or_default();
    let expected_count = checker.optional_uint(node, "expected_count");
    let exists = checker.optional_bool(node, "exists");

    if node.get("expected_count").is_none() && node.get("exists").is_none() {
        checker.error(
            node.path,
            "database assertion needs 'expected_count' or 'exists'",
        );
    }

    Some(DatabaseCheck {
        table: table?,
        filter,
        expected_count,
        exists,
    })
}

fn business_check(checker: &mut Checker, node: Node<'_>) -> Option<BusinessCheck> {
    checker.unknown_fields(node, BUSINESS_FIELDS, "a business assertion");
    let oracle = checker.required_keyword::<OracleKind>(node, "oracle");
    let params = checker.optional_object(node, "params").cloned().unwrap_or_default();
    let expected = checker.optional_bool(node, "expected").unwrap_or(true);
    let description = checker.optional_str(node, "description");

    Some(BusinessCheck {
        oracle: oracle?,
        params,
        expected,
        description,
    })
}
