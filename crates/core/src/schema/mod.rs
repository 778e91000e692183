//! Schema validation of a deserialized test document.
//!
//! [`validate`] walks the untyped tree once, records every violation it
//! meets (never stopping at the first), applies defaults, and returns the
//! typed [`BusinessProcessTest`] only when the document is clean.

mod action;
mod assertion;
mod fields;

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::error::{SchemaViolation, ROOT_PATH};
use crate::model::*;
use fields::{index_path, json_type, Checker, Node};

const TOP_LEVEL_FIELDS: &[&str] = &[
    "id",
    "title",
    "version",
    "description",
    "context",
    "personas",
    "setup",
    "steps",
    "cleanup",
    "assertions",
    "metadata",
];
const CONTEXT_FIELDS: &[&str] = &[
    "organization_id",
    "industry",
    "tenant",
    "currency",
    "locale",
    "clock",
];
const PERSONA_FIELDS: &[&str] = &["role", "permissions", "organization_id", "description"];
const STEP_FIELDS: &[&str] = &["id", "description", "persona", "actions", "timeout", "retry"];
const METADATA_FIELDS: &[&str] = &["tags", "priority", "estimated_duration", "author"];

/// Validate a document tree and build the typed model with defaults applied.
pub fn validate(tree: &Value) -> Result<BusinessProcessTest, Vec<SchemaViolation>> {
    let map = match tree {
        Value::Object(map) if !map.is_empty() => map,
        Value::Object(_) | Value::Null => {
            return Err(vec![SchemaViolation::new(ROOT_PATH, "document is empty")]);
        }
        other => {
            return Err(vec![SchemaViolation::new(
                ROOT_PATH,
                format!("document must be an object, found {}", json_type(other)),
            )]);
        }
    };

    let mut checker = Checker::new();
    let node = Node::new(ROOT_PATH, map);
    checker.unknown_fields(node, TOP_LEVEL_FIELDS, "a test document");

    let id = checker.required_str(node, "id");
    if let Some(id) = &id {
        if id.chars().any(char::is_whitespace) {
            checker.error(node.path_of("id"), "must not contain whitespace");
        }
    }
    let title = checker.required_str(node, "title");
    let version = checker
        .optional_str(node, "version")
        .unwrap_or_else(|| DEFAULT_VERSION.to_string());
    let description = checker.optional_str(node, "description");

    let context = checker
        .required_object(node, "context")
        .and_then(|m| validate_context(&mut checker, Node::new("context", m)));

    let personas = checker
        .required_object(node, "personas")
        .map(|m| validate_personas(&mut checker, Node::new("personas", m)));

    let setup = checker
        .optional_array(node, "setup")
        .map(|items| action::validate_actions(&mut checker, "setup", items))
        .unwrap_or_default();

    let steps = checker.required_array(node, "steps").map(|items| {
        let known: Option<BTreeSet<&str>> = personas
            .as_ref()
            .map(|p| p.keys().map(String::as_str).collect());
        validate_steps(&mut checker, items, known.as_ref())
    });

    let cleanup = checker
        .optional_array(node, "cleanup")
        .map(|items| action::validate_actions(&mut checker, "cleanup", items))
        .unwrap_or_default();

    let assertions = checker
        .optional_array(node, "assertions")
        .map(|items| assertion::validate_assertions(&mut checker, "assertions", items))
        .unwrap_or_default();

    let metadata = checker
        .optional_object(node, "metadata")
        .map(|m| validate_metadata(&mut checker, Node::new("metadata", m)))
        .unwrap_or_else(|| Some(TestMetadata::default()));

    let built = (|| {
        Some(BusinessProcessTest {
            id: id?,
            title: title?,
            version,
            description,
            context: context?,
            personas: personas?,
            setup,
            steps: steps?,
            cleanup,
            assertions,
            metadata: metadata?,
        })
    })();

    match built {
        Some(test) if checker.is_clean() => Ok(test),
        _ => {
            let mut violations = checker.into_violations();
            if violations.is_empty() {
                violations.push(SchemaViolation::new(ROOT_PATH, "document is incomplete"));
            }
            Err(violations)
        }
    }
}

fn validate_context(checker: &mut Checker, node: Node<'_>) -> Option<TestContext> {
    checker.unknown_fields(node, CONTEXT_FIELDS, "the test context");

    let organization_id = checker.required_str(node, "organization_id");
    let industry = checker
        .optional_keyword::<Industry>(node, "industry")
        .unwrap_or_default();
    let tenant = checker.optional_str(node, "tenant");
    let locale = checker.optional_str(node, "locale");

    let currency = match checker.optional_str(node, "currency") {
        Some(c) if c.len() == 3 && c.chars().all(|ch| ch.is_ascii_uppercase()) => c,
        Some(c) => {
            checker.error(
                node.path_of("currency"),
                format!("'{}' is not a 3-letter ISO currency code", c),
            );
            c
        }
        None => DEFAULT_CURRENCY.to_string(),
    };

    let clock = checker.optional_str(node, "clock");
    if let Some(c) = &clock {
        if crate::context::parse_instant(c).is_none() {
            checker.error(
                node.path_of("clock"),
                format!("'{}' is not an RFC 3339 timestamp", c),
            );
        }
    }

    Some(TestContext {
        organization_id: organization_id?,
        industry,
        tenant,
        currency,
        locale,
        clock,
    })
}

/// Personas whose entries failed validation stay in the map as empty
/// placeholders so step references to them do not cascade; the violation
/// is already recorded, so the document cannot pass.
fn validate_personas(checker: &mut Checker, node: Node<'_>) -> BTreeMap<String, Persona> {
    let mut personas = BTreeMap::new();
    for (name, value) in node.map {
        let path = node.path_of(name);
        let Some(map) = checker.element(&path, value) else {
            personas.insert(name.clone(), placeholder_persona());
            continue;
        };
        let pnode = Node::new(&path, map);
        checker.unknown_fields(pnode, PERSONA_FIELDS, "a persona");
        let role = checker.required_str(pnode, "role");
        let permissions = checker.string_list(pnode, "permissions");
        let organization_id = checker.optional_str(pnode, "organization_id");
        let description = checker.optional_str(pnode, "description");

        let persona = match (role, permissions) {
            (Some(role), Some(permissions)) => Persona {
                role,
                permissions,
                organization_id,
                description,
            },
            _ => placeholder_persona(),
        };
        personas.insert(name.clone(), persona);
    }
    personas
}

fn placeholder_persona() -> Persona {
    Persona {
        role: String::new(),
        permissions: Vec::new(),
        organization_id: None,
        description: None,
    }
}

fn validate_steps(
    checker: &mut Checker,
    items: &[Value],
    personas: Option<&BTreeSet<&str>>,
) -> Vec<Step> {
    let mut seen_ids = BTreeSet::new();
    let mut steps = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        let path = index_path("steps", i);
        let Some(map) = checker.element(&path, item) else {
            continue;
        };
        let node = Node::new(&path, map);
        checker.unknown_fields(node, STEP_FIELDS, "a step");

        let id = checker.required_str(node, "id");
        if let Some(id) = &id {
            if !seen_ids.insert(id.clone()) {
                checker.error(node.path_of("id"), format!("duplicate step id '{}'", id));
            }
        }
        let description = checker.optional_str(node, "description");

        let persona = checker.required_str(node, "persona");
        if let (Some(name), Some(known)) = (&persona, personas) {
            if !known.contains(name.as_str()) {
                checker.error(
                    node.path_of("persona"),
                    format!("persona '{}' is not declared in personas", name),
                );
            }
        }

        let actions = checker
            .required_array(node, "actions")
            .map(|items| action::validate_actions(checker, &node.path_of("actions"), items));

        let timeout = match checker.optional_uint(node, "timeout") {
            Some(0) => {
                checker.error(node.path_of("timeout"), "must be greater than zero");
                DEFAULT_STEP_TIMEOUT_MS
            }
            Some(t) => t,
            None => DEFAULT_STEP_TIMEOUT_MS,
        };
        let retry = match checker.optional_uint(node, "retry") {
            Some(r) => u32::try_from(r).unwrap_or_else(|_| {
                checker.error(node.path_of("retry"), "retry count is too large");
                DEFAULT_STEP_RETRY
            }),
            None => DEFAULT_STEP_RETRY,
        };

        if let (Some(id), Some(persona), Some(actions)) = (id, persona, actions) {
            steps.push(Step {
                id,
                description,
                persona,
                actions,
                timeout,
                retry,
            });
        }
    }
    steps
}

fn validate_metadata(checker: &mut Checker, node: Node<'_>) -> Option<TestMetadata> {
    checker.unknown_fields(node, METADATA_FIELDS, "test metadata");
    let tags = checker.string_list(node, "tags");
    let priority = checker
        .optional_keyword::<Priority>(node, "priority")
        .unwrap_or_default();
    let estimated_duration = checker.optional_uint(node, "estimated_duration");
    let author = checker.optional_str(node, "author");

    Some(TestMetadata {
        tags: tags?,
        priority,
        estimated_duration,
        author,
    })
}
