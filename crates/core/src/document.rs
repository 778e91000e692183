//! Document entry points: text → validated, template-resolved test model.
//!
//! The main entry point ([`parse_document`]) surfaces a tagged
//! [`ParseError`]. The secondary entry points ([`validate_text`],
//! [`extract_metadata`]) absorb every failure into their return value.

use serde::Serialize;
use serde_json::Value;

use crate::context::{ParseOptions, RunContext};
use crate::error::{ParseError, SchemaViolation, ROOT_PATH};
use crate::model::{Action, BusinessProcessTest};
use crate::schema;
use crate::template::TemplateResolver;

/// A parsed test together with the context its templates were resolved in.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub test: BusinessProcessTest,
    /// Seed variables plus every parse-time `store_as` binding. Hand this to
    /// the runner so execution continues in the same context.
    pub context: RunContext,
}

/// Result of the validate-only entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Result of the metadata-extraction entry point. Every field is optional;
/// unreadable input yields the empty summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<u64>,
}

impl TestSummary {
    pub fn is_empty(&self) -> bool {
        *self == TestSummary::default()
    }
}

/// Deserialize YAML or JSON text into a generic tree. Blank text is `null`.
pub fn load_tree(text: &str) -> Result<Value, ParseError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str::<Value>(text).map_err(|e| ParseError::MalformedDocument {
        message: e.to_string(),
    })
}

pub fn parse_document(text: &str) -> Result<BusinessProcessTest, ParseError> {
    parse_document_with(text, &ParseOptions::default())
}

pub fn parse_document_with(
    text: &str,
    options: &ParseOptions,
) -> Result<BusinessProcessTest, ParseError> {
    parse_with_context(text, options).map(|parsed| parsed.test)
}

/// Deserialize, validate, then resolve setup → steps → cleanup in declared
/// order through one fresh [`RunContext`].
pub fn parse_with_context(
    text: &str,
    options: &ParseOptions,
) -> Result<ParsedDocument, ParseError> {
    let tree = load_tree(text)?;
    let test = schema::validate(&tree).map_err(|errors| {
        tracing::debug!(violations = errors.len(), "document rejected by schema");
        ParseError::SchemaInvalid { errors }
    })?;

    let mut context = RunContext::for_test(&test, options);
    let test = resolve_test(&test, &mut context);
    tracing::debug!(
        test = %test.id,
        actions = test.action_count(),
        bindings = context.vars().len(),
        "document parsed"
    );
    Ok(ParsedDocument { test, context })
}

/// Resolve every action of `test` in document order, binding `store_as`
/// names into `context` as it goes so later actions can refer to them.
pub fn resolve_test(test: &BusinessProcessTest, context: &mut RunContext) -> BusinessProcessTest {
    let mut resolved = test.clone();
    resolved.setup = resolve_actions(&test.setup, context);
    for step in &mut resolved.steps {
        step.actions = resolve_actions(&step.actions, context);
    }
    resolved.cleanup = resolve_actions(&test.cleanup, context);
    resolved
}

fn resolve_actions(actions: &[Action], context: &mut RunContext) -> Vec<Action> {
    let mut out = Vec::with_capacity(actions.len());
    for action in actions {
        let action = action.resolved(&TemplateResolver::new(context));
        if let Some(name) = action.store_as() {
            context.store(name, action.binding());
        }
        out.push(action);
    }
    out
}

/// Validate without building the resolved model.
pub fn validate_text(text: &str) -> ValidationOutcome {
    let result = load_tree(text).and_then(|tree| {
        schema::validate(&tree)
            .map(|_| ())
            .map_err(|errors| ParseError::SchemaInvalid { errors })
    });
    match result {
        Ok(()) => ValidationOutcome {
            valid: true,
            errors: Vec::new(),
        },
        Err(ParseError::MalformedDocument { message }) => ValidationOutcome {
            valid: false,
            errors: vec![SchemaViolation::new(ROOT_PATH, message).to_string()],
        },
        Err(err) => ValidationOutcome {
            valid: false,
            errors: err.messages(),
        },
    }
}

/// Pull the headline fields out of a document without validating it.
pub fn extract_metadata(text: &str) -> TestSummary {
    match load_tree(text) {
        Ok(Value::Object(doc)) => TestSummary {
            id: doc.get("id").and_then(Value::as_str).map(str::to_string),
            title: doc.get("title").and_then(Value::as_str).map(str::to_string),
            industry: doc
                .get("context")
                .and_then(|c| c.get("industry"))
                .and_then(Value::as_str)
                .map(str::to_string),
            step_count: doc.get("steps").and_then(Value::as_array).map(Vec::len),
            persona_count: doc.get("personas").and_then(Value::as_object).map(|p| p.len()),
            estimated_duration: doc
                .get("metadata")
                .and_then(|m| m.get("estimated_duration"))
                .and_then(Value::as_u64),
        },
        Ok(_) => TestSummary::default(),
        Err(err) => {
            tracing::debug!(error = %err, "metadata extraction on unreadable document");
            TestSummary::default()
        }
    }
}
