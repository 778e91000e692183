//! `{{expression}}` substitution over strings and nested JSON values.
//!
//! Expressions are tried in order: exact context key, dot path, `clock+N`
//! (seconds), the literal `timestamp`. Anything else is left verbatim so a
//! later pass with a richer context can pick it up.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;
use time::{Duration, OffsetDateTime};

use crate::context::{format_instant, RunContext};
use crate::model::JsonMap;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("placeholder pattern"));

static RELATIVE_CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^clock\s*\+\s*(\d+)$").expect("relative clock pattern"));

/// Text form of a substituted value.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// True if `s` still contains at least one `{{...}}` placeholder.
pub fn has_placeholders(s: &str) -> bool {
    PLACEHOLDER.is_match(s)
}

/// Read-only view of a [`RunContext`] that expands placeholders.
#[derive(Debug, Clone, Copy)]
pub struct TemplateResolver<'a> {
    context: &'a RunContext,
}

impl<'a> TemplateResolver<'a> {
    pub fn new(context: &'a RunContext) -> Self {
        TemplateResolver { context }
    }

    /// Replace every placeholder in `s`; unresolved ones are kept as written.
    pub fn resolve_str(&self, s: &str) -> String {
        if !has_placeholders(s) {
            return s.to_string();
        }
        PLACEHOLDER
            .replace_all(s, |caps: &Captures<'_>| {
                self.resolve_expression(&caps[1])
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Resolve a single expression (the text between the braces).
    pub fn resolve_expression(&self, expression: &str) -> Option<String> {
        let expr = expression.trim();

        if let Some(value) = self.context.get(expr) {
            return Some(render_value(value));
        }

        if expr.contains('.') {
            if let Some(value) = self.context.lookup_path(expr) {
                return Some(render_value(value));
            }
        }

        if let Some(caps) = RELATIVE_CLOCK.captures(expr) {
            return self.relative_clock(&caps[1]);
        }

        if expr == "timestamp" {
            return Some(self.context.timestamp_ms().to_string());
        }

        None
    }

    fn relative_clock(&self, seconds: &str) -> Option<String> {
        let seconds: i64 = match seconds.parse() {
            Ok(n) => n,
            Err(_) => {
                tracing::warn!(seconds, "clock offset out of range");
                return None;
            }
        };
        let base = match self.context.get("clock") {
            None => OffsetDateTime::now_utc(),
            Some(_) => match self.context.clock() {
                Some(instant) => instant,
                None => {
                    tracing::warn!("context clock is not an RFC 3339 instant");
                    return None;
                }
            },
        };
        let shifted = base.checked_add(Duration::seconds(seconds))?;
        format_instant(shifted)
    }

    /// Rewrite the string leaves of `value`, preserving its shape.
    pub fn resolve_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.resolve_str(s)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.resolve_value(v)).collect())
            }
            Value::Object(map) => Value::Object(self.resolve_map(map)),
            other => other.clone(),
        }
    }

    pub fn resolve_map(&self, map: &JsonMap) -> JsonMap {
        map.iter()
            .map(|(k, v)| (k.clone(), self.resolve_value(v)))
            .collect()
    }

    pub fn resolve_opt(&self, s: &Option<String>) -> Option<String> {
        s.as_deref().map(|s| self.resolve_str(s))
    }
}
