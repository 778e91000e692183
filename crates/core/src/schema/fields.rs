//! Field accessors that record a violation instead of failing.
//!
//! Each accessor returns `Some(value)` when the field is well-formed and
//! `None` otherwise; when it returns `None` for a present-but-wrong or
//! missing-but-required field, it has already pushed a violation.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{SchemaViolation, ROOT_PATH};
use crate::model::{JsonMap, Keyword};

pub(crate) fn child_path(parent: &str, key: &str) -> String {
    if parent == ROOT_PATH {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

pub(crate) fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// An object under validation together with its path.
#[derive(Clone, Copy)]
pub(crate) struct Node<'a> {
    pub path: &'a str,
    pub map: &'a JsonMap,
}

impl<'a> Node<'a> {
    pub fn new(path: &'a str, map: &'a JsonMap) -> Self {
        Node { path, map }
    }

    /// A present, non-null field.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    pub fn path_of(&self, key: &str) -> String {
        child_path(self.path, key)
    }
}

/// Accumulates violations across a whole document.
#[derive(Debug, Default)]
pub(crate) struct Checker {
    violations: Vec<SchemaViolation>,
}

impl Checker {
    pub fn new() -> Self {
        Checker::default()
    }

    pub fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(SchemaViolation::new(path, message));
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn into_violations(self) -> Vec<SchemaViolation> {
        self.violations
    }

    fn wrong_type(&mut self, node: Node<'_>, key: &str, expected: &str, found: &Value) {
        self.error(
            node.path_of(key),
            format!("expected {}, found {}", expected, json_type(found)),
        );
    }

    fn missing(&mut self, node: Node<'_>, key: &str) {
        self.error(node.path_of(key), "missing required field");
    }

    /// Report every key not in `allowed`.
    pub fn unknown_fields(&mut self, node: Node<'_>, allowed: &[&str], owner: &str) {
        for key in node.map.keys() {
            if !allowed.contains(&key.as_str()) {
                self.error(
                    node.path_of(key),
                    format!("field '{}' is not allowed for {}", key, owner),
                );
            }
        }
    }

    // ── strings ───────────────────────────────────────────────────

    pub fn optional_str(&mut self, node: Node<'_>, key: &str) -> Option<String> {
        let value = node.get(key)?;
        match value.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                self.wrong_type(node, key, "string", value);
                None
            }
        }
    }

    /// A present, non-empty string.
    pub fn required_str(&mut self, node: Node<'_>, key: &str) -> Option<String> {
        if node.get(key).is_none() {
            self.missing(node, key);
            return None;
        }
        let s = self.optional_str(node, key)?;
        if s.trim().is_empty() {
            self.error(node.path_of(key), "must not be empty");
            return None;
        }
        Some(s)
    }

    pub fn string_list(&mut self, node: Node<'_>, key: &str) -> Option<Vec<String>> {
        let Some(value) = node.get(key) else {
            return Some(Vec::new());
        };
        let Some(items) = value.as_array() else {
            self.wrong_type(node, key, "array of strings", value);
            return None;
        };
        let path = node.path_of(key);
        let mut out = Vec::with_capacity(items.len());
        let mut ok = true;
        for (i, item) in items.iter().enumerate() {
            match item.as_str() {
                Some(s) => out.push(s.to_string()),
                None => {
                    self.error(
                        index_path(&path, i),
                        format!("expected string, found {}", json_type(item)),
                    );
                    ok = false;
                }
            }
        }
        ok.then_some(out)
    }

    pub fn string_map(&mut self, node: Node<'_>, key: &str) -> Option<BTreeMap<String, String>> {
        let map = self.optional_object(node, key)?;
        let path = node.path_of(key);
        let mut out = BTreeMap::new();
        let mut ok = true;
        for (k, v) in map {
            match v.as_str() {
                Some(s) => {
                    out.insert(k.clone(), s.to_string());
                }
                None => {
                    self.error(
                        child_path(&path, k),
                        format!("expected string, found {}", json_type(v)),
                    );
                    ok = false;
                }
            }
        }
        ok.then_some(out)
    }

    // ── numbers and booleans ──────────────────────────────────────

    pub fn optional_number(&mut self, node: Node<'_>, key: &str) -> Option<f64> {
        let value = node.get(key)?;
        match value.as_f64() {
            Some(n) => Some(n),
            None => {
                self.wrong_type(node, key, "number", value);
                None
            }
        }
    }

    pub fn required_number(&mut self, node: Node<'_>, key: &str) -> Option<f64> {
        if node.get(key).is_none() {
            self.missing(node, key);
            return None;
        }
        self.optional_number(node, key)
    }

    /// A non-negative integer.
    pub fn optional_uint(&mut self, node: Node<'_>, key: &str) -> Option<u64> {
        let value = node.get(key)?;
        match value.as_u64() {
            Some(n) => Some(n),
            None => {
                self.wrong_type(node, key, "non-negative integer", value);
                None
            }
        }
    }

    pub fn required_uint(&mut self, node: Node<'_>, key: &str) -> Option<u64> {
        if node.get(key).is_none() {
            self.missing(node, key);
            return None;
        }
        self.optional_uint(node, key)
    }

    pub fn optional_bool(&mut self, node: Node<'_>, key: &str) -> Option<bool> {
        let value = node.get(key)?;
        match value.as_bool() {
            Some(b) => Some(b),
            None => {
                self.wrong_type(node, key, "boolean", value);
                None
            }
        }
    }

    // ── containers ────────────────────────────────────────────────

    pub fn optional_object<'a>(&mut self, node: Node<'a>, key: &str) -> Option<&'a JsonMap> {
        let value = node.get(key)?;
        match value.as_object() {
            Some(map) => Some(map),
            None => {
                self.wrong_type(node, key, "object", value);
                None
            }
        }
    }

    pub fn required_object<'a>(&mut self, node: Node<'a>, key: &str) -> Option<&'a JsonMap> {
        if node.get(key).is_none() {
            self.missing(node, key);
            return None;
        }
        self.optional_object(node, key)
    }

    pub fn optional_array<'a>(&mut self, node: Node<'a>, key: &str) -> Option<&'a Vec<Value>> {
        let value = node.get(key)?;
        match value.as_array() {
            Some(items) => Some(items),
            None => {
                self.wrong_type(node, key, "array", value);
                None
            }
        }
    }

    /// A present, non-empty array.
    pub fn required_array<'a>(&mut self, node: Node<'a>, key: &str) -> Option<&'a Vec<Value>> {
        if node.get(key).is_none() {
            self.missing(node, key);
            return None;
        }
        let items = self.optional_array(node, key)?;
        if items.is_empty() {
            self.error(node.path_of(key), "must contain at least one entry");
            return None;
        }
        Some(items)
    }

    /// The element at `path` as an object.
    pub fn element<'a>(&mut self, path: &str, value: &'a Value) -> Option<&'a JsonMap> {
        match value.as_object() {
            Some(map) => Some(map),
            None => {
                self.error(path, format!("expected object, found {}", json_type(value)));
                None
            }
        }
    }

    // ── enumerations ──────────────────────────────────────────────

    pub fn optional_keyword<K: Keyword>(&mut self, node: Node<'_>, key: &str) -> Option<K> {
        let value = node.get(key)?;
        let Some(s) = value.as_str() else {
            self.wrong_type(node, key, "string", value);
            return None;
        };
        match K::from_keyword(s) {
            Some(k) => Some(k),
            None => {
                self.error(
                    node.path_of(key),
                    format!("invalid value '{}'; expected one of {}", s, K::expected()),
                );
                None
            }
        }
    }

    pub fn required_keyword<K: Keyword>(&mut self, node: Node<'_>, key: &str) -> Option<K> {
        if node.get(key).is_none() {
            self.missing(node, key);
            return None;
        }
        self.optional_keyword(node, key)
    }
}
