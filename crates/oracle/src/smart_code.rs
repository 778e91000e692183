//! Smart-code conformance: `HERA.<INDUSTRY>.<MODULE>.<FUNCTION>.<TYPE>.v<N>`.
//!
//! Each code is checked against the pattern and, for records whose type has
//! a known abbreviation, for a matching segment (a `customer` entity must
//! carry `CUST`, a `sale` transaction `SALE`, and so on).

use std::sync::LazyLock;

use bptest_records::{EntityData, RelationshipData, TransactionData};
use regex::Regex;
use serde::Serialize;

static SMART_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^HERA\.[A-Z0-9_]+\.[A-Z0-9_]+\.[A-Z0-9_]+\.[A-Z0-9_]+\.v[0-9]+$")
        .expect("smart code pattern")
});

pub const SMART_CODE_FORMAT: &str = "HERA.<INDUSTRY>.<MODULE>.<FUNCTION>.<TYPE>.v<N>";

const ENTITY_SEGMENTS: &[(&str, &str)] = &[
    ("customer", "CUST"),
    ("vendor", "VEND"),
    ("product", "PROD"),
    ("employee", "EMP"),
    ("gl_account", "GL"),
    ("service", "SVC"),
];

const TRANSACTION_SEGMENTS: &[(&str, &str)] = &[
    ("sale", "SALE"),
    ("purchase", "PURCH"),
    ("payment", "PAY"),
    ("journal_entry", "JE"),
    ("appointment", "APPT"),
];

const RELATIONSHIP_SEGMENTS: &[(&str, &str)] = &[("has_status", "STATUS")];

/// Dot-separated segments of a smart code.
pub fn segments(code: &str) -> impl Iterator<Item = &str> {
    code.split('.')
}

/// True if one of `code`'s segments equals `segment` exactly.
pub fn has_segment(code: &str, segment: &str) -> bool {
    segments(code).any(|s| s == segment)
}

/// Every problem with the shape of `code`; empty when it conforms.
pub fn validate_smart_code(code: &str) -> Vec<String> {
    let mut issues = Vec::new();
    let parts: Vec<&str> = segments(code).collect();

    if !SMART_CODE.is_match(code) {
        issues.push(format!("'{}' does not match {}", code, SMART_CODE_FORMAT));
        if parts.first() != Some(&"HERA") {
            issues.push("must start with the HERA namespace".to_string());
        }
        if parts.len() != 6 {
            issues.push(format!("expected 6 dot-separated segments, found {}", parts.len()));
        }
        let body_end = parts.len().saturating_sub(1);
        for segment in parts.iter().take(body_end).skip(1) {
            if segment.chars().any(|c| c.is_ascii_lowercase()) {
                issues.push(format!("segment '{}' must be uppercase", segment));
            }
        }
    }

    match parts.last().and_then(|last| last.strip_prefix('v')) {
        Some(digits) => match digits.parse::<u64>() {
            Ok(0) => issues.push("version must be at least v1".to_string()),
            Ok(_) => {}
            Err(_) => issues.push(format!("version 'v{}' is not an integer", digits)),
        },
        None => issues.push("missing version suffix v<N>".to_string()),
    }
    issues
}

/// Which record family a violation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Entity,
    Transaction,
    Relationship,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmartCodeViolation {
    pub record_type: RecordKind,
    pub id: String,
    pub smart_code: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmartCodeVerdict {
    pub valid: bool,
    pub checked: usize,
    pub violations: Vec<SmartCodeViolation>,
}

fn expected_segment(table: &[(&str, &'static str)], record_type: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(t, _)| *t == record_type)
        .map(|(_, segment)| *segment)
}

fn check_record(
    out: &mut Vec<SmartCodeViolation>,
    kind: RecordKind,
    id: &str,
    record_type: &str,
    code: &str,
    table: &[(&str, &'static str)],
) {
    let mut reasons = validate_smart_code(code);
    if let Some(segment) = expected_segment(table, record_type) {
        if !has_segment(code, segment) {
            reasons.push(format!(
                "{} type '{}' requires segment '{}'",
                kind.label(),
                record_type,
                segment
            ));
        }
    }
    out.extend(reasons.into_iter().map(|reason| SmartCodeViolation {
        record_type: kind,
        id: id.to_string(),
        smart_code: code.to_string(),
        reason,
    }));
}

impl RecordKind {
    fn label(&self) -> &'static str {
        match self {
            RecordKind::Entity => "entity",
            RecordKind::Transaction => "transaction",
            RecordKind::Relationship => "relationship",
        }
    }
}

/// Validate every record's smart code, collecting all violations.
pub fn check_smart_codes(
    entities: &[EntityData],
    transactions: &[TransactionData],
    relationships: &[RelationshipData],
) -> SmartCodeVerdict {
    let mut violations = Vec::new();
    for e in entities {
        check_record(
            &mut violations,
            RecordKind::Entity,
            &e.id,
            &e.entity_type,
            &e.smart_code,
            ENTITY_SEGMENTS,
        );
    }
    for t in transactions {
        check_record(
            &mut violations,
            RecordKind::Transaction,
            &t.id,
            &t.transaction_type,
            &t.smart_code,
            TRANSACTION_SEGMENTS,
        );
    }
    for r in relationships {
        check_record(
            &mut violations,
            RecordKind::Relationship,
            &r.id,
            &r.relationship_type,
            &r.smart_code,
            RELATIONSHIP_SEGMENTS,
        );
    }
    SmartCodeVerdict {
        valid: violations.is_empty(),
        checked: entities.len() + transactions.len() + relationships.len(),
        violations,
    }
}
