//! Generic workflow status: current status from `has_status` history and
//! the legal next statuses.

use bptest_records::{EntityData, RelationshipData};
use serde::Serialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const HAS_STATUS: &str = "has_status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    InProgress,
    OnHold,
    Completed,
    Closed,
    Cancelled,
}

impl WorkflowStatus {
    pub const INITIAL: WorkflowStatus = WorkflowStatus::Draft;

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "DRAFT" => Some(WorkflowStatus::Draft),
            "PENDING" => Some(WorkflowStatus::Pending),
            "APPROVED" => Some(WorkflowStatus::Approved),
            "REJECTED" => Some(WorkflowStatus::Rejected),
            "IN_PROGRESS" => Some(WorkflowStatus::InProgress),
            "ON_HOLD" => Some(WorkflowStatus::OnHold),
            "COMPLETED" => Some(WorkflowStatus::Completed),
            "CLOSED" => Some(WorkflowStatus::Closed),
            "CANCELLED" => Some(WorkflowStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "DRAFT",
            WorkflowStatus::Pending => "PENDING",
            WorkflowStatus::Approved => "APPROVED",
            WorkflowStatus::Rejected => "REJECTED",
            WorkflowStatus::InProgress => "IN_PROGRESS",
            WorkflowStatus::OnHold => "ON_HOLD",
            WorkflowStatus::Completed => "COMPLETED",
            WorkflowStatus::Closed => "CLOSED",
            WorkflowStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn next(&self) -> &'static [WorkflowStatus] {
        use WorkflowStatus::*;
        match self {
            Draft => &[Pending, Cancelled],
            Pending => &[Approved, Rejected, Cancelled],
            Approved => &[InProgress, Cancelled],
            InProgress => &[Completed, OnHold, Cancelled],
            OnHold => &[InProgress, Cancelled],
            Completed => &[Closed],
            Rejected => &[Draft],
            Closed | Cancelled => &[],
        }
    }
}

/// Legal next statuses for a status code; unknown codes have none.
pub fn valid_transitions(code: &str) -> Vec<&'static str> {
    WorkflowStatus::from_code(code)
        .map(|s| s.next().iter().map(WorkflowStatus::as_str).collect())
        .unwrap_or_default()
}

// ── Status history ───────────────────────────────────────────────────

/// One `has_status` edge resolved to a status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub relationship_id: String,
    pub status: String,
    /// Milliseconds since the Unix epoch, when the edge carries a timestamp.
    pub at: Option<i64>,
}

fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase().replace(' ', "_")
}

/// The code a status entity stands for, upper snake case whichever field
/// it comes from.
pub fn status_code(entity: &EntityData) -> String {
    let code = entity
        .entity_code
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .or_else(|| entity.metadata_field("status_code").and_then(Value::as_str))
        .unwrap_or(entity.entity_name.as_str());
    normalize_code(code)
}

fn timestamp_ms(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => match OffsetDateTime::parse(s.trim(), &Rfc3339) {
            Ok(t) => Some((t.unix_timestamp_nanos() / 1_000_000) as i64),
            Err(_) => {
                tracing::warn!(timestamp = %s, "status timestamp is not RFC 3339");
                None
            }
        },
        _ => None,
    }
}

/// Status edges leaving `record_id`, most recent first. Edges without a
/// timestamp sort after every timestamped one. Among edges with equal (or no)
/// timestamps the one recorded later counts as more recent.
pub fn status_history(
    record_id: &str,
    relationships: &[RelationshipData],
    status_entities: &[EntityData],
) -> Vec<StatusEntry> {
    let mut entries: Vec<StatusEntry> = relationships
        .iter()
        .filter(|r| r.relationship_type == HAS_STATUS && r.from_entity_id == record_id)
        .filter_map(|r| {
            let status = match status_entities.iter().find(|e| e.id == r.to_entity_id) {
                Some(entity) => status_code(entity),
                None => normalize_code(r.data_field("status")?.as_str()?),
            };
            Some(StatusEntry {
                relationship_id: r.id.clone(),
                status,
                at: r.data_field("timestamp").and_then(timestamp_ms),
            })
        })
        .collect();
    // Reversing first lets the stable descending sort put later-recorded
    // edges ahead on ties. Option orders None below Some, so untimed edges
    // land last.
    entries.reverse();
    entries.sort_by(|a, b| b.at.cmp(&a.at));
    entries
}

// ── Oracle ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowVerdict {
    pub valid: bool,
    pub entity_id: String,
    pub expected_status: String,
    pub current_status: String,
    pub valid_transitions: Vec<String>,
    pub history: Vec<StatusEntry>,
}

pub fn check_workflow_status(
    entity_id: &str,
    expected_status: &str,
    relationships: &[RelationshipData],
    status_entities: &[EntityData],
) -> WorkflowVerdict {
    let history = status_history(entity_id, relationships, status_entities);
    let current = history
        .first()
        .map(|e| e.status.clone())
        .unwrap_or_else(|| WorkflowStatus::INITIAL.as_str().to_string());
    let expected = expected_status.trim().to_uppercase();

    WorkflowVerdict {
        valid: current == expected,
        entity_id: entity_id.to_string(),
        valid_transitions: valid_transitions(&current)
            .into_iter()
            .map(str::to_string)
            .collect(),
        expected_status: expected,
        current_status: current,
        history,
    }
}
