//! Industry order workflows: the stage an order is in and where it may go.

use std::fmt;
use std::str::FromStr;

use bptest_records::{EntityData, RelationshipData, TransactionData};
use serde::Serialize;

use crate::workflow::status_history;

type StageTable = &'static [(&'static str, &'static [&'static str])];

const RESTAURANT: StageTable = &[
    ("ORDERED", &["IN_KITCHEN", "CANCELLED"]),
    ("IN_KITCHEN", &["COOKING", "CANCELLED"]),
    ("COOKING", &["READY_TO_SERVE"]),
    ("READY_TO_SERVE", &["SERVED"]),
    ("SERVED", &["BILLED"]),
    ("BILLED", &["PAID"]),
    ("PAID", &["COMPLETED"]),
    ("COMPLETED", &[]),
    ("CANCELLED", &[]),
];

const SALON: StageTable = &[
    ("BOOKED", &["CONFIRMED", "CANCELLED"]),
    ("CONFIRMED", &["CHECKED_IN", "CANCELLED", "NO_SHOW"]),
    ("CHECKED_IN", &["IN_SERVICE"]),
    ("IN_SERVICE", &["COMPLETED"]),
    ("COMPLETED", &["PAID"]),
    ("PAID", &[]),
    ("CANCELLED", &[]),
    ("NO_SHOW", &[]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainWorkflow {
    Restaurant,
    Salon,
}

impl DomainWorkflow {
    pub const ALL: [DomainWorkflow; 2] = [DomainWorkflow::Restaurant, DomainWorkflow::Salon];

    pub fn as_str(&self) -> &'static str {
        match self {
            DomainWorkflow::Restaurant => "restaurant",
            DomainWorkflow::Salon => "salon",
        }
    }

    fn table(&self) -> StageTable {
        match self {
            DomainWorkflow::Restaurant => RESTAURANT,
            DomainWorkflow::Salon => SALON,
        }
    }

    /// Stage of an order with no recorded history.
    pub fn initial_stage(&self) -> &'static str {
        self.table()[0].0
    }

    /// Legal next stages, or `None` for a stage the workflow does not know.
    pub fn next_stages(&self, stage: &str) -> Option<&'static [&'static str]> {
        self.table()
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, next)| *next)
    }
}

impl fmt::Display for DomainWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainWorkflow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DomainWorkflow::ALL
            .iter()
            .copied()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| format!("unknown workflow '{}'; expected restaurant or salon", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTransition {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainWorkflowVerdict {
    pub valid: bool,
    pub workflow: DomainWorkflow,
    pub transaction_id: String,
    pub current_stage: String,
    pub valid_next_stages: Vec<String>,
    /// Stages oldest first.
    pub history: Vec<String>,
    /// Consecutive history entries the stage table does not allow.
    pub illegal_transitions: Vec<StageTransition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub fn check_domain_workflow(
    workflow: DomainWorkflow,
    order: &TransactionData,
    relationships: &[RelationshipData],
    status_entities: &[EntityData],
) -> DomainWorkflowVerdict {
    let mut history: Vec<String> = status_history(&order.id, relationships, status_entities)
        .into_iter()
        .map(|e| e.status)
        .collect();
    // Oldest first, so the current stage is the same entry the workflow
    // status oracle reports, ties included.
    history.reverse();

    let current = history
        .last()
        .cloned()
        .unwrap_or_else(|| workflow.initial_stage().to_string());

    let illegal: Vec<StageTransition> = history
        .windows(2)
        .filter(|pair| {
            !workflow
                .next_stages(&pair[0])
                .is_some_and(|next| next.contains(&pair[1].as_str()))
        })
        .map(|pair| StageTransition {
            from: pair[0].clone(),
            to: pair[1].clone(),
        })
        .collect();

    let next = workflow.next_stages(&current);
    let reason = match (next, illegal.first()) {
        (None, _) => Some(format!("'{}' is not a {} stage", current, workflow)),
        (Some(_), Some(t)) => Some(format!("illegal transition {} -> {}", t.from, t.to)),
        (Some(_), None) => None,
    };

    DomainWorkflowVerdict {
        valid: reason.is_none(),
        workflow,
        transaction_id: order.id.clone(),
        valid_next_stages: next
            .unwrap_or_default()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        current_stage: current,
        history,
        illegal_transitions: illegal,
        reason,
    }
}
