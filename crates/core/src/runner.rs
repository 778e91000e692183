//! Boundary to the external runner that performs actions against a live
//! system.
//!
//! [`execute_plan`] owns the ordering: setup, each step under its persona,
//! then cleanup. Right before an action runs it is resolved again against
//! the current context, so identifiers stored by earlier actions are filled
//! in. What "executing" means is entirely up to the [`ActionExecutor`].

use std::fmt;

use serde_json::Value;

use crate::context::RunContext;
use crate::model::{Action, ActionType, BusinessProcessTest, Keyword, Persona};
use crate::template::TemplateResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Step,
    Cleanup,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Setup => write!(f, "setup"),
            Phase::Step => write!(f, "step"),
            Phase::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// Position of an action in the document, rendered in violation-path form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLocation {
    pub phase: Phase,
    pub step_index: Option<usize>,
    pub index: usize,
}

impl fmt::Display for ActionLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.phase, self.step_index) {
            (Phase::Step, Some(step)) => write!(f, "steps[{}].actions[{}]", step, self.index),
            (phase, _) => write!(f, "{}[{}]", phase, self.index),
        }
    }
}

/// What the executor knows about the action it is asked to run.
#[derive(Debug, Clone)]
pub struct ActionScope<'a> {
    pub location: ActionLocation,
    pub step_id: Option<&'a str>,
    pub persona_name: Option<&'a str>,
    pub persona: Option<&'a Persona>,
    /// Step timeout in ms; setup and cleanup have none.
    pub timeout_ms: Option<u64>,
    pub retry: u32,
}

impl ActionScope<'_> {
    pub fn phase(&self) -> Phase {
        self.location.phase
    }
}

/// Performs one resolved action. A returned value is stored under the
/// action's `store_as` name.
pub trait ActionExecutor {
    fn execute(
        &mut self,
        scope: &ActionScope<'_>,
        action: &Action,
    ) -> Result<Option<Value>, String>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    #[error("{location} ({action_type}) failed: {message}")]
    ActionFailed {
        location: ActionLocation,
        action_type: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedAction {
    pub location: ActionLocation,
    pub step_id: Option<String>,
    pub action_type: ActionType,
    pub stored_as: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub executed: Vec<ExecutedAction>,
}

/// Run every action of `test` through `executor`, stopping at the first failure.
pub fn execute_plan<E: ActionExecutor + ?Sized>(
    test: &BusinessProcessTest,
    context: &mut RunContext,
    executor: &mut E,
) -> Result<ExecutionReport, ExecutionError> {
    let mut report = ExecutionReport::default();

    for (i, action) in test.setup.iter().enumerate() {
        let scope = ActionScope {
            location: ActionLocation { phase: Phase::Setup, step_index: None, index: i },
            step_id: None,
            persona_name: None,
            persona: None,
            timeout_ms: None,
            retry: 0,
        };
        run_one(&scope, action, context, executor, &mut report)?;
    }

    for (s, step) in test.steps.iter().enumerate() {
        tracing::debug!(step = %step.id, persona = %step.persona, "executing step");
        for (i, action) in step.actions.iter().enumerate() {
            let scope = ActionScope {
                location: ActionLocation { phase: Phase::Step, step_index: Some(s), index: i },
                step_id: Some(&step.id),
                persona_name: Some(&step.persona),
                persona: test.personas.get(&step.persona),
                timeout_ms: Some(step.timeout),
                retry: step.retry,
            };
            run_one(&scope, action, context, executor, &mut report)?;
        }
    }

    for (i, action) in test.cleanup.iter().enumerate() {
        let scope = ActionScope {
            location: ActionLocation { phase: Phase::Cleanup, step_index: None, index: i },
            step_id: None,
            persona_name: None,
            persona: None,
            timeout_ms: None,
            retry: 0,
        };
        run_one(&scope, action, context, executor, &mut report)?;
    }

    Ok(report)
}

fn run_one<E: ActionExecutor + ?Sized>(
    scope: &ActionScope<'_>,
    action: &Action,
    context: &mut RunContext,
    executor: &mut E,
    report: &mut ExecutionReport,
) -> Result<(), ExecutionError> {
    let action = action.resolved(&TemplateResolver::new(context));
    let action_type = action.action_type();

    let output = executor.execute(scope, &action).map_err(|message| {
        tracing::debug!(at = %scope.location, %message, "action failed");
        ExecutionError::ActionFailed {
            location: scope.location.clone(),
            action_type: action_type.as_str(),
            message,
        }
    })?;

    let stored_as = match (action.store_as(), output) {
        (Some(name), Some(value)) => {
            context.store(name, value);
            Some(name.to_string())
        }
        _ => None,
    };

    report.executed.push(ExecutedAction {
        location: scope.location.clone(),
        step_id: scope.step_id.map(str::to_string),
        action_type,
        stored_as,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ParseOptions;
    use crate::document::parse_with_context;
    use serde_json::json;

    const DOC: &str = r#"
id: restaurant-order
title: Take an order
context: { organization_id: org-r, industry: restaurant, clock: "2025-01-01T18:00:00Z" }
personas:
  waiter: { role: waiter }
setup:
  - { action_type: create_entity, entity_type: customer, entity_name: Table 4, smart_code: HERA.REST.CRM.ENT.CUST.v1, store_as: guest }
steps:
  - id: order
    persona: waiter
    timeout: 5000
    retry: 2
    actions:
      - action_type: create_transaction
        transaction_type: sale
        smart_code: HERA.REST.POS.TXN.SALE.v1
        reference_entity_id: "{{guest.id}}"
        metadata: { label: "{{guest.entity_name}}" }
        store_as: order
      - { action_type: wait, duration: 10 }
cleanup:
  - { action_type: api_call, method: DELETE, endpoint: "/transactions/{{order.id}}" }
"#;

    /// Hands out sequential ids for create actions and records what it saw.
    #[derive(Default)]
    struct FakeRunner {
        seen: Vec<(String, Option<String>, Option<u64>, u32, Action)>,
        fail_on: Option<ActionType>,
        next_id: usize,
    }

    impl ActionExecutor for FakeRunner {
        fn execute(&mut self, scope: &ActionScope<'_>, action: &Action) -> Result<Option<Value>, String> {
            self.seen.push((
                scope.location.to_string(),
                scope.persona.map(|p| p.role.clone()),
                scope.timeout_ms,
                scope.retry,
                action.clone(),
            ));
            if self.fail_on == Some(action.action_type()) {
                return Err("backend unavailable".to_string());
            }
            match action {
                Action::CreateEntity(_) | Action::CreateTransaction(_) => {
                    self.next_id += 1;
                    Ok(Some(json!({ "id": format!("id-{}", self.next_id) })))
                }
                _ => Ok(None),
            }
        }
    }

    fn parsed() -> (BusinessProcessTest, RunContext) {
        let p = parse_with_context(DOC, &ParseOptions::default()).unwrap();
        (p.test, p.context)
    }

    #[test]
    fn runtime_ids_flow_into_later_actions() {
        let (test, mut ctx) = parsed();
        let mut runner = FakeRunner::default();
        let report = execute_plan(&test, &mut ctx, &mut runner).unwrap();

        assert_eq!(report.executed.len(), 4);
        assert_eq!(report.executed[0].stored_as.as_deref(), Some("guest"));
        assert_eq!(report.executed[1].step_id.as_deref(), Some("order"));

        match &runner.seen[1].4 {
            Action::CreateTransaction(t) => {
                assert_eq!(t.reference_entity_id.as_deref(), Some("id-1"));
                assert_eq!(t.metadata.as_ref().unwrap()["label"], json!("Table 4"));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &runner.seen[3].4 {
            Action::ApiCall(c) => assert_eq!(c.endpoint, "/transactions/id-2"),
            other => panic!("unexpected {:?}", other),
        }
        // Parse-time binding and runtime result are merged.
        assert_eq!(ctx.lookup_path("guest.entity_name"), Some(&json!("Table 4")));
        assert_eq!(ctx.lookup_path("guest.id"), Some(&json!("id-1")));
    }

    #[test]
    fn scope_carries_step_settings() {
        let (test, mut ctx) = parsed();
        let mut runner = FakeRunner::default();
        execute_plan(&test, &mut ctx, &mut runner).unwrap();

        let locations: Vec<&str> = runner.seen.iter().map(|s| s.0.as_str()).collect();
        assert_eq!(
            locations,
            vec!["setup[0]", "steps[0].actions[0]", "steps[0].actions[1]", "cleanup[0]"]
        );
        assert_eq!(runner.seen[0].1, None);
        assert_eq!(runner.seen[1].1.as_deref(), Some("waiter"));
        assert_eq!((runner.seen[1].2, runner.seen[1].3), (Some(5000), 2));
        assert_eq!((runner.seen[3].2, runner.seen[3].3), (None, 0));
    }

    #[test]
    fn first_failure_stops_the_run() {
        let (test, mut ctx) = parsed();
        let mut runner = FakeRunner {
            fail_on: Some(ActionType::Wait),
            ..FakeRunner::default()
        };
        let err = execute_plan(&test, &mut ctx, &mut runner).unwrap_err();
        assert_eq!(
            err.to_string(),
            "steps[0].actions[1] (wait) failed: backend unavailable"
        );
        assert_eq!(runner.seen.len(), 3);
    }
}
