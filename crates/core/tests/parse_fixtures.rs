//! End-to-end parsing of the shared fixture documents.

use std::path::Path;

use bptest_core::model::{Action, AssertionGroup, Industry};
use bptest_core::{
    extract_metadata, parse_document, parse_with_context, validate_text, ParseError, ParseOptions,
};
use serde_json::json;
use time::macros::datetime;

fn fixture(rel: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(rel);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
}

fn nine_am() -> ParseOptions {
    ParseOptions::at(datetime!(2025-01-01 09:00 UTC))
}

#[test]
fn salon_document_resolves_everything_known_at_parse_time() {
    let parsed = parse_with_context(&fixture("tests/salon_appointment.yaml"), &nine_am()).unwrap();
    let test = &parsed.test;

    assert_eq!(test.version, "1.2.0");
    assert_eq!(test.context.industry, Industry::Salon);
    assert_eq!(test.context.currency, "GBP");
    assert_eq!(test.action_count(), 12);
    assert_eq!(test.steps[1].timeout, 10_000);
    assert_eq!(test.steps[1].retry, 2);
    assert_eq!(test.steps[0].timeout, 30_000);

    match &test.setup[0] {
        Action::CreateEntity(e) => {
            assert_eq!(e.entity_name, "Client 1735722000000");
            assert_eq!(e.entity_code.as_deref(), Some("CUST-1735722000000"));
        }
        other => panic!("unexpected {:?}", other),
    }

    let book = &test.steps[0].actions;
    match &book[1] {
        Action::UiInteraction(ui) => assert_eq!(ui.value, Some(json!("Client 1735722000000"))),
        other => panic!("unexpected {:?}", other),
    }
    match &book[2] {
        Action::CreateTransaction(t) => {
            assert_eq!(t.reference_entity_id.as_deref(), Some("{{customer.id}}"));
            let meta = t.metadata.as_ref().unwrap();
            assert_eq!(meta["starts_at"], json!("2025-01-01T10:00:00.000Z"));
            assert_eq!(meta["service"], json!("Cut and finish"));
        }
        other => panic!("unexpected {:?}", other),
    }
    match &book[3] {
        Action::CreateRelationship(r) => {
            assert_eq!(r.from_entity_id, "{{appointment.id}}");
            assert_eq!(
                r.relationship_data.as_ref().unwrap()["timestamp"],
                json!("2025-01-01T09:00:00.000Z")
            );
        }
        other => panic!("unexpected {:?}", other),
    }

    match &test.steps[1].actions[1] {
        Action::ApiCall(call) => {
            assert_eq!(call.endpoint, "/api/appointments/{{appointment.id}}/check-in");
            assert_eq!(call.headers.as_ref().unwrap()["X-Organization"], "org-salon-001");
            assert_eq!(call.body, Some(json!({ "at": "2025-01-01T09:30:00.000Z" })));
        }
        other => panic!("unexpected {:?}", other),
    }

    match &test.cleanup[0] {
        Action::ApiCall(call) => assert_eq!(call.endpoint, "/api/test-data/org-salon-001"),
        other => panic!("unexpected {:?}", other),
    }

    for name in ["customer", "service", "appointment", "check_in", "sale"] {
        assert!(parsed.context.contains(name), "missing binding {}", name);
    }
    assert_eq!(parsed.context.timestamp_ms(), 1_735_722_000_000);
}

#[test]
fn business_assertions_keep_their_params_for_the_checker() {
    let test = parse_document(&fixture("tests/salon_appointment.yaml")).unwrap();
    let checks: Vec<_> = test.business_checks().collect();
    assert_eq!(checks.len(), 5);
    assert_eq!(checks[2].params["organization_id"], json!("{{test_org_id}}"));
    assert!(!checks[4].expected);

    let groups: Vec<&str> = test
        .assertions
        .iter()
        .map(|g| match g {
            AssertionGroup::Ui(_) => "ui",
            AssertionGroup::Database(_) => "database",
            AssertionGroup::Business(_) => "business",
        })
        .collect();
    assert_eq!(groups, vec!["ui", "database", "business"]);
}

#[test]
fn json_documents_parse_like_yaml() {
    let test = parse_document(&fixture("tests/gl_month_end.json")).unwrap();
    assert_eq!(test.context.industry, Industry::Generic);
    assert_eq!(test.context.currency, "USD");
    match &test.steps[0].actions[0] {
        Action::CreateTransaction(t) => {
            let lines = t.line_items.as_ref().unwrap();
            assert_eq!(lines.len(), 3);
            assert_eq!(lines[0].line_entity_id.as_deref(), Some("{{cash.id}}"));
            assert_eq!(t.transaction_code.as_deref().map(|c| c.starts_with("JE-")), Some(true));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn every_violation_in_a_broken_document_is_reported() {
    let outcome = validate_text(&fixture("invalid/many_violations.yaml"));
    assert!(!outcome.valid);
    let wanted = [
        "id: must not contain whitespace",
        "title: missing required field",
        "context.industry: invalid value 'spa'",
        "steps[0].persona: persona 'manager' is not declared in personas",
        "steps[0].actions[0].action_type: unknown action variant 'teleport'",
        "steps[0].actions[1].value: required when interaction is 'fill'",
        "steps[0].actions[2].entity_type: field 'entity_type' is not allowed for action_type 'wait'",
        "steps[0].actions[2]: wait requires exactly one of 'duration' or 'selector'",
        "assertions[0].assertions[0].oracle: invalid value 'ledger_balance'",
    ];
    for want in wanted {
        assert!(
            outcome.errors.iter().any(|e| e.starts_with(want)),
            "no violation starting with '{}' in {:#?}",
            want,
            outcome.errors
        );
    }
    // The unknown variant's own fields are not judged.
    assert!(!outcome.errors.iter().any(|e| e.contains("destination")));
}

#[test]
fn unreadable_documents() {
    let err = parse_document(&fixture("invalid/malformed.yaml")).unwrap_err();
    assert!(matches!(err, ParseError::MalformedDocument { .. }));
    assert!(extract_metadata(&fixture("invalid/malformed.yaml")).is_empty());

    let err = parse_document(&fixture("invalid/not_a_mapping.yaml")).unwrap_err();
    assert_eq!(err.messages(), vec!["$: document must be an object, found array"]);
    assert!(extract_metadata(&fixture("invalid/not_a_mapping.yaml")).is_empty());
}

#[test]
fn metadata_of_fixtures() {
    let summary = extract_metadata(&fixture("tests/salon_appointment.yaml"));
    assert_eq!(
        serde_json::to_value(&summary).unwrap(),
        json!({
            "id": "salon-appointment-to-payment",
            "title": "Book, check in and pay for a salon appointment",
            "industry": "salon",
            "stepCount": 3,
            "personaCount": 2,
            "estimatedDuration": 180
        })
    );

    // Lenient: a document the validator rejects still yields what it can.
    let summary = extract_metadata(&fixture("invalid/many_violations.yaml"));
    assert_eq!(summary.id.as_deref(), Some("broken booking"));
    assert_eq!(summary.industry.as_deref(), Some("spa"));
    assert_eq!(summary.title, None);
}
