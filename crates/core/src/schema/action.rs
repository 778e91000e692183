//! Action validation: the `action_type` discriminator and per-variant fields.

use std::collections::BTreeSet;

use serde_json::Value;

use super::fields::{index_path, is_identifier, json_type, Checker, Node};
use crate::model::*;

const COMMON_FIELDS: &[&str] = &["action_type", "store_as"];

/// Validate an action list found at `path`.
pub(crate) fn validate_actions(checker: &mut Checker, path: &str, items: &[Value]) -> Vec<Action> {
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| validate_action(checker, &index_path(path, i), item))
        .collect()
}

pub(crate) fn validate_action(checker: &mut Checker, path: &str, value: &Value) -> Option<Action> {
    let map = checker.element(path, value)?;
    let node = Node::new(path, map);

    // An unknown discriminator stops validation of this action: its other
    // fields cannot be judged against any variant.
    let action_type = match node.get("action_type") {
        None => {
            checker.error(node.path_of("action_type"), "missing required field");
            return None;
        }
        Some(Value::String(s)) => match ActionType::from_keyword(s) {
            Some(t) => t,
            None => {
                checker.error(
                    node.path_of("action_type"),
                    format!(
                        "unknown action variant '{}'; expected one of {}",
                        s,
                        ActionType::expected()
                    ),
                );
                return None;
            }
        },
        Some(other) => {
            checker.error(
                node.path_of("action_type"),
                format!("expected string, found {}", json_type(other)),
            );
            return None;
        }
    };

    let store_as = checker.optional_str(node, "store_as");
    if let Some(name) = &store_as {
        if !is_identifier(name) {
            checker.error(
                node.path_of("store_as"),
                format!("'{}' is not a valid variable name", name),
            );
        }
    }

    let allowed: Vec<&str> = COMMON_FIELDS
        .iter()
        .chain(variant_fields(action_type))
        .copied()
        .collect();
    checker.unknown_fields(
        node,
        &allowed,
        &format!("action_type '{}'", action_type.as_str()),
    );

    match action_type {
        ActionType::CreateEntity => {
            create_entity(checker, node, store_as).map(Action::CreateEntity)
        }
        ActionType::CreateTransaction => {
            create_transaction(checker, node, store_as).map(Action::CreateTransaction)
        }
        ActionType::CreateRelationship => {
            create_relationship(checker, node, store_as).map(Action::CreateRelationship)
        }
        ActionType::SetDynamicField => {
            set_dynamic_field(checker, node, store_as).map(Action::SetDynamicField)
        }
        ActionType::UiInteraction => {
            ui_interaction(checker, node, store_as).map(Action::UiInteraction)
        }
        ActionType::ApiCall => api_call(checker, node, store_as).map(Action::ApiCall),
        ActionType::Wait => wait(checker, node, store_as).map(Action::Wait),
    }
}

fn variant_fields(action_type: ActionType) -> &'static [&'static str] {
    match action_type {
        ActionType::CreateEntity => &[
            "entity_type",
            "entity_name",
            "entity_code",
            "smart_code",
            "dynamic_fields",
            "metadata",
        ],
        ActionType::CreateTransaction => &[
            "transaction_type",
            "transaction_code",
            "smart_code",
            "reference_entity_id",
            "total_amount",
            "line_items",
            "metadata",
        ],
        ActionType::CreateRelationship => &[
            "from_entity_id",
            "to_entity_id",
            "relationship_type",
            "smart_code",
            "relationship_data",
        ],
        ActionType::SetDynamicField => &[
            "entity_id",
            "field_name",
            "field_value",
            "field_type",
            "smart_code",
        ],
        ActionType::UiInteraction => &["interaction", "selector", "value", "url"],
        ActionType::ApiCall => &["method", "endpoint", "body", "headers", "expect_status"],
        ActionType::Wait => &["duration", "selector"],
    }
}

fn create_entity(
    checker: &mut Checker,
    node: Node<'_>,
    store_as: Option<String>,
) -> Option<CreateEntity> {
    let entity_type = checker.required_str(node, "entity_type");
    let entity_name = checker.required_str(node, "entity_name");
    let entity_code = checker.optional_str(node, "entity_code");
    let smart_code = checker.required_str(node, "smart_code");
    let dynamic_fields = checker.optional_object(node, "dynamic_fields").cloned();
    let metadata = checker.optional_object(node, "metadata").cloned();

    Some(CreateEntity {
        entity_type: entity_type?,
        entity_name: entity_name?,
        entity_code,
        smart_code: smart_code?,
        dynamic_fields,
        metadata,
        store_as,
    })
}

fn create_transaction(
    checker: &mut Checker,
    node: Node<'_>,
    store_as: Option<String>,
) -> Option<CreateTransaction> {
    let transaction_type = checker.required_str(node, "transaction_type");
    let transaction_code = checker.optional_str(node, "transaction_code");
    let smart_code = checker.required_str(node, "smart_code");
    let reference_entity_id = checker.optional_str(node, "reference_entity_id");
    let total_amount = checker.optional_number(node, "total_amount");
    let metadata = checker.optional_object(node, "metadata").cloned();
    let line_items = checker
        .optional_array(node, "line_items")
        .map(|items| line_items(checker, &node.path_of("line_items"), items));

    Some(CreateTransaction {
        transaction_type: transaction_type?,
        transaction_code,
        smart_code: smart_code?,
        reference_entity_id,
        total_amount,
        line_items,
        metadata,
        store_as,
    })
}

const LINE_FIELDS: &[&str] = &[
    "line_number",
    "line_amount",
    "smart_code",
    "quantity",
    "unit_price",
    "line_entity_id",
    "metadata",
];

fn line_items(checker: &mut Checker, path: &str, items: &[Value]) -> Vec<LineItemSpec> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = index_path(path, i);
        let Some(map) = checker.element(&item_path, item) else {
            continue;
        };
        let node = Node::new(&item_path, map);
        checker.unknown_fields(node, LINE_FIELDS, "a line item");

        let line_number = checker.required_uint(node, "line_number");
        if let Some(n) = line_number {
            if n == 0 || n > u64::from(u32::MAX) {
                checker.error(node.path_of("line_number"), "must be a positive 32-bit integer");
            } else if !seen.insert(n) {
                checker.error(
                    node.path_of("line_number"),
                    format!("duplicate line_number {}", n),
                );
            }
        }
        let line_amount = checker.required_number(node, "line_amount");
        let smart_code = checker.required_str(node, "smart_code");
        let quantity = checker.optional_number(node, "quantity");
        let unit_price = checker.optional_number(node, "unit_price");
        let line_entity_id = checker.optional_str(node, "line_entity_id");
        let metadata = checker.optional_object(node, "metadata").cloned();

        let line_number = line_number.and_then(|n| u32::try_from(n).ok()).filter(|n| *n > 0);
        if let (Some(line_number), Some(line_amount), Some(smart_code)) =
            (line_number, line_amount, smart_code)
        {
            out.push(LineItemSpec {
                line_number,
                line_amount,
                smart_code,
                quantity,
                unit_price,
                line_entity_id,
                metadata,
            });
        }
    }
    out
}

fn create_relationship(
    checker: &mut Checker,
    node: Node<'_>,
    store_as: Option<String>,
) -> Option<CreateRelationship> {
    let from_entity_id = checker.required_str(node, "from_entity_id");
    let to_entity_id = checker.required_str(node, "to_entity_id");
    let relationship_type = checker.required_str(node, "relationship_type");
    let smart_code = checker.required_str(node, "smart_code");
    let relationship_data = checker.optional_object(node, "relationship_data").cloned();

    Some(CreateRelationship {
        from_entity_id: from_entity_id?,
        to_entity_id: to_entity_id?,
        relationship_type: relationship_type?,
        smart_code: smart_code?,
        relationship_data,
        store_as,
    })
}

fn set_dynamic_field(
    checker: &mut Checker,
    node: Node<'_>,
    store_as: Option<String>,
) -> Option<SetDynamicField> {
    let entity_id = checker.required_str(node, "entity_id");
    let field_name = checker.required_str(node, "field_name");
    let smart_code = checker.required_str(node, "smart_code");
    let field_type = checker.optional_keyword::<FieldType>(node, "field_type");

    let field_value = match node.get("field_value") {
        None => {
            checker.error(node.path_of("field_value"), "missing required field");
            None
        }
        Some(v @ (Value::Array(_) | Value::Object(_))) => {
            checker.error(
                node.path_of("field_value"),
                format!("expected a scalar value, found {}", json_type(v)),
            );
            None
        }
        Some(v) => Some(v.clone()),
    };

    if let (Some(value), Some(declared)) = (&field_value, field_type) {
        let agrees = match declared {
            FieldType::Text | FieldType::Date => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
        };
        if !agrees {
            checker.error(
                node.path_of("field_value"),
                format!(
                    "field_type '{}' does not accept a {} value",
                    declared.as_str(),
                    json_type(value)
                ),
            );
        }
    }

    Some(SetDynamicField {
        entity_id: entity_id?,
        field_name: field_name?,
        field_value: field_value?,
        field_type,
        smart_code: smart_code?,
        store_as,
    })
}

fn ui_interaction(
    checker: &mut Checker,
    node: Node<'_>,
    store_as: Option<String>,
) -> Option<UiInteraction> {
    let interaction = checker.required_keyword::<Interaction>(node, "interaction");
    let selector = checker.optional_str(node, "selector");
    let url = checker.optional_str(node, "url");
    let value = node.get("value").cloned();

    if let Some(interaction) = interaction {
        let name = interaction.as_str();
        if interaction == Interaction::Navigate {
            if url.is_none() {
                checker.error(node.path_of("url"), "required when interaction is 'navigate'");
            }
        } else if selector.is_none() {
            checker.error(
                node.path_of("selector"),
                format!("required when interaction is '{}'", name),
            );
        }
        if interaction.needs_value() && value.is_none() {
            checker.error(
                node.path_of("value"),
                format!("required when interaction is '{}'", name),
            );
        }
    }

    Some(UiInteraction {
        interaction: interaction?,
        selector,
        value,
        url,
        store_as,
    })
}

fn api_call(checker: &mut Checker, node: Node<'_>, store_as: Option<String>) -> Option<ApiCall> {
    let method = checker.required_keyword::<HttpMethod>(node, "method");
    let endpoint = checker.required_str(node, "endpoint");
    let body = node.get("body").cloned();
    let headers = checker.string_map(node, "headers");
    let expect_status = checker.optional_uint(node, "expect_status").and_then(|s| {
        if (100..=599).contains(&s) {
            u16::try_from(s).ok()
        } else {
            checker.error(
                node.path_of("expect_status"),
                format!("{} is not an HTTP status code", s),
            );
            None
        }
    });

    Some(ApiCall {
        method: method?,
        endpoint: endpoint?,
        body,
        headers,
        expect_status,
        store_as,
    })
}

fn wait(checker: &mut Checker, node: Node<'_>, store_as: Option<String>) -> Option<Wait> {
    let duration = checker.optional_uint(node, "duration");
    let selector = checker.optional_str(node, "selector");

    let has_duration = node.get("duration").is_some();
    let has_selector = node.get("selector").is_some();
    if has_duration == has_selector {
        checker.error(
            node.path,
            "wait requires exactly one of 'duration' or 'selector'",
        );
    }

    Some(Wait {
        duration,
        selector,
        store_as,
    })
}
