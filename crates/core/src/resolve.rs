//! Template expansion over typed actions.

use serde_json::Value;

use crate::model::*;
use crate::template::TemplateResolver;

impl Action {
    /// A copy of this action with every string field expanded against
    /// `resolver`. `store_as` is a binding name and is never expanded.
    pub fn resolved(&self, r: &TemplateResolver<'_>) -> Action {
        match self {
            Action::CreateEntity(a) => Action::CreateEntity(CreateEntity {
                entity_type: r.resolve_str(&a.entity_type),
                entity_name: r.resolve_str(&a.entity_name),
                entity_code: r.resolve_opt(&a.entity_code),
                smart_code: r.resolve_str(&a.smart_code),
                dynamic_fields: a.dynamic_fields.as_ref().map(|m| r.resolve_map(m)),
                metadata: a.metadata.as_ref().map(|m| r.resolve_map(m)),
                store_as: a.store_as.clone(),
            }),
            Action::CreateTransaction(a) => Action::CreateTransaction(CreateTransaction {
                transaction_type: r.resolve_str(&a.transaction_type),
                transaction_code: r.resolve_opt(&a.transaction_code),
                smart_code: r.resolve_str(&a.smart_code),
                reference_entity_id: r.resolve_opt(&a.reference_entity_id),
                total_amount: a.total_amount,
                line_items: a
                    .line_items
                    .as_ref()
                    .map(|lines| lines.iter().map(|l| l.resolved(r)).collect()),
                metadata: a.metadata.as_ref().map(|m| r.resolve_map(m)),
                store_as: a.store_as.clone(),
            }),
            Action::CreateRelationship(a) => Action::CreateRelationship(CreateRelationship {
                from_entity_id: r.resolve_str(&a.from_entity_id),
                to_entity_id: r.resolve_str(&a.to_entity_id),
                relationship_type: r.resolve_str(&a.relationship_type),
                smart_code: r.resolve_str(&a.smart_code),
                relationship_data: a.relationship_data.as_ref().map(|m| r.resolve_map(m)),
                store_as: a.store_as.clone(),
            }),
            Action::SetDynamicField(a) => Action::SetDynamicField(SetDynamicField {
                entity_id: r.resolve_str(&a.entity_id),
                field_name: r.resolve_str(&a.field_name),
                field_value: r.resolve_value(&a.field_value),
                field_type: a.field_type,
                smart_code: r.resolve_str(&a.smart_code),
                store_as: a.store_as.clone(),
            }),
            Action::UiInteraction(a) => Action::UiInteraction(UiInteraction {
                interaction: a.interaction,
                selector: r.resolve_opt(&a.selector),
                value: a.value.as_ref().map(|v| r.resolve_value(v)),
                url: r.resolve_opt(&a.url),
                store_as: a.store_as.clone(),
            }),
            Action::ApiCall(a) => Action::ApiCall(ApiCall {
                method: a.method,
                endpoint: r.resolve_str(&a.endpoint),
                body: a.body.as_ref().map(|v| r.resolve_value(v)),
                headers: a.headers.as_ref().map(|h| {
                    h.iter()
                        .map(|(k, v)| (k.clone(), r.resolve_str(v)))
                        .collect()
                }),
                expect_status: a.expect_status,
                store_as: a.store_as.clone(),
            }),
            Action::Wait(a) => Action::Wait(Wait {
                duration: a.duration,
                selector: r.resolve_opt(&a.selector),
                store_as: a.store_as.clone(),
            }),
        }
    }

    /// The value bound under `store_as` at parse time: the action's declared
    /// fields as an object, without `action_type` and `store_as`.
    pub fn binding(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => {
                map.remove("action_type");
                map.remove("store_as");
                Value::Object(map)
            }
            _ => Value::Object(JsonMap::new()),
        }
    }
}

impl LineItemSpec {
    fn resolved(&self, r: &TemplateResolver<'_>) -> LineItemSpec {
        LineItemSpec {
            line_number: self.line_number,
            line_amount: self.line_amount,
            smart_code: r.resolve_str(&self.smart_code),
            quantity: self.quantity,
            unit_price: self.unit_price,
            line_entity_id: r.resolve_opt(&self.line_entity_id),
            metadata: self.metadata.as_ref().map(|m| r.resolve_map(m)),
        }
    }
}
