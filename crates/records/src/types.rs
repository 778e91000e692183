//! Typed structs for universal-schema records.
//!
//! Numeric amounts are kept as `f64` exactly as they arrive in JSON; the
//! oracle crate converts them to decimals before doing any arithmetic.
//! Free-form payloads (`metadata`, `relationship_data`) stay as
//! `serde_json::Value` because every consumer reads different keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

fn metadata_lookup<'a>(
    metadata: Option<&'a serde_json::Value>,
    key: &str,
) -> Option<&'a serde_json::Value> {
    metadata.and_then(|m| m.get(key)).filter(|v| !v.is_null())
}

// ── Entity ──────────────────────────────────────────────────────────

/// A master-data record (customer, product, GL account, status, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityData {
    pub id: String,
    pub entity_type: String,
    pub entity_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_code: Option<String>,
    pub smart_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl EntityData {
    pub fn new(
        id: impl Into<String>,
        entity_type: impl Into<String>,
        entity_name: impl Into<String>,
        smart_code: impl Into<String>,
    ) -> Self {
        EntityData {
            id: id.into(),
            entity_type: entity_type.into(),
            entity_name: entity_name.into(),
            entity_code: None,
            smart_code: smart_code.into(),
            organization_id: None,
            metadata: None,
        }
    }

    /// A non-null metadata value by key.
    pub fn metadata_field(&self, key: &str) -> Option<&serde_json::Value> {
        metadata_lookup(self.metadata.as_ref(), key)
    }
}

// ── Transactions ────────────────────────────────────────────────────

/// One business event together with the lines it owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionData {
    pub id: String,
    pub transaction_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    pub smart_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<TransactionLineData>>,
}

impl TransactionData {
    pub fn new(
        id: impl Into<String>,
        transaction_type: impl Into<String>,
        smart_code: impl Into<String>,
    ) -> Self {
        TransactionData {
            id: id.into(),
            transaction_type: transaction_type.into(),
            transaction_code: None,
            total_amount: None,
            smart_code: smart_code.into(),
            reference_entity_id: None,
            organization_id: None,
            metadata: None,
            line_items: None,
        }
    }

    /// Line items, or an empty slice when the transaction has none.
    pub fn lines(&self) -> &[TransactionLineData] {
        self.line_items.as_deref().unwrap_or(&[])
    }

    pub fn metadata_field(&self, key: &str) -> Option<&serde_json::Value> {
        metadata_lookup(self.metadata.as_ref(), key)
    }
}

/// A line of a transaction. `line_entity_id` is a lookup-only reference to
/// an [`EntityData`] (GL account, product, service).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionLineData {
    pub id: String,
    pub line_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    pub line_amount: f64,
    pub smart_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl TransactionLineData {
    pub fn new(
        id: impl Into<String>,
        line_number: u32,
        line_amount: f64,
        smart_code: impl Into<String>,
    ) -> Self {
        TransactionLineData {
            id: id.into(),
            line_number,
            quantity: None,
            unit_price: None,
            line_amount,
            smart_code: smart_code.into(),
            line_entity_id: None,
            metadata: None,
        }
    }

    pub fn metadata_field(&self, key: &str) -> Option<&serde_json::Value> {
        metadata_lookup(self.metadata.as_ref(), key)
    }
}

// ── Relationships ───────────────────────────────────────────────────

/// A directed, typed edge between two entities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipData {
    pub id: String,
    pub from_entity_id: String,
    pub to_entity_id: String,
    pub relationship_type: String,
    pub smart_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_data: Option<serde_json::Value>,
}

impl RelationshipData {
    pub fn new(
        id: impl Into<String>,
        from_entity_id: impl Into<String>,
        to_entity_id: impl Into<String>,
        relationship_type: impl Into<String>,
        smart_code: impl Into<String>,
    ) -> Self {
        RelationshipData {
            id: id.into(),
            from_entity_id: from_entity_id.into(),
            to_entity_id: to_entity_id.into(),
            relationship_type: relationship_type.into(),
            smart_code: smart_code.into(),
            organization_id: None,
            relationship_data: None,
        }
    }

    pub fn data_field(&self, key: &str) -> Option<&serde_json::Value> {
        metadata_lookup(self.relationship_data.as_ref(), key)
    }
}

// ── Dynamic fields ──────────────────────────────────────────────────

/// A typed key/value attached to an entity outside the fixed schema.
///
/// Exactly one `field_value_*` slot is populated; the constructors keep
/// that invariant and [`DynamicFieldData::value`] reads whichever slot
/// is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DynamicFieldData {
    pub entity_id: String,
    pub field_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_value_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_value_number: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_value_boolean: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_value_date: Option<String>,
    pub smart_code: String,
}

/// Borrowed view of the populated slot of a dynamic field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
    Boolean(bool),
    Date(&'a str),
}

impl DynamicFieldData {
    fn empty(
        entity_id: impl Into<String>,
        field_name: impl Into<String>,
        smart_code: impl Into<String>,
    ) -> Self {
        DynamicFieldData {
            entity_id: entity_id.into(),
            field_name: field_name.into(),
            field_value_text: None,
            field_value_number: None,
            field_value_boolean: None,
            field_value_date: None,
            smart_code: smart_code.into(),
        }
    }

    pub fn number(
        entity_id: impl Into<String>,
        field_name: impl Into<String>,
        value: f64,
        smart_code: impl Into<String>,
    ) -> Self {
        DynamicFieldData {
            field_value_number: Some(value),
            ..Self::empty(entity_id, field_name, smart_code)
        }
    }

    pub fn text(
        entity_id: impl Into<String>,
        field_name: impl Into<String>,
        value: impl Into<String>,
        smart_code: impl Into<String>,
    ) -> Self {
        DynamicFieldData {
            field_value_text: Some(value.into()),
            ..Self::empty(entity_id, field_name, smart_code)
        }
    }

    pub fn boolean(
        entity_id: impl Into<String>,
        field_name: impl Into<String>,
        value: bool,
        smart_code: impl Into<String>,
    ) -> Self {
        DynamicFieldData {
            field_value_boolean: Some(value),
            ..Self::empty(entity_id, field_name, smart_code)
        }
    }

    pub fn date(
        entity_id: impl Into<String>,
        field_name: impl Into<String>,
        value: impl Into<String>,
        smart_code: impl Into<String>,
    ) -> Self {
        DynamicFieldData {
            field_value_date: Some(value.into()),
            ..Self::empty(entity_id, field_name, smart_code)
        }
    }

    /// The populated slot, or `None` when no slot carries a value.
    pub fn value(&self) -> Option<FieldValue<'_>> {
        if let Some(n) = self.field_value_number {
            return Some(FieldValue::Number(n));
        }
        if let Some(t) = &self.field_value_text {
            return Some(FieldValue::Text(t));
        }
        if let Some(b) = self.field_value_boolean {
            return Some(FieldValue::Boolean(b));
        }
        self.field_value_date.as_deref().map(FieldValue::Date)
    }
}

// ── Snapshot ────────────────────────────────────────────────────────

/// Everything a Runner recorded during one test execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordSet {
    #[serde(default)]
    pub entities: Vec<EntityData>,
    #[serde(default)]
    pub dynamic_fields: Vec<DynamicFieldData>,
    #[serde(default)]
    pub relationships: Vec<RelationshipData>,
    #[serde(default)]
    pub transactions: Vec<TransactionData>,
}

impl RecordSet {
    pub fn entity(&self, id: &str) -> Option<&EntityData> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn transaction(&self, id: &str) -> Option<&TransactionData> {
        self.transactions.iter().find(|t| t.id == id)
    }

    /// Entities of one `entity_type`, cloned in recorded order.
    pub fn entities_of_type(&self, entity_type: &str) -> Vec<EntityData> {
        self.entities
            .iter()
            .filter(|e| e.entity_type == entity_type)
            .cloned()
            .collect()
    }
}

// ── Oracle kinds ────────────────────────────────────────────────────

/// The closed set of business oracles a test may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleKind {
    AccountingEquation,
    InventoryBalance,
    WorkflowStatus,
    TaxCalculation,
    SmartCodePattern,
    MultiTenantIsolation,
    DomainWorkflow,
}

impl OracleKind {
    pub const ALL: [OracleKind; 7] = [
        OracleKind::AccountingEquation,
        OracleKind::InventoryBalance,
        OracleKind::WorkflowStatus,
        OracleKind::TaxCalculation,
        OracleKind::SmartCodePattern,
        OracleKind::MultiTenantIsolation,
        OracleKind::DomainWorkflow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OracleKind::AccountingEquation => "accounting_equation",
            OracleKind::InventoryBalance => "inventory_balance",
            OracleKind::WorkflowStatus => "workflow_status",
            OracleKind::TaxCalculation => "tax_calculation",
            OracleKind::SmartCodePattern => "smart_code_pattern",
            OracleKind::MultiTenantIsolation => "multi_tenant_isolation",
            OracleKind::DomainWorkflow => "domain_workflow",
        }
    }
}

impl fmt::Display for OracleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OracleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OracleKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown oracle '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_field_constructors_fill_one_slot() {
        let f = DynamicFieldData::number("p1", "opening_balance", 50.0, "HERA.INV.PROD.FIELD.QTY.v1");
        assert_eq!(f.value(), Some(FieldValue::Number(50.0)));
        assert!(f.field_value_text.is_none());
        assert!(f.field_value_boolean.is_none());
        assert!(f.field_value_date.is_none());

        let t = DynamicFieldData::text("c1", "email", "a@b.c", "HERA.CRM.CUST.FIELD.EMAIL.v1");
        assert_eq!(t.value(), Some(FieldValue::Text("a@b.c")));
    }

    #[test]
    fn oracle_kind_parses_its_own_names() {
        for kind in OracleKind::ALL {
            assert_eq!(kind.as_str().parse::<OracleKind>().unwrap(), kind);
        }
        assert!("ledger".parse::<OracleKind>().is_err());
    }

    #[test]
    fn oracle_kind_serializes_snake_case() {
        let v = serde_json::to_value(OracleKind::MultiTenantIsolation).unwrap();
        assert_eq!(v, serde_json::json!("multi_tenant_isolation"));
    }

    #[test]
    fn null_metadata_values_are_absent() {
        let mut e = EntityData::new("a1", "gl_account", "Cash", "HERA.FIN.GL.ACC.ASSET.v1");
        e.metadata = Some(serde_json::json!({ "account_type": null, "ledger": "main" }));
        assert!(e.metadata_field("account_type").is_none());
        assert_eq!(e.metadata_field("ledger"), Some(&serde_json::json!("main")));
    }
}
