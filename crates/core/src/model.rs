//! Typed model of a business process test document.
//!
//! Values of these types only come out of the schema validator (or from
//! deserializing a model it produced), so every invariant the validator
//! checks holds for them. The model is treated as immutable once parsing
//! has finished.

use std::collections::BTreeMap;

use bptest_records::OracleKind;
use serde::{Deserialize, Serialize};

pub const DEFAULT_VERSION: &str = "1.0.0";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_STEP_RETRY: u32 = 0;

pub type JsonMap = serde_json::Map<String, serde_json::Value>;

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_STEP_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

/// A closed vocabulary of string keywords.
pub trait Keyword: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn from_keyword(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == s)
    }

    /// Comma-separated list of every keyword, for error messages.
    fn expected() -> String {
        Self::ALL
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ──────────────────────────────────────────────
// Document
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessProcessTest {
    pub id: String,
    pub title: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub context: TestContext,
    pub personas: BTreeMap<String, Persona>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub setup: Vec<Action>,
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup: Vec<Action>,
    #[serde(default)]
    pub assertions: Vec<AssertionGroup>,
    #[serde(default)]
    pub metadata: TestMetadata,
}

impl BusinessProcessTest {
    /// Every action in execution order: setup, each step, cleanup.
    pub fn action_count(&self) -> usize {
        self.setup.len()
            + self.steps.iter().map(|s| s.actions.len()).sum::<usize>()
            + self.cleanup.len()
    }

    /// Business assertions across all assertion groups.
    pub fn business_checks(&self) -> impl Iterator<Item = &BusinessCheck> {
        self.assertions.iter().flat_map(|group| match group {
            AssertionGroup::Business(b) => b.assertions.as_slice(),
            AssertionGroup::Ui(_) | AssertionGroup::Database(_) => &[],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestContext {
    pub organization_id: String,
    #[serde(default)]
    pub industry: Industry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Fixed RFC 3339 instant the run treats as `clock`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    Salon,
    Restaurant,
    Healthcare,
    Retail,
    Manufacturing,
    ProfessionalServices,
    #[default]
    Generic,
}

impl Keyword for Industry {
    const ALL: &'static [Self] = &[
        Industry::Salon,
        Industry::Restaurant,
        Industry::Healthcare,
        Industry::Retail,
        Industry::Manufacturing,
        Industry::ProfessionalServices,
        Industry::Generic,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Industry::Salon => "salon",
            Industry::Restaurant => "restaurant",
            Industry::Healthcare => "healthcare",
            Industry::Retail => "retail",
            Industry::Manufacturing => "manufacturing",
            Industry::ProfessionalServices => "professional_services",
            Industry::Generic => "generic",
        }
    }
}

/// A named role impersonated while executing a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub persona: String,
    pub actions: Vec<Action>,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub retry: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestMetadata {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Default for TestMetadata {
    fn default() -> Self {
        TestMetadata {
            tags: Vec::new(),
            priority: Priority::Medium,
            estimated_duration: None,
            author: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Keyword for Priority {
    const ALL: &'static [Self] = &[
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

// ──────────────────────────────────────────────
// Actions
// ──────────────────────────────────────────────

/// One executable action, discriminated by `action_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action_type", rename_all = "snake_case")]
pub enum Action {
    CreateEntity(CreateEntity),
    CreateTransaction(CreateTransaction),
    CreateRelationship(CreateRelationship),
    SetDynamicField(SetDynamicField),
    UiInteraction(UiInteraction),
    ApiCall(ApiCall),
    Wait(Wait),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    CreateEntity,
    CreateTransaction,
    CreateRelationship,
    SetDynamicField,
    UiInteraction,
    ApiCall,
    Wait,
}

impl Keyword for ActionType {
    const ALL: &'static [Self] = &[
        ActionType::CreateEntity,
        ActionType::CreateTransaction,
        ActionType::CreateRelationship,
        ActionType::SetDynamicField,
        ActionType::UiInteraction,
        ActionType::ApiCall,
        ActionType::Wait,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateEntity => "create_entity",
            ActionType::CreateTransaction => "create_transaction",
            ActionType::CreateRelationship => "create_relationship",
            ActionType::SetDynamicField => "set_dynamic_field",
            ActionType::UiInteraction => "ui_interaction",
            ActionType::ApiCall => "api_call",
            ActionType::Wait => "wait",
        }
    }
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        match self {
            Action::CreateEntity(_) => ActionType::CreateEntity,
            Action::CreateTransaction(_) => ActionType::CreateTransaction,
            Action::CreateRelationship(_) => ActionType::CreateRelationship,
            Action::SetDynamicField(_) => ActionType::SetDynamicField,
            Action::UiInteraction(_) => ActionType::UiInteraction,
            Action::ApiCall(_) => ActionType::ApiCall,
            Action::Wait(_) => ActionType::Wait,
        }
    }

    /// Context name the action's result is stored under, if any.
    pub fn store_as(&self) -> Option<&str> {
        let name = match self {
            Action::CreateEntity(a) => &a.store_as,
            Action::CreateTransaction(a) => &a.store_as,
            Action::CreateRelationship(a) => &a.store_as,
            Action::SetDynamicField(a) => &a.store_as,
            Action::UiInteraction(a) => &a.store_as,
            Action::ApiCall(a) => &a.store_as,
            Action::Wait(a) => &a.store_as,
        };
        name.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEntity {
    pub entity_type: String,
    pub entity_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_code: Option<String>,
    pub smart_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_fields: Option<JsonMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_as: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTransaction {
    pub transaction_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_code: Option<String>,
    pub smart_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<LineItemSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_as: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemSpec {
    pub line_number: u32,
    pub line_amount: f64,
    pub smart_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonMap>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRelationship {
    pub from_entity_id: String,
    pub to_entity_id: String,
    pub relationship_type: String,
    pub smart_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_data: Option<JsonMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_as: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetDynamicField {
    pub entity_id: String,
    pub field_name: String,
    pub field_value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    pub smart_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_as: Option<String>,
}

/// Declared type of a dynamic field; selects the populated value slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Date,
}

impl Keyword for FieldType {
    const ALL: &'static [Self] = &[
        FieldType::Text,
        FieldType::Number,
        FieldType::Boolean,
        FieldType::Date,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiInteraction {
    pub interaction: Interaction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_as: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    Click,
    Fill,
    Select,
    Navigate,
    Hover,
    Check,
    Press,
}

impl Interaction {
    pub fn needs_value(&self) -> bool {
        matches!(
            self,
            Interaction::Fill | Interaction::Select | Interaction::Press
        )
    }
}

impl Keyword for Interaction {
    const ALL: &'static [Self] = &[
        Interaction::Click,
        Interaction::Fill,
        Interaction::Select,
        Interaction::Navigate,
        Interaction::Hover,
        Interaction::Check,
        Interaction::Press,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Interaction::Click => "click",
            Interaction::Fill => "fill",
            Interaction::Select => "select",
            Interaction::Navigate => "navigate",
            Interaction::Hover => "hover",
            Interaction::Check => "check",
            Interaction::Press => "press",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCall {
    pub method: HttpMethod,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_as: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Keyword for HttpMethod {
    const ALL: &'static [Self] = &[
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Pause for a fixed `duration` (ms) or until `selector` appears; exactly one is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wait {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_as: Option<String>,
}

// ──────────────────────────────────────────────
// Assertions
// ──────────────────────────────────────────────

/// A group of expected outcomes, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssertionGroup {
    Ui(UiAssertions),
    Database(DatabaseAssertions),
    Business(BusinessAssertions),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionType {
    Ui,
    Database,
    Business,
}

impl Keyword for AssertionType {
    const ALL: &'static [Self] = &[
        AssertionType::Ui,
        AssertionType::Database,
        AssertionType::Business,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            AssertionType::Ui => "ui",
            AssertionType::Database => "database",
            AssertionType::Business => "business",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiAssertions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub assertions: Vec<UiCheck>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiCheck {
    pub selector: String,
    pub condition: UiCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiCondition {
    Visible,
    Hidden,
    Enabled,
    Disabled,
    ContainsText,
    HasValue,
    Count,
}

impl UiCondition {
    pub fn needs_value(&self) -> bool {
        matches!(
            self,
            UiCondition::ContainsText | UiCondition::HasValue | UiCondition::Count
        )
    }
}

impl Keyword for UiCondition {
    const ALL: &'static [Self] = &[
        UiCondition::Visible,
        UiCondition::Hidden,
        UiCondition::Enabled,
        UiCondition::Disabled,
        UiCondition::ContainsText,
        UiCondition::HasValue,
        UiCondition::Count,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            UiCondition::Visible => "visible",
            UiCondition::Hidden => "hidden",
            UiCondition::Enabled => "enabled",
            UiCondition::Disabled => "disabled",
            UiCondition::ContainsText => "contains_text",
            UiCondition::HasValue => "has_value",
            UiCondition::Count => "count",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseAssertions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub assertions: Vec<DatabaseCheck>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseCheck {
    pub table: UniversalTable,
    #[serde(default)]
    pub filter: JsonMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
}

/// The six tables of the universal schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniversalTable {
    CoreOrganizations,
    CoreEntities,
    CoreDynamicData,
    CoreRelationships,
    UniversalTransactions,
    UniversalTransactionLines,
}

impl Keyword for UniversalTable {
    const ALL: &'static [Self] = &[
        UniversalTable::CoreOrganizations,
        UniversalTable::CoreEntities,
        UniversalTable::CoreDynamicData,
        UniversalTable::CoreRelationships,
        UniversalTable::UniversalTransactions,
        UniversalTable::UniversalTransactionLines,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            UniversalTable::CoreOrganizations => "core_organizations",
            UniversalTable::CoreEntities => "core_entities",
            UniversalTable::CoreDynamicData => "core_dynamic_data",
            UniversalTable::CoreRelationships => "core_relationships",
            UniversalTable::UniversalTransactions => "universal_transactions",
            UniversalTable::UniversalTransactionLines => "universal_transaction_lines",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessAssertions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub assertions: Vec<BusinessCheck>,
}

/// An oracle invocation and the verdict it is expected to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessCheck {
    pub oracle: OracleKind,
    #[serde(default)]
    pub params: JsonMap,
    #[serde(default = "default_true")]
    pub expected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Keyword for OracleKind {
    const ALL: &'static [Self] = &OracleKind::ALL;

    fn as_str(&self) -> &'static str {
        OracleKind::as_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn actions_serialize_with_action_type_tag() {
        let action = Action::Wait(Wait {
            duration: Some(500),
            selector: None,
            store_as: None,
        });
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({ "action_type": "wait", "duration": 500 })
        );
    }

    #[test]
    fn keyword_lookup_is_exact() {
        assert_eq!(Industry::from_keyword("salon"), Some(Industry::Salon));
        assert_eq!(Industry::from_keyword("Salon"), None);
        assert_eq!(HttpMethod::from_keyword("PATCH"), Some(HttpMethod::Patch));
        assert!(ActionType::expected().starts_with("create_entity, create_transaction"));
    }

    #[test]
    fn oracle_keywords_match_record_names() {
        assert_eq!(
            <OracleKind as Keyword>::from_keyword("tax_calculation"),
            Some(OracleKind::TaxCalculation)
        );
    }
}
