//! bptest-oracle: business invariants over recorded universal-schema data.
//!
//! Every oracle is a pure function from records (plus a few parameters) to
//! a serializable verdict carrying `valid` and the evidence behind it. The
//! oracles never fail: odd data yields an invalid verdict, not an error.
//! [`dispatch::evaluate`] is the only fallible entry point and fails only
//! when the call itself is unusable.
//!
//! Amounts are converted to `rust_decimal::Decimal` before any arithmetic
//! and reported rounded half-to-even to two places.

pub mod accounting;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod inventory;
pub mod numeric;
pub mod smart_code;
pub mod tax;
pub mod tenancy;
pub mod workflow;

pub use accounting::{check_accounting_equation, AccountType, AccountingVerdict};
pub use config::{ConfigError, OracleConfig, TaxRates};
pub use dispatch::{evaluate, evaluate_json, OracleInputError, Verdict};
pub use domain::{check_domain_workflow, DomainWorkflow, DomainWorkflowVerdict};
pub use inventory::{check_inventory_balance, InventoryVerdict};
pub use smart_code::{check_smart_codes, validate_smart_code, SmartCodeVerdict};
pub use tax::{check_tax_calculation, TaxVerdict};
pub use tenancy::{check_tenant_isolation, TenancyVerdict};
pub use workflow::{check_workflow_status, valid_transitions, WorkflowStatus, WorkflowVerdict};

pub use bptest_records::OracleKind;
