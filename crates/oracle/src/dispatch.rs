//! Run an oracle by kind with JSON parameters against a record snapshot.
//!
//! This is the seam used by business assertions and the CLI. The oracle
//! functions themselves never fail; the dispatcher fails only when the call
//! itself is unusable (a required parameter is missing, a referenced
//! transaction does not exist, the snapshot is not shaped like records).

use bptest_records::{OracleKind, RecordError, RecordSet};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::accounting::{check_accounting_equation, AccountingVerdict};
use crate::config::OracleConfig;
use crate::domain::{check_domain_workflow, DomainWorkflow, DomainWorkflowVerdict};
use crate::inventory::{check_inventory_balance, InventoryVerdict};
use crate::numeric::json_decimal;
use crate::smart_code::{check_smart_codes, SmartCodeVerdict};
use crate::tax::{check_tax_calculation, TaxVerdict};
use crate::tenancy::{check_tenant_isolation, TenancyVerdict};
use crate::workflow::{check_workflow_status, WorkflowVerdict};

pub const GL_ACCOUNT_TYPE: &str = "gl_account";
pub const PRODUCT_TYPE: &str = "product";
pub const STATUS_TYPE: &str = "workflow_status";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OracleInputError {
    #[error("{oracle}: missing required parameter '{param}'")]
    MissingParam {
        oracle: OracleKind,
        param: &'static str,
    },
    #[error("{oracle}: parameter '{param}' {message}")]
    InvalidParam {
        oracle: OracleKind,
        param: &'static str,
        message: String,
    },
    #[error("{oracle}: parameters must be a JSON object")]
    ParamsNotAnObject { oracle: OracleKind },
    #[error("{oracle}: no transaction with id '{id}' in the records")]
    UnknownTransaction { oracle: OracleKind, id: String },
    #[error("invalid records: {0}")]
    Records(#[from] RecordError),
}

/// The verdict of whichever oracle ran. Serializes as that oracle's own
/// verdict object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Verdict {
    AccountingEquation(AccountingVerdict),
    InventoryBalance(InventoryVerdict),
    WorkflowStatus(WorkflowVerdict),
    TaxCalculation(TaxVerdict),
    SmartCodePattern(SmartCodeVerdict),
    MultiTenantIsolation(TenancyVerdict),
    DomainWorkflow(DomainWorkflowVerdict),
}

impl Verdict {
    pub fn valid(&self) -> bool {
        match self {
            Verdict::AccountingEquation(v) => v.valid,
            Verdict::InventoryBalance(v) => v.valid,
            Verdict::WorkflowStatus(v) => v.valid,
            Verdict::TaxCalculation(v) => v.valid,
            Verdict::SmartCodePattern(v) => v.valid,
            Verdict::MultiTenantIsolation(v) => v.valid,
            Verdict::DomainWorkflow(v) => v.valid,
        }
    }

    pub fn kind(&self) -> OracleKind {
        match self {
            Verdict::AccountingEquation(_) => OracleKind::AccountingEquation,
            Verdict::InventoryBalance(_) => OracleKind::InventoryBalance,
            Verdict::WorkflowStatus(_) => OracleKind::WorkflowStatus,
            Verdict::TaxCalculation(_) => OracleKind::TaxCalculation,
            Verdict::SmartCodePattern(_) => OracleKind::SmartCodePattern,
            Verdict::MultiTenantIsolation(_) => OracleKind::MultiTenantIsolation,
            Verdict::DomainWorkflow(_) => OracleKind::DomainWorkflow,
        }
    }
}

struct Params<'a> {
    oracle: OracleKind,
    map: &'a Map<String, Value>,
}

impl<'a> Params<'a> {
    fn required_str(&self, param: &'static str) -> Result<&'a str, OracleInputError> {
        match self.map.get(param) {
            None | Some(Value::Null) => Err(OracleInputError::MissingParam {
                oracle: self.oracle,
                param,
            }),
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
            Some(_) => Err(OracleInputError::InvalidParam {
                oracle: self.oracle,
                param,
                message: "must be a non-empty string".to_string(),
            }),
        }
    }

    /// `tolerance`, falling back to the configured default.
    fn tolerance(&self, default: Decimal) -> Result<Decimal, OracleInputError> {
        match self.map.get("tolerance") {
            None | Some(Value::Null) => Ok(default),
            Some(v) => json_decimal(v)
                .filter(|d| !d.is_sign_negative())
                .ok_or_else(|| OracleInputError::InvalidParam {
                    oracle: self.oracle,
                    param: "tolerance",
                    message: "must be a non-negative number".to_string(),
                }),
        }
    }
}

/// Evaluate `kind` over `records`.
pub fn evaluate(
    kind: OracleKind,
    params: &Map<String, Value>,
    records: &RecordSet,
    config: &OracleConfig,
) -> Result<Verdict, OracleInputError> {
    let p = Params { oracle: kind, map: params };

    let verdict = match kind {
        OracleKind::AccountingEquation => Verdict::AccountingEquation(check_accounting_equation(
            &records.entities_of_type(GL_ACCOUNT_TYPE),
            &records.transactions,
            p.tolerance(config.accounting_tolerance)?,
        )),
        OracleKind::InventoryBalance => Verdict::InventoryBalance(check_inventory_balance(
            &records.entities_of_type(PRODUCT_TYPE),
            &records.transactions,
            &records.dynamic_fields,
            p.tolerance(config.inventory_tolerance)?,
        )),
        OracleKind::WorkflowStatus => Verdict::WorkflowStatus(check_workflow_status(
            p.required_str("entity_id")?,
            p.required_str("expected_status")?,
            &records.relationships,
            &records.entities_of_type(STATUS_TYPE),
        )),
        OracleKind::TaxCalculation => {
            let id = p.required_str("transaction_id")?;
            let txn = records
                .transaction(id)
                .ok_or_else(|| OracleInputError::UnknownTransaction {
                    oracle: kind,
                    id: id.to_string(),
                })?;
            Verdict::TaxCalculation(check_tax_calculation(
                txn,
                &config.tax_rates(),
                p.tolerance(config.tax_tolerance)?,
            ))
        }
        OracleKind::SmartCodePattern => Verdict::SmartCodePattern(check_smart_codes(
            &records.entities,
            &records.transactions,
            &records.relationships,
        )),
        OracleKind::MultiTenantIsolation => Verdict::MultiTenantIsolation(check_tenant_isolation(
            p.required_str("organization_id")?,
            &records.entities,
            &records.transactions,
            &records.relationships,
        )),
        OracleKind::DomainWorkflow => {
            let workflow = p
                .required_str("workflow")?
                .parse::<DomainWorkflow>()
                .map_err(|message| OracleInputError::InvalidParam {
                    oracle: kind,
                    param: "workflow",
                    message,
                })?;
            let id = p.required_str("transaction_id")?;
            let order = records
                .transaction(id)
                .ok_or_else(|| OracleInputError::UnknownTransaction {
                    oracle: kind,
                    id: id.to_string(),
                })?;
            Verdict::DomainWorkflow(check_domain_workflow(
                workflow,
                order,
                &records.relationships,
                &records.entities_of_type(STATUS_TYPE),
            ))
        }
    };

    tracing::debug!(oracle = %kind, valid = verdict.valid(), "oracle evaluated");
    Ok(verdict)
}

/// [`evaluate`] over untyped JSON, as read from files or assertion params.
pub fn evaluate_json(
    kind: OracleKind,
    params: &Value,
    records: &Value,
    config: &OracleConfig,
) -> Result<Verdict, OracleInputError> {
    let empty = Map::new();
    let params = match params {
        Value::Null => &empty,
        Value::Object(map) => map,
        _ => return Err(OracleInputError::ParamsNotAnObject { oracle: kind }),
    };
    let records = RecordSet::from_json(records)?;
    evaluate(kind, params, &records, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> Value {
        json!({
            "entities": [
                { "id": "cash", "entity_type": "gl_account", "entity_name": "Cash",
                  "smart_code": "HERA.FIN.GL.ACC.GL.v1", "organization_id": "org-1",
                  "metadata": { "account_type": "asset" } },
                { "id": "capital", "entity_type": "gl_account", "entity_name": "Capital",
                  "smart_code": "HERA.FIN.GL.ACC.GL.v1", "organization_id": "org-1",
                  "metadata": { "account_type": "equity" } }
            ],
            "transactions": [{
                "id": "je-1", "transaction_type": "journal_entry", "smart_code": "HERA.FIN.GL.TXN.JE.v1",
                "organization_id": "org-1",
                "metadata": { "tax_amount": 0 },
                "line_items": [
                    { "id": "l1", "line_number": 1, "line_amount": 1000, "smart_code": "HERA.FIN.GL.LINE.DEBIT.v1", "line_entity_id": "cash", "metadata": { "tax_type": "exempt" } },
                    { "id": "l2", "line_number": 2, "line_amount": 1000, "smart_code": "HERA.FIN.GL.LINE.CREDIT.v1", "line_entity_id": "capital", "metadata": { "tax_type": "exempt" } }
                ]
            }]
        })
    }

    fn run(kind: OracleKind, params: Value) -> Result<Verdict, OracleInputError> {
        evaluate_json(kind, &params, &snapshot(), &OracleConfig::default())
    }

    #[test]
    fn every_oracle_runs_against_one_snapshot() {
        let cases = [
            (OracleKind::AccountingEquation, json!({})),
            (OracleKind::InventoryBalance, json!(null)),
            (OracleKind::WorkflowStatus, json!({ "entity_id": "je-1", "expected_status": "DRAFT" })),
            (OracleKind::TaxCalculation, json!({ "transaction_id": "je-1" })),
            (OracleKind::SmartCodePattern, json!({})),
            (OracleKind::MultiTenantIsolation, json!({ "organization_id": "org-1" })),
            (OracleKind::DomainWorkflow, json!({ "transaction_id": "je-1", "workflow": "restaurant" })),
        ];
        for (kind, params) in cases {
            let verdict = run(kind, params).unwrap();
            assert_eq!(verdict.kind(), kind);
            assert!(verdict.valid(), "{} should pass: {:?}", kind, verdict);
        }
    }

    #[test]
    fn verdict_serializes_flat() {
        let verdict = run(OracleKind::AccountingEquation, json!({})).unwrap();
        let value = serde_json::to_value(&verdict).unwrap();
        assert_eq!(value["valid"], json!(true));
        assert_eq!(value["accounts"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn tolerance_param_overrides_config() {
        let err = run(OracleKind::AccountingEquation, json!({ "tolerance": "lots" })).unwrap_err();
        assert_eq!(
            err.to_string(),
            "accounting_equation: parameter 'tolerance' must be a non-negative number"
        );
        assert!(run(OracleKind::AccountingEquation, json!({ "tolerance": 0 })).unwrap().valid());
    }

    #[test]
    fn unusable_calls_are_errors() {
        assert_eq!(
            run(OracleKind::MultiTenantIsolation, json!({})).unwrap_err(),
            OracleInputError::MissingParam {
                oracle: OracleKind::MultiTenantIsolation,
                param: "organization_id"
            }
        );
        assert!(matches!(
            run(OracleKind::TaxCalculation, json!({ "transaction_id": "nope" })),
            Err(OracleInputError::UnknownTransaction { .. })
        ));
        assert!(matches!(
            run(OracleKind::DomainWorkflow, json!({ "transaction_id": "je-1", "workflow": "spa" })),
            Err(OracleInputError::InvalidParam { param: "workflow", .. })
        ));
        assert!(matches!(
            run(OracleKind::SmartCodePattern, json!([1])),
            Err(OracleInputError::ParamsNotAnObject { .. })
        ));
        let err = evaluate_json(
            OracleKind::SmartCodePattern,
            &Value::Null,
            &json!({ "entities": "all of them" }),
            &OracleConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid records: record field 'entities' must be an array");
    }
}
