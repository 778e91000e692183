//! Tax recomputation for one transaction.

use std::collections::BTreeMap;

use bptest_records::TransactionData;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::config::{TaxRates, DEFAULT_TAX_TYPE};
use crate::numeric::{decimal, json_decimal, round2, to_f64, Total};

pub const TAX_AMOUNT_FIELD: &str = "tax_amount";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxVerdict {
    pub valid: bool,
    pub transaction_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub expected_tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub recorded_tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub difference: Decimal,
    /// Tax per line, keyed `line_<n>_<tax type>`.
    pub breakdown: BTreeMap<String, f64>,
    /// Tax types found on lines but missing from the rate table (taxed at 0).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_tax_types: Vec<String>,
    /// Set when a line's tax or the total left the decimal range. The verdict is then invalid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overflow: Option<String>,
}

pub fn check_tax_calculation(
    transaction: &TransactionData,
    rates: &TaxRates,
    tolerance: Decimal,
) -> TaxVerdict {
    let mut expected = Total::default();
    let mut out_of_range = Vec::new();
    let mut breakdown = BTreeMap::new();
    let mut unknown = Vec::new();

    for line in transaction.lines() {
        let tax_type = line
            .metadata_field("tax_type")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_TAX_TYPE);
        let rate = rates.rate(tax_type).unwrap_or_else(|| {
            if !unknown.iter().any(|t| t == tax_type) {
                unknown.push(tax_type.to_string());
            }
            Decimal::ZERO
        });
        let Some(tax) = decimal(line.line_amount).checked_mul(rate) else {
            out_of_range.push(line.line_number.to_string());
            continue;
        };
        expected.add(tax);
        breakdown.insert(
            format!("line_{}_{}", line.line_number, tax_type),
            to_f64(round2(tax)),
        );
    }

    let recorded = transaction
        .metadata_field(TAX_AMOUNT_FIELD)
        .and_then(json_decimal)
        .unwrap_or(Decimal::ZERO);

    let difference = match expected.value() {
        Some(e) if out_of_range.is_empty() => e.checked_sub(recorded).map(|d| (e, d.abs())),
        _ => None,
    };
    let overflow = match difference {
        Some(_) => None,
        None if out_of_range.is_empty() => {
            Some("expected tax exceeds the decimal range".to_string())
        }
        None => Some(format!(
            "tax on lines {} exceeds the decimal range",
            out_of_range.join(", ")
        )),
    };
    let (expected, difference) = difference.unwrap_or((Decimal::ZERO, Decimal::ZERO));

    TaxVerdict {
        valid: overflow.is_none() && difference <= tolerance,
        transaction_id: transaction.id.clone(),
        expected_tax: round2(expected),
        recorded_tax: recorded,
        difference: round2(difference),
        breakdown,
        unknown_tax_types: unknown,
        overflow,
    }
}
