//! Inventory conservation: opening + receipts - issues = current.

use bptest_records::{DynamicFieldData, EntityData, FieldValue, TransactionData};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::numeric::{decimal, opt_decimal, round2, Total};
use crate::smart_code::has_segment;

pub const OPENING_BALANCE_FIELD: &str = "opening_balance";
pub const CURRENT_BALANCE_FIELD: &str = "current_balance";

/// How a transaction moves stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockMovement {
    Inbound,
    Outbound,
    None,
}

impl StockMovement {
    /// Smart-code segments first, then the transaction type.
    pub fn of(txn: &TransactionData) -> Self {
        let code = txn.smart_code.as_str();
        if has_segment(code, "RECEIPT") || has_segment(code, "RETURN") {
            return StockMovement::Inbound;
        }
        if has_segment(code, "ISSUE") || has_segment(code, "SALE") {
            return StockMovement::Outbound;
        }
        match txn.transaction_type.as_str() {
            "receipt" | "return" => StockMovement::Inbound,
            "issue" | "sale" => StockMovement::Outbound,
            _ => StockMovement::None,
        }
    }
}

/// Numeric value of a dynamic field: the number slot, or numeric text.
fn numeric_field(fields: &[DynamicFieldData], entity_id: &str, name: &str) -> Option<Decimal> {
    let field = fields
        .iter()
        .find(|f| f.entity_id == entity_id && f.field_name == name)?;
    match field.value()? {
        FieldValue::Number(n) => Some(decimal(n)),
        FieldValue::Text(t) => t.trim().parse::<Decimal>().ok(),
        FieldValue::Boolean(_) | FieldValue::Date(_) => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryDiscrepancy {
    pub product_id: String,
    pub product_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub expected: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub actual: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub difference: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryVerdict {
    pub valid: bool,
    pub products_checked: usize,
    pub discrepancies: Vec<InventoryDiscrepancy>,
    /// Set when a product's stock left the decimal range. The verdict is then invalid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overflow: Option<String>,
}

pub fn check_inventory_balance(
    products: &[EntityData],
    transactions: &[TransactionData],
    dynamic_fields: &[DynamicFieldData],
    tolerance: Decimal,
) -> InventoryVerdict {
    let mut discrepancies = Vec::new();
    let mut out_of_range = Vec::new();

    for product in products {
        let opening = numeric_field(dynamic_fields, &product.id, OPENING_BALANCE_FIELD)
            .unwrap_or(Decimal::ZERO);
        let actual = numeric_field(dynamic_fields, &product.id, CURRENT_BALANCE_FIELD)
            .unwrap_or(Decimal::ZERO);

        let mut expected = Total::starting_at(opening);
        for txn in transactions {
            let movement = StockMovement::of(txn);
            if movement == StockMovement::None {
                continue;
            }
            for line in txn.lines() {
                if line.line_entity_id.as_deref() != Some(product.id.as_str()) {
                    continue;
                }
                let qty = opt_decimal(line.quantity);
                match movement {
                    StockMovement::Inbound => expected.add(qty),
                    StockMovement::Outbound => expected.sub(qty),
                    StockMovement::None => {}
                }
            }
        }

        let Some((expected, difference)) = expected
            .value()
            .and_then(|e| actual.checked_sub(e).map(|d| (e, d)))
        else {
            tracing::warn!(product = %product.id, "stock exceeds the decimal range");
            out_of_range.push(product.id.as_str());
            continue;
        };
        if difference.abs() > tolerance {
            discrepancies.push(InventoryDiscrepancy {
                product_id: product.id.clone(),
                product_name: product.entity_name.clone(),
                expected,
                actual,
                difference: round2(difference),
            });
        }
    }

    tracing::debug!(
        products = products.len(),
        discrepancies = discrepancies.len(),
        "inventory balance evaluated"
    );
    let overflow = (!out_of_range.is_empty()).then(|| {
        format!(
            "stock exceeds the decimal range: {}",
            out_of_range.join(", ")
        )
    });
    InventoryVerdict {
        valid: discrepancies.is_empty() && overflow.is_none(),
        products_checked: products.len(),
        discrepancies,
        overflow,
    }
}
