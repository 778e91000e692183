//! Decimal helpers shared by the monetary and quantity oracles.
//!
//! Record amounts arrive as JSON numbers (`f64`); every oracle converts them
//! here and does all arithmetic in `rust_decimal::Decimal`. Reported totals
//! are rounded to two places with `MidpointNearestEven`.
//!
//! Sums go through [`Total`], which uses checked arithmetic. A sum that leaves
//! the `Decimal` range becomes `None` and the oracle reports it in its verdict.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

/// Convert a recorded amount via its shortest decimal rendering, so `0.1`
/// becomes exactly `0.1`. Non-finite or out-of-range values count as zero.
pub fn decimal(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    value
        .to_string()
        .parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_f64(value))
        .unwrap_or(Decimal::ZERO)
}

pub fn opt_decimal(value: Option<f64>) -> Decimal {
    value.map(decimal).unwrap_or(Decimal::ZERO)
}

/// A number, or a string holding one.
pub fn json_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.as_f64().map(decimal),
        Value::String(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    }
}

pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// `|a - b| <= tolerance`. A difference outside the decimal range is never within.
pub fn within(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    a.checked_sub(b).is_some_and(|d| d.abs() <= tolerance)
}

/// Running sum that goes to `None` on the first overflow and stays there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Total(Option<Decimal>);

impl Default for Total {
    fn default() -> Self {
        Total(Some(Decimal::ZERO))
    }
}

impl Total {
    pub fn starting_at(value: Decimal) -> Self {
        Total(Some(value))
    }

    pub fn add(&mut self, value: Decimal) {
        self.0 = self.0.and_then(|t| t.checked_add(value));
    }

    pub fn sub(&mut self, value: Decimal) {
        self.0 = self.0.and_then(|t| t.checked_sub(value));
    }

    pub fn plus(self, other: Total) -> Total {
        match (self.0, other.0) {
            (Some(a), Some(b)) => Total(a.checked_add(b)),
            _ => Total(None),
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        self.0
    }
}

pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn float_amounts_convert_exactly_enough() {
        assert_eq!(decimal(0.1) + decimal(0.2), dec("0.3"));
        assert_eq!(decimal(f64::NAN), Decimal::ZERO);
        assert_eq!(decimal(f64::INFINITY), Decimal::ZERO);
        assert_eq!(opt_decimal(None), Decimal::ZERO);
    }

    #[test]
    fn round2_is_bankers_rounding() {
        assert_eq!(round2(dec("2.345")), dec("2.34"));
        assert_eq!(round2(dec("2.355")), dec("2.36"));
        assert_eq!(round2(dec("-1.005")), dec("-1.00"));
    }

    #[test]
    fn json_amounts_accept_numbers_and_numeric_strings() {
        assert_eq!(json_decimal(&json!(6)), Some(dec("6")));
        assert_eq!(json_decimal(&json!("12.50")), Some(dec("12.50")));
        assert_eq!(json_decimal(&json!("n/a")), None);
        assert_eq!(json_decimal(&json!(true)), None);
    }

    #[test]
    fn tolerance_is_inclusive() {
        assert!(within(dec("100.00"), dec("100.01"), dec("0.01")));
        assert!(!within(dec("100.00"), dec("100.02"), dec("0.01")));
        assert!(!within(Decimal::MAX, Decimal::MIN, Decimal::MAX));
    }

    #[test]
    fn total_overflow_is_sticky() {
        let mut t = Total::starting_at(Decimal::MAX);
        t.sub(dec("1"));
        assert_eq!(t.value(), Some(Decimal::MAX - dec("1")));
        t.add(dec("2"));
        assert_eq!(t.value(), None);
        t.sub(Decimal::MAX);
        assert_eq!(t.value(), None);

        let big = Total::starting_at(Decimal::MAX);
        assert_eq!(big.plus(Total::default()).value(), Some(Decimal::MAX));
        assert_eq!(big.plus(big).value(), None);
    }
}
