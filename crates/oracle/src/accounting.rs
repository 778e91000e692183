//! Double-entry balance: assets = liabilities + equity.
//!
//! Each GL account's balance is the signed sum of the transaction lines that
//! reference it. Whether a line increases or decreases an account depends on
//! the account's category and on the debit markers in the line's smart code.

use std::collections::BTreeMap;

use bptest_records::{EntityData, TransactionData, TransactionLineData};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::numeric::{decimal, round2, Total};
use crate::smart_code::has_segment;

/// Smart-code segments that put a line on the debit side.
const DEBIT_MARKERS: &[&str] = &["DEBIT", "DR", "INCREASE", "EXPENSE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asset" | "assets" => Some(AccountType::Asset),
            "liability" | "liabilities" => Some(AccountType::Liability),
            "equity" => Some(AccountType::Equity),
            "revenue" | "income" => Some(AccountType::Revenue),
            "expense" | "expenses" => Some(AccountType::Expense),
            _ => None,
        }
    }

    fn from_smart_code(code: &str) -> Option<Self> {
        if has_segment(code, "ASSET") {
            Some(AccountType::Asset)
        } else if has_segment(code, "LIABILITY") || has_segment(code, "LIAB") {
            Some(AccountType::Liability)
        } else if has_segment(code, "EQUITY") {
            Some(AccountType::Equity)
        } else if has_segment(code, "REVENUE") {
            Some(AccountType::Revenue)
        } else if has_segment(code, "EXPENSE") {
            Some(AccountType::Expense)
        } else {
            None
        }
    }

    /// `metadata.account_type`, else a category segment in the smart code.
    pub fn of(account: &EntityData) -> Option<Self> {
        account
            .metadata_field("account_type")
            .and_then(|v| v.as_str())
            .and_then(AccountType::from_name)
            .or_else(|| AccountType::from_smart_code(&account.smart_code))
    }

    /// Asset and expense accounts grow with debits; the rest with credits.
    fn debit_normal(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }
}

pub fn is_debit_line(line: &TransactionLineData) -> bool {
    DEBIT_MARKERS.iter().any(|m| has_segment(&line.smart_code, m))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountBalance {
    pub account_id: String,
    pub account_name: String,
    pub account_type: AccountType,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountingVerdict {
    pub valid: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub assets: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub liabilities: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub equity: Decimal,
    /// |assets - (liabilities + equity)|
    #[serde(with = "rust_decimal::serde::float")]
    pub difference: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tolerance: Decimal,
    pub accounts: Vec<AccountBalance>,
    /// Accounts whose category could not be determined; they do not count.
    pub unclassified_accounts: Vec<String>,
    /// Set when a balance or total left the decimal range. The verdict is then invalid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overflow: Option<String>,
}

pub fn check_accounting_equation(
    accounts: &[EntityData],
    transactions: &[TransactionData],
    tolerance: Decimal,
) -> AccountingVerdict {
    let mut unclassified = Vec::new();
    let mut balances: BTreeMap<&str, (AccountType, Total)> = BTreeMap::new();
    for account in accounts {
        match AccountType::of(account) {
            Some(t) => {
                balances.insert(account.id.as_str(), (t, Total::default()));
            }
            None => {
                tracing::warn!(account = %account.id, "GL account has no recognisable category");
                unclassified.push(account.id.clone());
            }
        }
    }

    for txn in transactions {
        for line in txn.lines() {
            let Some(id) = line.line_entity_id.as_deref() else {
                continue;
            };
            let Some((account_type, balance)) = balances.get_mut(id) else {
                continue;
            };
            let amount = decimal(line.line_amount);
            if is_debit_line(line) == account_type.debit_normal() {
                balance.add(amount);
            } else {
                balance.sub(amount);
            }
        }
    }

    let total = |wanted: AccountType| -> Total {
        balances
            .values()
            .filter(|(t, _)| *t == wanted)
            .fold(Total::default(), |acc, (_, b)| acc.plus(*b))
    };
    let assets = total(AccountType::Asset);
    let liabilities = total(AccountType::Liability);
    let equity = total(AccountType::Equity);

    let out_of_range: Vec<&str> = balances
        .iter()
        .filter(|(_, (_, b))| b.value().is_none())
        .map(|(id, _)| *id)
        .collect();
    let difference = match (assets.value(), liabilities.plus(equity).value()) {
        (Some(a), Some(claims)) => a.checked_sub(claims).map(|d| d.abs()),
        _ => None,
    };
    let overflow = match difference {
        Some(_) => None,
        None if out_of_range.is_empty() => {
            Some("category totals exceed the decimal range".to_string())
        }
        None => Some(format!(
            "balances exceed the decimal range: {}",
            out_of_range.join(", ")
        )),
    };

    let accounts_out = accounts
        .iter()
        .filter_map(|a| {
            let (account_type, balance) = balances.get(a.id.as_str())?;
            Some(AccountBalance {
                account_id: a.id.clone(),
                account_name: a.entity_name.clone(),
                account_type: *account_type,
                balance: round2(balance.value().unwrap_or(Decimal::ZERO)),
            })
        })
        .collect();

    let valid = difference.is_some_and(|d| d <= tolerance);
    let reported = |t: Total| round2(t.value().unwrap_or(Decimal::ZERO));
    tracing::debug!(
        assets = ?assets.value(),
        liabilities = ?liabilities.value(),
        equity = ?equity.value(),
        valid,
        "accounting equation evaluated"
    );

    AccountingVerdict {
        valid,
        assets: reported(assets),
        liabilities: reported(liabilities),
        equity: reported(equity),
        difference: round2(difference.unwrap_or(Decimal::ZERO)),
        tolerance,
        accounts: accounts_out,
        unclassified_accounts: unclassified,
        overflow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn account(id: &str, account_type: &str) -> EntityData {
        let mut e = EntityData::new(id, "gl_account", id, "HERA.FIN.GL.ACC.GL.v1");
        e.metadata = Some(json!({ "account_type": account_type }));
        e
    }

    fn line(n: u32, account: &str, amount: f64, side: &str) -> TransactionLineData {
        let mut l = TransactionLineData::new(
            format!("l{}", n),
            n,
            amount,
            format!("HERA.FIN.GL.LINE.{}.v1", side),
        );
        l.line_entity_id = Some(account.to_string());
        l
    }

    fn journal(lines: Vec<TransactionLineData>) -> TransactionData {
        let mut t = TransactionData::new("je-1", "journal_entry", "HERA.FIN.GL.TXN.JE.v1");
        t.line_items = Some(lines);
        t
    }

    #[test]
    fn owner_investment_balances() {
        let accounts = [account("cash", "asset"), account("capital", "equity")];
        let txns = [journal(vec![
            line(1, "cash", 1000.0, "DEBIT"),
            line(2, "capital", 1000.0, "CREDIT"),
        ])];
        let v = check_accounting_equation(&accounts, &txns, dec("0.01"));
        assert!(v.valid);
        assert_eq!(v.assets, dec("1000"));
        assert_eq!(v.equity, dec("1000"));
        assert_eq!(v.liabilities, Decimal::ZERO);
        assert_eq!(v.difference, Decimal::ZERO);
    }

    #[test]
    fn short_equity_is_unbalanced_by_the_gap() {
        let accounts = [account("cash", "asset"), account("capital", "equity")];
        let txns = [journal(vec![
            line(1, "cash", 1000.0, "DEBIT"),
            line(2, "capital", 900.0, "CREDIT"),
        ])];
        let v = check_accounting_equation(&accounts, &txns, dec("0.01"));
        assert!(!v.valid);
        assert_eq!(v.difference, dec("100"));
    }

    #[test]
    fn credits_reduce_assets_and_debits_reduce_liabilities() {
        let accounts = [account("cash", "asset"), account("loan", "liability")];
        let txns = [
            journal(vec![line(1, "cash", 500.0, "DR"), line(2, "loan", 500.0, "CR")]),
            journal(vec![line(1, "loan", 200.0, "DEBIT"), line(2, "cash", 200.0, "CREDIT")]),
        ];
        let v = check_accounting_equation(&accounts, &txns, dec("0.01"));
        assert!(v.valid);
        assert_eq!(v.assets, dec("300"));
        assert_eq!(v.liabilities, dec("300"));
    }

    #[test]
    fn category_falls_back_to_smart_code_and_unknown_lines_are_ignored() {
        let cash = EntityData::new("cash", "gl_account", "Cash", "HERA.FIN.GL.ASSET.CASH.v1");
        let mystery = EntityData::new("x", "gl_account", "Suspense", "HERA.FIN.GL.ACC.SUSP.v1");
        let txns = [journal(vec![
            line(1, "cash", 10.0, "DEBIT"),
            line(2, "nowhere", 10.0, "CREDIT"),
            line(3, "x", 99.0, "DEBIT"),
        ])];
        let v = check_accounting_equation(&[cash, mystery], &txns, dec("0.01"));
        assert_eq!(v.assets, dec("10"));
        assert!(!v.valid);
        assert_eq!(v.unclassified_accounts, vec!["x"]);
        assert_eq!(v.accounts.len(), 1);
    }

    #[test]
    fn tolerance_absorbs_rounding_noise() {
        let accounts = [account("cash", "asset"), account("capital", "equity")];
        let txns = [journal(vec![
            line(1, "cash", 100.005, "DEBIT"),
            line(2, "capital", 100.0, "CREDIT"),
        ])];
        assert!(check_accounting_equation(&accounts, &txns, dec("0.01")).valid);
        assert!(!check_accounting_equation(&accounts, &txns, dec("0.001")).valid);
    }

    #[test]
    fn balance_beyond_decimal_range_is_an_invalid_verdict() {
        let accounts = [account("cash", "asset")];
        let txns = [journal(vec![
            line(1, "cash", 5e28, "DEBIT"),
            line(2, "cash", 5e28, "DEBIT"),
            line(3, "cash", 5e28, "DEBIT"),
        ])];
        let v = check_accounting_equation(&accounts, &txns, dec("0.01"));
        assert!(!v.valid);
        assert_eq!(
            v.overflow.as_deref(),
            Some("balances exceed the decimal range: cash")
        );
        assert_eq!(v.assets, Decimal::ZERO);

        let json = serde_json::to_value(&v).unwrap();
        assert!(json["overflow"].is_string());
        let ok = check_accounting_equation(&[], &[], dec("0.01"));
        assert!(serde_json::to_value(&ok).unwrap().get("overflow").is_none());
    }

    #[test]
    fn category_sum_beyond_decimal_range_is_an_invalid_verdict() {
        let accounts = [account("cash", "asset"), account("bank", "asset")];
        let txns = [journal(vec![
            line(1, "cash", 5e28, "DEBIT"),
            line(2, "bank", 5e28, "DEBIT"),
        ])];
        let v = check_accounting_equation(&accounts, &txns, dec("0.01"));
        assert!(!v.valid);
        assert_eq!(
            v.overflow.as_deref(),
            Some("category totals exceed the decimal range")
        );
        assert_eq!(v.accounts[0].balance, dec("50000000000000000000000000000"));
    }

    #[test]
    fn verdict_serializes_amounts_as_numbers() {
        let v = check_accounting_equation(&[], &[], dec("0.01"));
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["valid"], json!(true));
        assert!(json["difference"].is_number());
        assert!(json["tolerance"].is_number());
    }
}
