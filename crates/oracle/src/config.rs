//! Oracle tolerances and tax rates, loadable from TOML.
//!
//! ```toml
//! accounting_tolerance = 0.01
//! tax_tolerance = 0.01
//! inventory_tolerance = 0.001
//!
//! [tax_rates]
//! standard = 0.05
//! luxury = 0.15
//! ```
//!
//! Every key is optional. Entries under `[tax_rates]` are merged over the
//! built-in rates (`standard` 5%, `reduced` 2.5%, `zero` and `exempt` 0%).

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use crate::numeric::decimal;

/// Built-in rates by tax type, as (type, rate in thousandths).
const DEFAULT_TAX_RATES: &[(&str, i64)] = &[
    ("standard", 50),
    ("reduced", 25),
    ("zero", 0),
    ("exempt", 0),
];

/// Tax type assumed for lines that do not declare one.
pub const DEFAULT_TAX_TYPE: &str = "standard";

pub fn default_accounting_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

pub fn default_tax_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

pub fn default_inventory_tolerance() -> Decimal {
    Decimal::new(1, 3)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read oracle config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid oracle config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid oracle config: {0}")]
    Invalid(String),
}

/// A TOML number or numeric string.
#[derive(Deserialize)]
#[serde(untagged)]
enum TomlAmount {
    Number(f64),
    Text(String),
}

impl TomlAmount {
    fn into_decimal<E: serde::de::Error>(self) -> Result<Decimal, E> {
        match self {
            TomlAmount::Number(n) => Ok(decimal(n)),
            TomlAmount::Text(s) => s
                .trim()
                .parse::<Decimal>()
                .map_err(|_| E::custom(format!("'{}' is not a decimal number", s))),
        }
    }
}

fn de_amount<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
    TomlAmount::deserialize(d)?.into_decimal()
}

fn de_rates<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, Decimal>, D::Error> {
    BTreeMap::<String, TomlAmount>::deserialize(d)?
        .into_iter()
        .map(|(k, v)| Ok((k, v.into_decimal()?)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OracleConfig {
    #[serde(deserialize_with = "de_amount")]
    pub accounting_tolerance: Decimal,
    #[serde(deserialize_with = "de_amount")]
    pub tax_tolerance: Decimal,
    #[serde(deserialize_with = "de_amount")]
    pub inventory_tolerance: Decimal,
    /// Overrides and additions to the built-in rates.
    #[serde(deserialize_with = "de_rates")]
    pub tax_rates: BTreeMap<String, Decimal>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig {
            accounting_tolerance: default_accounting_tolerance(),
            tax_tolerance: default_tax_tolerance(),
            inventory_tolerance: default_inventory_tolerance(),
            tax_rates: BTreeMap::new(),
        }
    }
}

impl OracleConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: OracleConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "loaded oracle config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let tolerances = [
            ("accounting_tolerance", self.accounting_tolerance),
            ("tax_tolerance", self.tax_tolerance),
            ("inventory_tolerance", self.inventory_tolerance),
        ];
        for (name, value) in tolerances {
            if value.is_sign_negative() {
                return Err(ConfigError::Invalid(format!("{} must not be negative", name)));
            }
        }
        for (tax_type, rate) in &self.tax_rates {
            if rate.is_sign_negative() || *rate > Decimal::ONE {
                return Err(ConfigError::Invalid(format!(
                    "tax rate '{}' must be between 0 and 1, got {}",
                    tax_type, rate
                )));
            }
        }
        Ok(())
    }

    /// Built-in rates with the configured overrides applied.
    pub fn tax_rates(&self) -> TaxRates {
        let mut rates: BTreeMap<String, Decimal> = DEFAULT_TAX_RATES
            .iter()
            .map(|(k, thousandths)| (k.to_string(), Decimal::new(*thousandths, 3)))
            .collect();
        rates.extend(self.tax_rates.iter().map(|(k, v)| (k.clone(), *v)));
        TaxRates(rates)
    }
}

/// Rate table used by the tax oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxRates(BTreeMap<String, Decimal>);

impl TaxRates {
    /// The rate for `tax_type`, or `None` for a type not in the table.
    pub fn rate(&self, tax_type: &str) -> Option<Decimal> {
        self.0.get(tax_type).copied()
    }
}

impl Default for TaxRates {
    fn default() -> Self {
        OracleConfig::default().tax_rates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = OracleConfig::from_toml("").unwrap();
        assert_eq!(config, OracleConfig::default());
        assert_eq!(config.accounting_tolerance, dec("0.01"));
        assert_eq!(config.inventory_tolerance, dec("0.001"));
        let rates = config.tax_rates();
        assert_eq!(rates.rate("standard"), Some(dec("0.05")));
        assert_eq!(rates.rate("reduced"), Some(dec("0.025")));
        assert_eq!(rates.rate("exempt"), Some(Decimal::ZERO));
        assert_eq!(rates.rate("luxury"), None);
    }

    #[test]
    fn rates_merge_over_builtins() {
        let config = OracleConfig::from_toml(
            "tax_tolerance = 0.05\n[tax_rates]\nstandard = 0.07\nluxury = \"0.15\"\n",
        )
        .unwrap();
        assert_eq!(config.tax_tolerance, dec("0.05"));
        let rates = config.tax_rates();
        assert_eq!(rates.rate("standard"), Some(dec("0.07")));
        assert_eq!(rates.rate("luxury"), Some(dec("0.15")));
        assert_eq!(rates.rate("reduced"), Some(dec("0.025")));
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = OracleConfig::from_toml("[tax_rates]\nstandard = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("tax rate 'standard' must be between 0 and 1"));

        let err = OracleConfig::from_toml("accounting_tolerance = -1\n").unwrap_err();
        assert!(err.to_string().contains("accounting_tolerance must not be negative"));

        assert!(matches!(
            OracleConfig::from_toml("tolerance = 0.1\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
