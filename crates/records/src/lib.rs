//! bptest-records: record types of the six-table universal schema.
//!
//! These are the shapes a Runner produces while executing a business
//! process test (entities, dynamic fields, relationships, transactions and
//! their lines) and the shapes the oracles consume. Everything here is
//! plain data: no record carries behavior beyond small accessors.
//!
//! The single fallible entry point is [`RecordSet::from_json`], which
//! ingests a Runner snapshot and reports structurally impossible input
//! (e.g. `"entities": 5`) as a [`RecordError`].

pub mod deserialize;
pub mod types;

pub use deserialize::RecordError;
pub use types::*;
