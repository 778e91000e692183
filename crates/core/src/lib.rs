//! bptest-core: business process test documents.
//!
//! Text goes through three stages:
//!
//! - [`schema::validate`] -- structural validation of the deserialized tree,
//!   collecting every violation and applying defaults
//! - [`TemplateResolver`] -- `{{expression}}` expansion against a [`RunContext`]
//! - [`parse_document`] -- the two above in sequence, resolving setup, steps
//!   and cleanup in declared order
//!
//! [`runner`] defines the boundary to whatever executes the resolved actions.

pub mod context;
pub mod document;
pub mod error;
pub mod model;
mod resolve;
pub mod runner;
pub mod schema;
pub mod template;

// ── Convenience re-exports ───────────────────────────────────────────

pub use context::{ParseOptions, RunContext};
pub use document::{
    extract_metadata, parse_document, parse_document_with, parse_with_context, validate_text,
    ParsedDocument, TestSummary, ValidationOutcome,
};
pub use error::{ParseError, SchemaViolation};
pub use model::{Action, AssertionGroup, BusinessCheck, BusinessProcessTest};
pub use runner::{execute_plan, ActionExecutor, ActionScope, ExecutionError, ExecutionReport};
pub use template::TemplateResolver;
