//! The run-scoped variable store that template expressions resolve against.
//!
//! A [`RunContext`] belongs to exactly one parse/execution run. It is seeded
//! with `timestamp`, `test_org_id` and `clock`, grows as actions declare
//! `store_as`, and is dropped when the run ends. Nothing here is global.

use std::collections::BTreeMap;

use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::model::BusinessProcessTest;

/// Parse an RFC 3339 instant (e.g. `2025-01-01T00:00:00.000Z`).
pub fn parse_instant(s: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(s.trim(), &Rfc3339).ok()
}

/// Render an instant as UTC with millisecond precision: `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn format_instant(instant: OffsetDateTime) -> Option<String> {
    let fmt = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    );
    instant.to_offset(UtcOffset::UTC).format(&fmt).ok()
}

fn unix_millis(instant: OffsetDateTime) -> i64 {
    (instant.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Knobs for a parse run.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Instant treated as "now" for the run timestamp and the default clock.
    /// Defaults to the system time.
    pub now: Option<OffsetDateTime>,
}

impl ParseOptions {
    pub fn at(now: OffsetDateTime) -> Self {
        ParseOptions { now: Some(now) }
    }

    fn now(&self) -> OffsetDateTime {
        self.now.unwrap_or_else(OffsetDateTime::now_utc)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    vars: BTreeMap<String, Value>,
    timestamp_ms: i64,
}

impl RunContext {
    /// An empty context whose captured run timestamp is `timestamp_ms`.
    pub fn new(timestamp_ms: i64) -> Self {
        RunContext {
            vars: BTreeMap::new(),
            timestamp_ms,
        }
    }

    /// A context seeded with `timestamp`, `test_org_id` and `clock`.
    pub fn seeded(test_org_id: &str, clock: impl Into<String>, timestamp_ms: i64) -> Self {
        let mut ctx = RunContext::new(timestamp_ms);
        ctx.insert("timestamp", Value::from(timestamp_ms));
        ctx.insert("test_org_id", Value::from(test_org_id));
        ctx.insert("clock", Value::String(clock.into()));
        ctx
    }

    /// Fresh context for one run of `test`. The document's `context.clock`
    /// wins over the options' "now".
    pub fn for_test(test: &BusinessProcessTest, options: &ParseOptions) -> Self {
        let now = options.now();
        let clock = test
            .context
            .clock
            .clone()
            .or_else(|| format_instant(now))
            .unwrap_or_default();
        RunContext::seeded(&test.context.organization_id, clock, unix_millis(now))
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.vars.insert(name.into(), value)
    }

    /// Store an action result. When both the existing binding and the new
    /// value are objects the keys are merged (new keys win); otherwise the
    /// value replaces the binding.
    pub fn store(&mut self, name: &str, value: Value) {
        match (self.vars.get_mut(name), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                existing.extend(incoming);
            }
            (_, value) => {
                self.vars.insert(name.to_string(), value);
            }
        }
    }

    pub fn vars(&self) -> &BTreeMap<String, Value> {
        &self.vars
    }

    /// The `clock` variable as an instant, if it holds an RFC 3339 string
    /// or an epoch-millisecond number.
    pub fn clock(&self) -> Option<OffsetDateTime> {
        match self.vars.get("clock")? {
            Value::String(s) => parse_instant(s),
            Value::Number(n) => {
                let ms = n.as_i64()?;
                OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()
            }
            _ => None,
        }
    }

    /// Walk `a.b.c`: the first segment names a variable, the rest are object
    /// keys or array indices.
    ///
    /// `None` means some segment was not found. A path that exists and holds
    /// JSON `null` returns `Some(&Value::Null)`.
    pub fn lookup_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.vars.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn seeded_context_has_run_variables() {
        let ctx = RunContext::seeded("org-1", "2025-01-01T00:00:00.000Z", 1_735_689_600_000);
        assert_eq!(ctx.get("test_org_id"), Some(&json!("org-1")));
        assert_eq!(ctx.get("timestamp"), Some(&json!(1_735_689_600_000i64)));
        assert_eq!(ctx.clock(), Some(datetime!(2025-01-01 0:00 UTC)));
    }

    #[test]
    fn format_instant_uses_millisecond_utc() {
        let t = datetime!(2025-03-04 05:06:07.089 +02:00);
        assert_eq!(format_instant(t).unwrap(), "2025-03-04T03:06:07.089Z");
    }

    #[test]
    fn lookup_path_distinguishes_missing_from_null() {
        let mut ctx = RunContext::new(0);
        ctx.insert("customer", json!({ "id": "C1", "tier": null, "tags": ["vip"] }));
        assert_eq!(ctx.lookup_path("customer.id"), Some(&json!("C1")));
        assert_eq!(ctx.lookup_path("customer.tier"), Some(&Value::Null));
        assert_eq!(ctx.lookup_path("customer.tags.0"), Some(&json!("vip")));
        assert_eq!(ctx.lookup_path("customer.email"), None);
        assert_eq!(ctx.lookup_path("customer.id.length"), None);
        assert_eq!(ctx.lookup_path("vendor.id"), None);
    }

    #[test]
    fn store_merges_objects_and_replaces_scalars() {
        let mut ctx = RunContext::new(0);
        ctx.insert("customer", json!({ "entity_name": "Jane" }));
        ctx.store("customer", json!({ "id": "ent-1" }));
        assert_eq!(
            ctx.get("customer"),
            Some(&json!({ "entity_name": "Jane", "id": "ent-1" }))
        );
        ctx.store("customer", json!("ent-2"));
        assert_eq!(ctx.get("customer"), Some(&json!("ent-2")));
    }
}
