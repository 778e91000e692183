//! Tenant isolation: every record, and both ends of every relationship,
//! belong to the target organization.

use bptest_records::{EntityData, RelationshipData, TransactionData};
use serde::Serialize;

use crate::smart_code::RecordKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenancyViolation {
    pub record_type: RecordKind,
    pub id: String,
    /// Organization the offending record (or endpoint) belongs to, if known.
    pub organization_id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenancyVerdict {
    pub valid: bool,
    pub organization_id: String,
    pub checked: usize,
    pub violations: Vec<TenancyViolation>,
}

enum Owner<'a> {
    Found(Option<&'a str>),
    Missing,
}

/// Owning organization of a relationship endpoint. Endpoints are usually
/// entities; status edges may also leave a transaction.
fn endpoint_owner<'a>(
    id: &str,
    entities: &'a [EntityData],
    transactions: &'a [TransactionData],
) -> Owner<'a> {
    if let Some(e) = entities.iter().find(|e| e.id == id) {
        return Owner::Found(e.organization_id.as_deref());
    }
    if let Some(t) = transactions.iter().find(|t| t.id == id) {
        return Owner::Found(t.organization_id.as_deref());
    }
    Owner::Missing
}

fn record_violation(
    kind: RecordKind,
    id: &str,
    org: Option<&str>,
    target: &str,
) -> Option<TenancyViolation> {
    let reason = match org {
        Some(o) if o == target => return None,
        Some(o) => format!("belongs to organization '{}'", o),
        None => "has no organization_id".to_string(),
    };
    Some(TenancyViolation {
        record_type: kind,
        id: id.to_string(),
        organization_id: org.map(str::to_string),
        reason,
    })
}

pub fn check_tenant_isolation(
    organization_id: &str,
    entities: &[EntityData],
    transactions: &[TransactionData],
    relationships: &[RelationshipData],
) -> TenancyVerdict {
    let mut violations = Vec::new();

    for e in entities {
        violations.extend(record_violation(
            RecordKind::Entity,
            &e.id,
            e.organization_id.as_deref(),
            organization_id,
        ));
    }
    for t in transactions {
        violations.extend(record_violation(
            RecordKind::Transaction,
            &t.id,
            t.organization_id.as_deref(),
            organization_id,
        ));
    }

    for r in relationships {
        if let Some(own) = r.organization_id.as_deref().filter(|o| *o != organization_id) {
            violations.push(TenancyViolation {
                record_type: RecordKind::Relationship,
                id: r.id.clone(),
                organization_id: Some(own.to_string()),
                reason: format!("belongs to organization '{}'", own),
            });
        }
        for (end, endpoint) in [("from", &r.from_entity_id), ("to", &r.to_entity_id)] {
            let (org, reason) = match endpoint_owner(endpoint, entities, transactions) {
                Owner::Found(Some(o)) if o == organization_id => continue,
                Owner::Found(Some(o)) => (
                    Some(o.to_string()),
                    format!("{} endpoint '{}' belongs to organization '{}'", end, endpoint, o),
                ),
                Owner::Found(None) => (
                    None,
                    format!("{} endpoint '{}' has no organization_id", end, endpoint),
                ),
                Owner::Missing => (
                    None,
                    format!("{} endpoint '{}' is not among the supplied records", end, endpoint),
                ),
            };
            violations.push(TenancyViolation {
                record_type: RecordKind::Relationship,
                id: r.id.clone(),
                organization_id: org,
                reason,
            });
        }
    }

    tracing::debug!(
        organization = organization_id,
        violations = violations.len(),
        "tenant isolation evaluated"
    );
    TenancyVerdict {
        valid: violations.is_empty(),
        organization_id: organization_id.to_string(),
        checked: entities.len() + transactions.len() + relationships.len(),
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, org: Option<&str>) -> EntityData {
        let mut e = EntityData::new(id, "customer", id, "HERA.RETAIL.CRM.ENT.CUST.v1");
        e.organization_id = org.map(str::to_string);
        e
    }

    fn rel(id: &str, from: &str, to: &str) -> RelationshipData {
        RelationshipData::new(id, from, to, "customer_of", "HERA.RETAIL.CRM.REL.LINK.v1")
    }

    #[test]
    fn isolated_records_pass() {
        let entities = [entity("a", Some("org-1")), entity("b", Some("org-1"))];
        let v = check_tenant_isolation("org-1", &entities, &[], &[rel("r", "a", "b")]);
        assert!(v.valid, "{:?}", v.violations);
        assert_eq!(v.checked, 3);
    }

    #[test]
    fn one_foreign_endpoint_taints_the_relationship() {
        let entities = [entity("a", Some("org-2")), entity("b", Some("org-1"))];
        let v = check_tenant_isolation("org-1", &entities, &[], &[rel("r", "a", "b")]);
        assert!(!v.valid);
        let rel_violations: Vec<&TenancyViolation> = v
            .violations
            .iter()
            .filter(|x| x.record_type == RecordKind::Relationship)
            .collect();
        assert_eq!(rel_violations.len(), 1);
        assert_eq!(rel_violations[0].id, "r");
        assert_eq!(rel_violations[0].organization_id.as_deref(), Some("org-2"));
        assert_eq!(rel_violations[0].reason, "from endpoint 'a' belongs to organization 'org-2'");
    }

    #[test]
    fn missing_organization_and_unknown_endpoints_are_flagged() {
        let mut txn = TransactionData::new("t1", "sale", "HERA.RETAIL.POS.TXN.SALE.v1");
        txn.organization_id = Some("org-1".to_string());
        let entities = [entity("a", None)];
        let v = check_tenant_isolation("org-1", &entities, &[txn], &[rel("r", "t1", "ghost")]);
        let reasons: Vec<&str> = v.violations.iter().map(|x| x.reason.as_str()).collect();
        assert_eq!(
            reasons,
            vec!["has no organization_id", "to endpoint 'ghost' is not among the supplied records"]
        );
    }

    #[test]
    fn relationship_owned_by_another_org_is_flagged() {
        let entities = [entity("a", Some("org-1")), entity("b", Some("org-1"))];
        let mut r = rel("r", "a", "b");
        r.organization_id = Some("org-3".to_string());
        let v = check_tenant_isolation("org-1", &entities, &[], &[r]);
        assert_eq!(v.violations.len(), 1);
        assert_eq!(v.violations[0].reason, "belongs to organization 'org-3'");
    }
}
