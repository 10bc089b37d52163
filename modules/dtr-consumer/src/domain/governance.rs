//! Usage-policy model and governance matching.
//!
//! Governance maps a semantic id to the set of ODRL policies acceptable for
//! fetching that aspect's data. Matching is an exact structural comparison
//! of action, constraint operator and right-operand value; there is no
//! partial credit.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Acceptable policies per semantic id.
pub type Governance = HashMap<String, Vec<OdrlPolicy>>;

/// A JSON-LD id reference, e.g. `{"@id": "odrl:use"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    #[serde(rename = "@id")]
    pub id: String,
}

impl IdRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// One atomic usage constraint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(rename = "odrl:leftOperand")]
    pub left_operand: IdRef,
    #[serde(rename = "odrl:operator")]
    pub operator: IdRef,
    #[serde(rename = "odrl:rightOperand")]
    pub right_operand: serde_json::Value,
}

/// Conjunction of atomic constraints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintGroup {
    #[serde(rename = "odrl:and", default)]
    pub and: Vec<Constraint>,
}

/// The permission granted by a policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(rename = "odrl:action")]
    pub action: IdRef,
    #[serde(rename = "odrl:constraint", default)]
    pub constraint: ConstraintGroup,
}

/// An ODRL usage policy as presented by connector catalogs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OdrlPolicy {
    #[serde(rename = "odrl:permission")]
    pub permission: Permission,
    #[serde(rename = "odrl:prohibition", default)]
    pub prohibition: Vec<serde_json::Value>,
    #[serde(rename = "odrl:obligation", default)]
    pub obligation: Vec<serde_json::Value>,
}

impl OdrlPolicy {
    /// A policy granting one action under the given constraints.
    pub fn new(action: impl Into<String>, constraints: Vec<Constraint>) -> Self {
        Self {
            permission: Permission {
                action: IdRef::new(action),
                constraint: ConstraintGroup { and: constraints },
            },
            prohibition: Vec::new(),
            obligation: Vec::new(),
        }
    }
}

/// Whether `candidate` satisfies `accepted`: same action, and the same
/// constraint set (order-insensitive, compared on operand, operator and
/// right-operand value).
#[must_use]
pub fn policy_matches(candidate: &OdrlPolicy, accepted: &OdrlPolicy) -> bool {
    if candidate.permission.action != accepted.permission.action {
        return false;
    }
    let candidate_constraints = &candidate.permission.constraint.and;
    let accepted_constraints = &accepted.permission.constraint.and;
    candidate_constraints.len() == accepted_constraints.len()
        && accepted_constraints
            .iter()
            .all(|c| candidate_constraints.contains(c))
}

/// Whether the governance map accepts `candidate` for `semantic_id`.
///
/// An absent semantic id is the distinct "ungoverned" case; use
/// [`Governance::contains_key`] to tell it apart from a policy mismatch.
#[must_use]
pub fn matches(semantic_id: &str, candidate: &OdrlPolicy, governance: &Governance) -> bool {
    governance
        .get(semantic_id)
        .is_some_and(|accepted| accepted.iter().any(|p| policy_matches(candidate, p)))
}
