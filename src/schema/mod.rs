//! Per-relation schema synthesis: response record types and filter
//! condition types, derived from a catalog snapshot at startup.

pub mod condition_model;
pub mod errors;
pub mod naming;
pub mod response_model;

pub use condition_model::{
    apply_limit_cap, operator_set, synthesize_condition_model, ComparisonOp, ConditionParam,
    ConditionSchema, ConditionValue, FilledCondition, ResolvedConditions,
};
pub use errors::{InputError, SynthesisError};
pub use naming::{to_lower_camel, to_pascal_case};
pub use response_model::{synthesize_response_model, FieldSpec, ResponseSchema};

use crate::catalog::{CatalogSnapshot, DescriptionCatalog, Oid, RelationKind};

/// Everything serving needs to know about one relation, synthesized once
/// at bind time and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedSchema {
    pub oid: Oid,
    pub namespace: String,
    pub name: String,
    pub kind: RelationKind,
    /// Relation comment from `pg_description`, if any.
    pub doc: Option<String>,
    pub response: ResponseSchema,
    pub condition: ConditionSchema,
}

impl SynthesizedSchema {
    pub fn display_name(&self) -> &str {
        &self.response.display_name
    }
}

/// Synthesize the complete serving schema for one relation.
pub fn synthesize(
    snapshot: &CatalogSnapshot,
    oid: Oid,
) -> Result<SynthesizedSchema, SynthesisError> {
    let relation = snapshot.relation(oid)?;
    let namespace = snapshot.namespace(relation.namespace)?;
    let response = synthesize_response_model(snapshot, oid)?;
    let condition = synthesize_condition_model(snapshot, oid, &response)?;
    Ok(SynthesizedSchema {
        oid,
        namespace: namespace.name.clone(),
        name: relation.name.clone(),
        kind: relation.kind,
        doc: snapshot
            .description(DescriptionCatalog::Class, oid, 0)
            .map(str::to_string),
        response,
        condition,
    })
}
