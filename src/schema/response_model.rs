//! Response record synthesis: one record type per relation, derived from
//! live catalog attributes.

use crate::catalog::{
    display_type_name, map_type, CatalogSnapshot, DescriptionCatalog, Oid, SemanticType,
};

use super::errors::SynthesisError;
use super::naming::to_pascal_case;

/// One response field, mirroring one live column.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Raw `attname`; response JSON keys are never recased.
    pub name: String,
    /// `attnum`; fields are ordered by this, ascending.
    pub ordinal: i16,
    pub type_oid: Oid,
    /// Display name of the SQL type, e.g. `int8`, `public.mood`, `text[]`.
    pub type_name: String,
    pub semantic: SemanticType,
    /// Column comment, falling back to the comment on the column's type.
    pub doc: Option<String>,
}

/// The synthesized record type for a relation's rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    /// PascalCase name, e.g. `OrderItems` for `order_items`.
    pub display_name: String,
    pub fields: Vec<FieldSpec>,
}

impl ResponseSchema {
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Build the response record type for one relation.
///
/// Dropped columns are excluded; everything else is kept, with unmapped
/// types degrading to text rather than failing the relation. A relation
/// whose live columns have all been dropped has nothing to serve and is
/// the one per-relation failure here.
pub fn synthesize_response_model(
    snapshot: &CatalogSnapshot,
    oid: Oid,
) -> Result<ResponseSchema, SynthesisError> {
    let relation = snapshot.relation(oid)?;
    let namespace = snapshot.namespace(relation.namespace)?;

    let mut fields = Vec::new();
    for attr in snapshot.attributes(oid) {
        if attr.dropped {
            continue;
        }
        let semantic = map_type(snapshot, attr.type_oid);
        if semantic == SemanticType::Opaque {
            log::warn!(
                "column {}.{}.{} has unmapped type {} (oid {}), serving as text",
                namespace.name,
                relation.name,
                attr.name,
                display_type_name(snapshot, attr.type_oid),
                attr.type_oid,
            );
        }
        let doc = snapshot
            .description(DescriptionCatalog::Class, oid, i32::from(attr.ordinal))
            .or_else(|| snapshot.description(DescriptionCatalog::Type, attr.type_oid, 0))
            .map(str::to_string);
        fields.push(FieldSpec {
            name: attr.name.clone(),
            ordinal: attr.ordinal,
            type_oid: attr.type_oid,
            type_name: display_type_name(snapshot, attr.type_oid),
            semantic,
            doc,
        });
    }

    if fields.is_empty() {
        return Err(SynthesisError::EmptyRelation {
            relation: format!("{}.{}", namespace.name, relation.name),
        });
    }

    Ok(ResponseSchema {
        display_name: to_pascal_case(&relation.name),
        fields,
    })
}
