//! Immutable in-memory image of the parts of the Postgres system catalog
//! that schema synthesis needs: namespaces, relations, attributes, types
//! and comments.
//!
//! A snapshot is loaded once at startup (see [`super::introspection`]) and
//! then only read. Everything downstream — synthesized schemas, generated
//! SQL — is a pure function of a snapshot, so two runs against the same
//! catalog state produce identical output.

use std::collections::{BTreeMap, HashMap};

use super::errors::{CatalogError, Result};

/// Postgres object identifier. Stable for the lifetime of the object and
/// the only key we ever use for relations and types; names are display
/// data, not identity.
pub type Oid = u32;

/// Subset of `pg_class.relkind` codes that can answer a row query.
///
/// Indexes, sequences, TOAST tables and composite types are filtered out
/// during introspection and never reach a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Table,
    View,
    MaterializedView,
    ForeignTable,
    PartitionedTable,
}

impl RelationKind {
    /// Decode a `relkind` code. Returns `None` for kinds we do not serve.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            b'r' => Some(RelationKind::Table),
            b'v' => Some(RelationKind::View),
            b'm' => Some(RelationKind::MaterializedView),
            b'f' => Some(RelationKind::ForeignTable),
            b'p' => Some(RelationKind::PartitionedTable),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Table => "table",
            RelationKind::View => "view",
            RelationKind::MaterializedView => "materialized view",
            RelationKind::ForeignTable => "foreign table",
            RelationKind::PartitionedTable => "partitioned table",
        }
    }
}

/// One row of `pg_namespace`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub oid: Oid,
    pub name: String,
}

/// One servable row of `pg_class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationClass {
    pub oid: Oid,
    pub name: String,
    pub namespace: Oid,
    pub kind: RelationKind,
}

/// One row of `pg_attribute` for a served relation.
///
/// Dropped columns are kept here on purpose: `ordinal` mirrors `attnum`,
/// and attnums are never reused, so the gaps carry information. Filtering
/// happens at synthesis time, not load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub relation: Oid,
    /// `attnum`; strictly positive for user columns.
    pub ordinal: i16,
    pub name: String,
    pub type_oid: Oid,
    pub dropped: bool,
}

/// One row of `pg_type`, trimmed to what type mapping needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgTypeEntry {
    pub oid: Oid,
    pub name: String,
    pub namespace: Oid,
    /// `typcategory` code, e.g. `A` for arrays, `E` for enums.
    pub category: u8,
    /// `typelem`: element type for arrays, 0 otherwise.
    pub element: Oid,
}

impl PgTypeEntry {
    pub fn is_array(&self) -> bool {
        self.category == b'A' && self.element != 0
    }
}

/// Which system catalog a `pg_description` row annotates. We only load
/// comments on classes (relations and their columns) and on types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptionCatalog {
    Class,
    Type,
}

/// The frozen catalog image. Construct via [`CatalogSnapshot::builder`].
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    namespaces: HashMap<Oid, Namespace>,
    // BTreeMap so iteration is in ascending-oid order without sorting.
    relations: BTreeMap<Oid, RelationClass>,
    attributes: HashMap<Oid, Vec<Attribute>>,
    types: HashMap<Oid, PgTypeEntry>,
    descriptions: HashMap<(DescriptionCatalog, Oid, i32), String>,
}

impl CatalogSnapshot {
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    pub fn relation(&self, oid: Oid) -> Result<&RelationClass> {
        self.relations
            .get(&oid)
            .ok_or(CatalogError::RelationNotFound(oid))
    }

    pub fn namespace(&self, oid: Oid) -> Result<&Namespace> {
        self.namespaces
            .get(&oid)
            .ok_or(CatalogError::NamespaceNotFound(oid))
    }

    /// All attributes of a relation in `attnum` order, dropped ones
    /// included. Empty slice for a relation with no attribute rows.
    pub fn attributes(&self, relation: Oid) -> &[Attribute] {
        self.attributes
            .get(&relation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn pg_type(&self, oid: Oid) -> Option<&PgTypeEntry> {
        self.types.get(&oid)
    }

    /// Comment text for `(catalog, oid, subid)`, where `subid` is the
    /// column number for column comments and 0 for the object itself.
    pub fn description(&self, catalog: DescriptionCatalog, oid: Oid, subid: i32) -> Option<&str> {
        self.descriptions
            .get(&(catalog, oid, subid))
            .map(String::as_str)
    }

    /// All servable relations in ascending-oid order.
    pub fn relations(&self) -> impl Iterator<Item = &RelationClass> {
        self.relations.values()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }
}

/// Accumulates catalog rows and freezes them into a [`CatalogSnapshot`].
///
/// Row order does not matter; `build` sorts attributes by ordinal so the
/// snapshot's ordering guarantees hold regardless of how rows arrived.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    snapshot: CatalogSnapshot,
}

impl SnapshotBuilder {
    pub fn add_namespace(&mut self, oid: Oid, name: impl Into<String>) -> &mut Self {
        self.snapshot
            .namespaces
            .insert(oid, Namespace { oid, name: name.into() });
        self
    }

    pub fn add_relation(
        &mut self,
        oid: Oid,
        name: impl Into<String>,
        namespace: Oid,
        kind: RelationKind,
    ) -> &mut Self {
        self.snapshot.relations.insert(
            oid,
            RelationClass { oid, name: name.into(), namespace, kind },
        );
        self
    }

    pub fn add_attribute(
        &mut self,
        relation: Oid,
        ordinal: i16,
        name: impl Into<String>,
        type_oid: Oid,
        dropped: bool,
    ) -> &mut Self {
        self.snapshot.attributes.entry(relation).or_default().push(Attribute {
            relation,
            ordinal,
            name: name.into(),
            type_oid,
            dropped,
        });
        self
    }

    pub fn add_type(
        &mut self,
        oid: Oid,
        name: impl Into<String>,
        namespace: Oid,
        category: u8,
        element: Oid,
    ) -> &mut Self {
        self.snapshot.types.insert(
            oid,
            PgTypeEntry { oid, name: name.into(), namespace, category, element },
        );
        self
    }

    pub fn add_description(
        &mut self,
        catalog: DescriptionCatalog,
        oid: Oid,
        subid: i32,
        text: impl Into<String>,
    ) -> &mut Self {
        self.snapshot
            .descriptions
            .insert((catalog, oid, subid), text.into());
        self
    }

    pub fn build(mut self) -> CatalogSnapshot {
        for attrs in self.snapshot.attributes.values_mut() {
            attrs.sort_by_key(|a| a.ordinal);
        }
        self.snapshot
    }
}
