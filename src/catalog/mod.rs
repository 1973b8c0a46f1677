//! Postgres catalog introspection and the frozen snapshot model.

pub mod errors;
pub mod introspection;
pub mod snapshot;
pub mod type_map;

pub use errors::CatalogError;
pub use introspection::{load_snapshot, IntrospectionError};
pub use snapshot::{
    Attribute, CatalogSnapshot, DescriptionCatalog, Namespace, Oid, PgTypeEntry, RelationClass,
    RelationKind, SnapshotBuilder,
};
pub use type_map::{display_type_name, map_type, SemanticType};
