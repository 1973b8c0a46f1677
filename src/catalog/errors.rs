use thiserror::Error;

use super::snapshot::Oid;

/// Lookup failures against a loaded catalog snapshot.
///
/// The snapshot is total over what it loaded; an unknown oid means the
/// caller is holding a reference that was never part of this snapshot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("no relation with oid {0} in the catalog snapshot")]
    RelationNotFound(Oid),
    #[error("no namespace with oid {0} in the catalog snapshot")]
    NamespaceNotFound(Oid),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
