use thiserror::Error;

use crate::catalog::{CatalogError, Oid};

/// Why a relation could not be turned into a servable schema.
///
/// Synthesis failures are per-relation: one of these marks a single
/// relation unavailable and never takes the rest of the registry down.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("relation oid {0} is not in the catalog snapshot")]
    RelationNotFound(Oid),
    #[error("namespace oid {0} is not in the catalog snapshot")]
    NamespaceNotFound(Oid),
    #[error("relation {relation} has no live columns")]
    EmptyRelation { relation: String },
    #[error(
        "relations {first} and {second} in schema {namespace} both map to type name {display_name}"
    )]
    DisplayNameCollision {
        namespace: String,
        display_name: String,
        first: String,
        second: String,
    },
    #[error("columns of {relation} generate the same filter parameter {name}")]
    DuplicateParameter { relation: String, name: String },
}

impl From<CatalogError> for SynthesisError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::RelationNotFound(oid) => SynthesisError::RelationNotFound(oid),
            CatalogError::NamespaceNotFound(oid) => SynthesisError::NamespaceNotFound(oid),
        }
    }
}

/// A request body that does not fit the relation's condition schema.
/// Always maps to a 400 at the HTTP layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown filter parameter `{0}`")]
    UnknownParameter(String),
    #[error("parameter `{name}` expects {expected}")]
    WrongValueKind { name: String, expected: String },
    #[error("parameter `{name}` is out of range for the column type")]
    OutOfRange { name: String },
    #[error("`{0}` must be a non-negative integer")]
    InvalidPagination(&'static str),
}
