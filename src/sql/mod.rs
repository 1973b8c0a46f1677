//! Dynamic SELECT generation.
//!
//! Queries are built as an explicit statement tree and rendered to SQL in
//! a separate, final step. Nothing user-supplied can reach the SQL string:
//! identifiers come from the catalog snapshot and go through quoting,
//! values become numbered parameters, and pagination is validated integers.

pub mod builder;
pub mod keywords;
pub mod render;
pub mod values;

pub use builder::build_select;
pub use render::{quote_ident, render, RenderedQuery};
pub use values::{BoundValue, ParamBinding};

/// A single-relation SELECT, structurally incapable of expressing anything
/// the serving layer does not support.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub targets: Vec<Target>,
    pub from: RelationRef,
    /// Conjoined with AND, in condition-schema order.
    pub predicates: Vec<Predicate>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// One output column. `cast_to_text` is set for types the driver cannot
/// decode natively; the alias keeps the original column name on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub column: String,
    pub cast_to_text: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationRef {
    pub namespace: String,
    pub name: String,
    /// When false the relation is scanned with `ONLY`, excluding
    /// inheritance children and partitions. Serving always sets true;
    /// the flag exists so the tree states the choice explicitly.
    pub include_descendants: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    /// Cast applied to the column side, e.g. `jsonb` for json columns
    /// that have no equality operator of their own.
    pub column_cast: Option<&'static str>,
    pub kind: PredicateKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredicateKind {
    /// `col OP $n`
    Compare {
        op: CompareOp,
        value: BoundValue,
        binding: ParamBinding,
    },
    /// `col LIKE $n` / `col ILIKE $n`
    Pattern {
        case_insensitive: bool,
        value: String,
    },
    /// `col IS NULL` / `col IS NOT NULL`; no parameter.
    Null { negated: bool },
    /// `$n = ANY(col)`
    ContainsElement {
        value: BoundValue,
        binding: ParamBinding,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}
