//! Statement-tree to SQL rendering.
//!
//! The renderer is the only place SQL text is assembled. It walks the tree
//! in a fixed order, so the same tree always renders to the same string
//! with the same parameter numbering.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use tokio_postgres::types::{ToSql, Type};

use super::keywords::RESERVED_WORDS;
use super::values::{BoundValue, ParamBinding};
use super::{Predicate, PredicateKind, SelectStatement};

lazy_static! {
    static ref BARE_IDENT: Regex = Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap();
}

/// Quote an identifier if it cannot stand bare: anything outside
/// `[a-z_][a-z0-9_]*`, and any reserved word. Embedded quotes are doubled.
pub fn quote_ident(name: &str) -> Cow<'_, str> {
    if BARE_IDENT.is_match(name) && !RESERVED_WORDS.contains(name) {
        return Cow::Borrowed(name);
    }
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for c in name.chars() {
        if c == '"' {
            quoted.push('"');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Finished SQL plus the parameters to execute it with, in placeholder
/// order. `param_types[i]` is the declared type of `$i+1`.
#[derive(Debug, Clone)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<BoundValue>,
    pub param_types: Vec<Type>,
}

impl RenderedQuery {
    /// Parameter slice in the shape `tokio_postgres` execution wants.
    pub fn param_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
    }
}

#[derive(Default)]
struct SqlWriter {
    sql: String,
    params: Vec<BoundValue>,
    types: Vec<Type>,
}

impl SqlWriter {
    fn push(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }

    /// Append the next placeholder, recording the value and its declared
    /// type, and append the binding's SQL cast if it has one.
    fn push_param(&mut self, value: BoundValue, binding: &ParamBinding) {
        self.params.push(value);
        self.types.push(binding.ty.clone());
        self.sql.push('$');
        self.sql.push_str(&self.params.len().to_string());
        if let Some(cast) = &binding.cast {
            self.sql.push_str("::");
            self.sql.push_str(cast);
        }
    }
}

pub fn render(stmt: &SelectStatement) -> RenderedQuery {
    let mut w = SqlWriter::default();

    w.push("SELECT ");
    for (i, target) in stmt.targets.iter().enumerate() {
        if i > 0 {
            w.push(", ");
        }
        let column = quote_ident(&target.column);
        w.push(&column);
        if target.cast_to_text {
            w.push("::text AS ");
            w.push(&column);
        }
    }

    w.push(" FROM ");
    if !stmt.from.include_descendants {
        w.push("ONLY ");
    }
    w.push(&quote_ident(&stmt.from.namespace));
    w.push(".");
    w.push(&quote_ident(&stmt.from.name));

    for (i, predicate) in stmt.predicates.iter().enumerate() {
        w.push(if i == 0 { " WHERE " } else { " AND " });
        render_predicate(&mut w, predicate);
    }

    if let Some(limit) = stmt.limit {
        w.push(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = stmt.offset {
        w.push(&format!(" OFFSET {offset}"));
    }

    RenderedQuery { sql: w.sql, params: w.params, param_types: w.types }
}

fn render_predicate(w: &mut SqlWriter, predicate: &Predicate) {
    let mut column = quote_ident(&predicate.column).into_owned();
    if let Some(cast) = predicate.column_cast {
        column.push_str("::");
        column.push_str(cast);
    }

    match &predicate.kind {
        PredicateKind::Compare { op, value, binding } => {
            w.push(&column);
            w.push(" ");
            w.push(op.symbol());
            w.push(" ");
            w.push_param(value.clone(), binding);
        }
        PredicateKind::Pattern { case_insensitive, value } => {
            w.push(&column);
            w.push(if *case_insensitive { " ILIKE " } else { " LIKE " });
            w.push_param(BoundValue::Text(value.clone()), &ParamBinding::text());
        }
        PredicateKind::Null { negated } => {
            w.push(&column);
            w.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
        }
        PredicateKind::ContainsElement { value, binding } => {
            w.push_param(value.clone(), binding);
            w.push(" = ANY(");
            w.push(&column);
            w.push(")");
        }
    }
}
