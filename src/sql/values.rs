//! Typed parameter values and the rules for how each one travels to
//! Postgres.
//!
//! Every value a client supplies is bound as a statement parameter, never
//! spliced into SQL text. Each parameter gets a declared type at prepare
//! time plus, where the declared type is `text`, an explicit SQL-side cast
//! derived from the catalog. That split keeps the binary protocol path for
//! types the driver encodes natively, and routes everything else (numeric,
//! enums, arrays written as literals, timetz) through Postgres's own text
//! input parsing.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use uuid::Uuid;

use crate::catalog::type_map::{OID_FLOAT4, OID_INT2, OID_INT4, OID_TIMETZ};
use crate::catalog::{CatalogSnapshot, Oid, SemanticType};

use super::render::quote_ident;

/// A validated filter value, ready to bind.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
}

impl ToSql for BoundValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            BoundValue::Bool(v) => v.to_sql(ty, out),
            // Integers are held as i64 and narrowed to the declared column
            // width; try_from surfaces overflow instead of truncating.
            BoundValue::Int(v) => {
                if *ty == Type::INT2 {
                    i16::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*v)?.to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            BoundValue::Float(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            BoundValue::Text(v) => v.to_sql(ty, out),
            BoundValue::Date(v) => v.to_sql(ty, out),
            BoundValue::Time(v) => v.to_sql(ty, out),
            BoundValue::Timestamp(v) => v.to_sql(ty, out),
            BoundValue::TimestampTz(v) => v.to_sql(ty, out),
            BoundValue::Uuid(v) => v.to_sql(ty, out),
            BoundValue::Json(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // The declared type is chosen by us to match the variant; a
        // mismatch is a construction bug surfaced by to_sql itself.
        true
    }

    to_sql_checked!();
}

/// How one parameter is declared and, if needed, cast in SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamBinding {
    /// Type declared at prepare time.
    pub ty: Type,
    /// SQL cast appended to the placeholder when the declared type is
    /// `text` but the column wants something else, e.g. `$1::numeric`.
    pub cast: Option<String>,
}

impl ParamBinding {
    pub fn plain(ty: Type) -> Self {
        ParamBinding { ty, cast: None }
    }

    pub fn text() -> Self {
        ParamBinding { ty: Type::TEXT, cast: None }
    }

    pub fn text_cast(cast: impl Into<String>) -> Self {
        ParamBinding { ty: Type::TEXT, cast: Some(cast.into()) }
    }
}

/// Cast target for a type oid, quoted and qualified as SQL requires:
/// `int4`, `"char"`, `numeric`, `public.mood`, `"Weird Schema"."My Type"`.
pub fn cast_name(snapshot: &CatalogSnapshot, oid: Oid) -> String {
    match snapshot.pg_type(oid) {
        Some(entry) => match snapshot.namespace(entry.namespace) {
            Ok(ns) if ns.name != "pg_catalog" => {
                format!("{}.{}", quote_ident(&ns.name), quote_ident(&entry.name))
            }
            _ => quote_ident(&entry.name).into_owned(),
        },
        // A column whose type row is missing from the snapshot still works
        // when treated as text.
        None => "text".to_string(),
    }
}

/// Binding for a value compared against a column (or array element) of the
/// given semantic type.
pub fn scalar_binding(
    snapshot: &CatalogSnapshot,
    semantic: &SemanticType,
    type_oid: Oid,
) -> ParamBinding {
    match semantic {
        SemanticType::Boolean => ParamBinding::plain(Type::BOOL),
        SemanticType::Integer => ParamBinding::plain(match type_oid {
            OID_INT2 => Type::INT2,
            OID_INT4 => Type::INT4,
            _ => Type::INT8,
        }),
        SemanticType::Float => ParamBinding::plain(if type_oid == OID_FLOAT4 {
            Type::FLOAT4
        } else {
            Type::FLOAT8
        }),
        // Sent as text and parsed by Postgres so precision never passes
        // through a float.
        SemanticType::Numeric => ParamBinding::text_cast("numeric"),
        SemanticType::Text => ParamBinding::text(),
        SemanticType::Date => ParamBinding::plain(Type::DATE),
        SemanticType::Time if type_oid == OID_TIMETZ => ParamBinding::text_cast("timetz"),
        SemanticType::Time => ParamBinding::plain(Type::TIME),
        SemanticType::Timestamp => ParamBinding::plain(Type::TIMESTAMP),
        SemanticType::TimestampTz => ParamBinding::plain(Type::TIMESTAMPTZ),
        SemanticType::Uuid => ParamBinding::plain(Type::UUID),
        // jsonb on both sides so json columns get a comparison operator.
        SemanticType::Json => ParamBinding::plain(Type::JSONB),
        SemanticType::Array(elem) => array_binding(snapshot, elem, type_oid),
        SemanticType::Opaque => ParamBinding::text_cast(cast_name(snapshot, type_oid)),
    }
}

/// Binding for a whole-array equality value. The value arrives as a
/// Postgres array literal in text form and is cast to the column's type.
pub fn array_binding(
    snapshot: &CatalogSnapshot,
    elem: &SemanticType,
    array_oid: Oid,
) -> ParamBinding {
    let elem_cast = match snapshot.pg_type(array_oid) {
        Some(entry) if entry.is_array() => cast_name(snapshot, entry.element),
        _ => {
            let _ = elem;
            "text".to_string()
        }
    };
    ParamBinding::text_cast(format!("{elem_cast}[]"))
}

/// Binding for a `containsElement` value: a scalar of the element type.
pub fn element_binding(
    snapshot: &CatalogSnapshot,
    elem: &SemanticType,
    array_oid: Oid,
) -> ParamBinding {
    match snapshot.pg_type(array_oid) {
        Some(entry) if entry.is_array() => scalar_binding(snapshot, elem, entry.element),
        _ => ParamBinding::text(),
    }
}

/// Encode validated element values as a Postgres array literal, e.g.
/// `{"a","b"}`. Every element is quoted, which the array input syntax
/// accepts for all element types, so escaping is uniform.
pub fn encode_array_literal(elems: &[BoundValue]) -> String {
    let mut out = String::from("{");
    for (i, elem) in elems.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_quoted_element(&mut out, &element_text(elem));
    }
    out.push('}');
    out
}

fn element_text(value: &BoundValue) -> String {
    match value {
        BoundValue::Bool(b) => if *b { "t" } else { "f" }.to_string(),
        BoundValue::Int(i) => i.to_string(),
        BoundValue::Float(f) => f.to_string(),
        BoundValue::Text(s) => s.clone(),
        BoundValue::Date(d) => d.to_string(),
        BoundValue::Time(t) => t.to_string(),
        BoundValue::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        BoundValue::TimestampTz(ts) => ts.to_rfc3339(),
        BoundValue::Uuid(u) => u.to_string(),
        BoundValue::Json(v) => v.to_string(),
    }
}

fn push_quoted_element(out: &mut String, raw: &str) {
    out.push('"');
    for c in raw.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}
