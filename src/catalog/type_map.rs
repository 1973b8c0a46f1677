//! Classification of Postgres type oids into the small semantic vocabulary
//! the rest of the system works in.
//!
//! The mapper is total: an oid we do not recognize classifies as
//! [`SemanticType::Opaque`] and the column stays usable with a reduced
//! operator set, rather than failing the whole relation.

use super::snapshot::{CatalogSnapshot, Oid};

// Well-known built-in type oids. These are pinned by pg_type.dat and have
// been stable across every Postgres release we target.
pub const OID_BOOL: Oid = 16;
pub const OID_INT8: Oid = 20;
pub const OID_INT2: Oid = 21;
pub const OID_INT4: Oid = 23;
pub const OID_FLOAT4: Oid = 700;
pub const OID_FLOAT8: Oid = 701;
pub const OID_NUMERIC: Oid = 1700;
pub const OID_TEXT: Oid = 25;
pub const OID_VARCHAR: Oid = 1043;
pub const OID_BPCHAR: Oid = 1042;
pub const OID_NAME: Oid = 19;
pub const OID_DATE: Oid = 1082;
pub const OID_TIME: Oid = 1083;
pub const OID_TIMETZ: Oid = 1266;
pub const OID_TIMESTAMP: Oid = 1114;
pub const OID_TIMESTAMPTZ: Oid = 1184;
pub const OID_UUID: Oid = 2950;
pub const OID_JSON: Oid = 114;
pub const OID_JSONB: Oid = 3802;

/// What a column's values *are* for the purposes of filtering, binding and
/// response decoding, independent of the concrete Postgres type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticType {
    Boolean,
    /// int2 / int4 / int8. The concrete width still matters for binding
    /// and range checks, so the type oid travels alongside this.
    Integer,
    /// float4 / float8.
    Float,
    /// Arbitrary-precision numeric; compared exactly, never through f64.
    Numeric,
    Text,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Uuid,
    Json,
    Array(Box<SemanticType>),
    /// Anything we have no dedicated handling for: enums, ranges, bytea,
    /// geometric types, extension types. Served as text.
    Opaque,
}

impl SemanticType {
    /// Whether `<`, `<=`, `>`, `>=` make sense for values of this type.
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            SemanticType::Integer
                | SemanticType::Float
                | SemanticType::Numeric
                | SemanticType::Date
                | SemanticType::Time
                | SemanticType::Timestamp
                | SemanticType::TimestampTz
        )
    }

    /// Short label used in schema descriptions and log lines.
    pub fn label(&self) -> String {
        match self {
            SemanticType::Boolean => "boolean".into(),
            SemanticType::Integer => "integer".into(),
            SemanticType::Float => "float".into(),
            SemanticType::Numeric => "numeric".into(),
            SemanticType::Text => "text".into(),
            SemanticType::Date => "date".into(),
            SemanticType::Time => "time".into(),
            SemanticType::Timestamp => "timestamp".into(),
            SemanticType::TimestampTz => "timestamptz".into(),
            SemanticType::Uuid => "uuid".into(),
            SemanticType::Json => "json".into(),
            SemanticType::Array(elem) => format!("array<{}>", elem.label()),
            SemanticType::Opaque => "opaque".into(),
        }
    }

    /// Human description of the JSON value a filter on this type expects.
    /// Used in error messages and in the schema description endpoint.
    pub fn expected_input(&self) -> &'static str {
        match self {
            SemanticType::Boolean => "a boolean",
            SemanticType::Integer => "an integral number",
            SemanticType::Float => "a number",
            SemanticType::Numeric => "a number or a numeric string",
            SemanticType::Text => "a string",
            SemanticType::Date => "a date string (YYYY-MM-DD)",
            SemanticType::Time => "a time string (HH:MM:SS)",
            SemanticType::Timestamp => "a timestamp string (YYYY-MM-DDTHH:MM:SS)",
            SemanticType::TimestampTz => "an RFC 3339 timestamp string",
            SemanticType::Uuid => "a UUID string",
            SemanticType::Json => "any JSON value",
            SemanticType::Array(_) => "an array",
            SemanticType::Opaque => "a string",
        }
    }
}

/// Classify a type oid against the snapshot.
///
/// Arrays are recognized through `typcategory`/`typelem` rather than a name
/// prefix, and classify their element recursively. Nested array types do
/// not occur in practice (Postgres flattens them), but if one did it would
/// simply classify as an array of opaque.
pub fn map_type(snapshot: &CatalogSnapshot, oid: Oid) -> SemanticType {
    match oid {
        OID_BOOL => return SemanticType::Boolean,
        OID_INT2 | OID_INT4 | OID_INT8 => return SemanticType::Integer,
        OID_FLOAT4 | OID_FLOAT8 => return SemanticType::Float,
        OID_NUMERIC => return SemanticType::Numeric,
        OID_TEXT | OID_VARCHAR | OID_BPCHAR | OID_NAME => return SemanticType::Text,
        OID_DATE => return SemanticType::Date,
        OID_TIME | OID_TIMETZ => return SemanticType::Time,
        OID_TIMESTAMP => return SemanticType::Timestamp,
        OID_TIMESTAMPTZ => return SemanticType::TimestampTz,
        OID_UUID => return SemanticType::Uuid,
        OID_JSON | OID_JSONB => return SemanticType::Json,
        _ => {}
    }
    if let Some(entry) = snapshot.pg_type(oid) {
        if entry.is_array() {
            // Guard against a self-referential typelem in a corrupt or
            // hand-built snapshot; real catalogs never do this.
            if entry.element != oid {
                return SemanticType::Array(Box::new(map_type(snapshot, entry.element)));
            }
        }
    }
    SemanticType::Opaque
}

/// Type name for display purposes only: `int4`, `public.mood`, `text[]`.
/// Never used in generated SQL; see `sql::values::cast_name` for that.
pub fn display_type_name(snapshot: &CatalogSnapshot, oid: Oid) -> String {
    match snapshot.pg_type(oid) {
        Some(entry) if entry.is_array() && entry.element != oid => {
            format!("{}[]", display_type_name(snapshot, entry.element))
        }
        Some(entry) => match snapshot.namespace(entry.namespace) {
            Ok(ns) if ns.name != "pg_catalog" => format!("{}.{}", ns.name, entry.name),
            _ => entry.name.clone(),
        },
        None => format!("oid:{oid}"),
    }
}
