//! Wire DTOs for the HTTP surface.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// One entry in `GET /relations`.
#[derive(Debug, Serialize)]
pub struct RelationSummary {
    pub schema: String,
    pub name: String,
    pub kind: &'static str,
    /// "servable" or "unavailable".
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Live column count, for servable relations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<usize>,
    /// Why the relation is unavailable, when it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Query route, e.g. `/public/orders`.
    pub route: String,
}

#[derive(Debug, Serialize)]
pub struct RelationListResponse {
    pub relations: Vec<RelationSummary>,
}

/// Body of `GET /relations/{schema}/{relation}`.
#[derive(Debug, Serialize)]
pub struct RelationSchemaResponse {
    pub schema: String,
    pub name: String,
    pub kind: &'static str,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub fields: Vec<FieldDescription>,
    pub filters: Vec<FilterDescription>,
    pub pagination: PaginationDescription,
}

#[derive(Debug, Serialize)]
pub struct FieldDescription {
    pub name: String,
    /// SQL type name, e.g. `int8`, `public.mood`, `text[]`.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Semantic classification, e.g. `integer`, `timestamptz`, `opaque`.
    pub semantic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FilterDescription {
    /// Parameter name as it appears in a request body.
    pub name: String,
    /// Column the filter applies to.
    pub column: String,
    /// Operator suffix, e.g. `lessOrEqual`, `isNull`.
    pub operator: &'static str,
    /// The JSON value the parameter expects.
    pub expects: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PaginationDescription {
    pub limit: &'static str,
    pub offset: &'static str,
    /// Server-side cap applied to `limit`, if one is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_limit: Option<u64>,
}
