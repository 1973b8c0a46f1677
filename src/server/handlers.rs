//! HTTP handlers: health, relation discovery and row queries.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

use crate::schema::SynthesizedSchema;

use super::errors::ApiError;
use super::models::{
    FieldDescription, FilterDescription, PaginationDescription, RelationListResponse,
    RelationSchemaResponse, RelationSummary,
};
use super::resolver::BindState;
use super::AppState;

/// Service liveness plus a one-line picture of what is being served.
pub async fn health_check(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let pool = app_state.pool.status();
    Json(serde_json::json!({
        "service": "pglens",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "relations": {
            "servable": app_state.registry.bound_count(),
            "unavailable": app_state.registry.failed_count(),
        },
        "pool": {
            "size": pool.size,
            "idle": pool.idle,
            "in_use": pool.in_use,
        }
    }))
}

/// Every relation of the exposed schemas, servable or not, with its route.
pub async fn list_relations(
    State(app_state): State<Arc<AppState>>,
) -> Json<RelationListResponse> {
    let relations = app_state
        .registry
        .iter()
        .map(|resolver| {
            let (status, display_name, fields, error) = match resolver.state() {
                BindState::Bound(schema) => (
                    "servable",
                    Some(schema.display_name().to_string()),
                    Some(schema.response.fields.len()),
                    None,
                ),
                BindState::Failed(err) => ("unavailable", None, None, Some(err.to_string())),
                // bind_all settles every resolver before the router exists.
                BindState::Unbound | BindState::Synthesizing => {
                    ("unavailable", None, None, Some("not bound".to_string()))
                }
            };
            RelationSummary {
                schema: resolver.namespace.clone(),
                name: resolver.name.clone(),
                kind: resolver.kind.as_str(),
                status,
                display_name,
                fields,
                error,
                route: format!("/{}/{}", resolver.namespace, resolver.name),
            }
        })
        .collect();
    Json(RelationListResponse { relations })
}

/// The synthesized shape of one relation: response fields, filter
/// parameters and pagination knobs.
pub async fn relation_schema(
    State(app_state): State<Arc<AppState>>,
    Path((schema, relation)): Path<(String, String)>,
) -> Result<Json<RelationSchemaResponse>, ApiError> {
    let resolver = app_state.registry.get(&schema, &relation).ok_or_else(|| {
        ApiError::UnknownRelation {
            schema: schema.clone(),
            relation: relation.clone(),
        }
    })?;
    match resolver.state() {
        BindState::Bound(synthesized) => {
            Ok(Json(describe(synthesized, app_state.config.max_limit)))
        }
        BindState::Failed(err) => Err(ApiError::Unavailable {
            schema,
            relation,
            reason: err.to_string(),
        }),
        BindState::Unbound | BindState::Synthesizing => Err(ApiError::Unavailable {
            schema,
            relation,
            reason: "not bound".to_string(),
        }),
    }
}

fn describe(synthesized: &SynthesizedSchema, max_limit: Option<u64>) -> RelationSchemaResponse {
    RelationSchemaResponse {
        schema: synthesized.namespace.clone(),
        name: synthesized.name.clone(),
        kind: synthesized.kind.as_str(),
        display_name: synthesized.display_name().to_string(),
        doc: synthesized.doc.clone(),
        fields: synthesized
            .response
            .fields
            .iter()
            .map(|field| FieldDescription {
                name: field.name.clone(),
                type_name: field.type_name.clone(),
                semantic: field.semantic.label(),
                doc: field.doc.clone(),
            })
            .collect(),
        filters: synthesized
            .condition
            .params
            .iter()
            .map(|param| FilterDescription {
                name: param.name.clone(),
                column: param.column.clone(),
                operator: param.op.suffix(),
                expects: param.value_type.expected_input(),
            })
            .collect(),
        pagination: PaginationDescription {
            limit: "optional non-negative integer, rows to return",
            offset: "optional non-negative integer, rows to skip",
            max_limit,
        },
    }
}

/// POST a filter body against one relation and get its rows back.
pub async fn query_relation(
    State(app_state): State<Arc<AppState>>,
    Path((schema, relation)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> Result<Response, ApiError> {
    let started = Instant::now();

    let resolver = app_state.registry.get(&schema, &relation).ok_or_else(|| {
        ApiError::UnknownRelation {
            schema: schema.clone(),
            relation: relation.clone(),
        }
    })?;
    let body = payload.as_object().ok_or(ApiError::BodyNotObject)?;

    let rows = resolver
        .resolve(body, app_state.pool.as_ref(), app_state.config.max_limit)
        .await
        .map_err(|err| ApiError::from_resolve(&schema, &relation, err))?;

    let row_count = rows.len();
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    let mut response = Json(rows).into_response();
    if let Ok(value) = HeaderValue::try_from(format!("{elapsed_ms:.3}ms")) {
        response.headers_mut().insert("X-Query-Time", value);
    }
    if let Ok(value) = HeaderValue::try_from(row_count.to_string()) {
        response.headers_mut().insert("X-Query-Rows", value);
    }
    Ok(response)
}
