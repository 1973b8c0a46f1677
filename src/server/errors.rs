//! Serving-side errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::schema::{InputError, SynthesisError};

use super::models::ErrorResponse;
use super::pool::PoolError;

/// Everything that can go wrong while answering one row query.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("relation failed to bind: {0}")]
    Unavailable(SynthesisError),
    #[error("relation is not bound yet")]
    NotBound,
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("query execution failed: {source}")]
    Execution { source: tokio_postgres::Error },
    #[error("failed to decode column {column}: {source}")]
    Decode {
        column: String,
        source: tokio_postgres::Error,
    },
}

/// The client-facing error surface. Every handler failure becomes one of
/// these, which in turn becomes a status code and a JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no relation {schema}.{relation} is exposed")]
    UnknownRelation { schema: String, relation: String },
    #[error("relation {schema}.{relation} is unavailable: {reason}")]
    Unavailable {
        schema: String,
        relation: String,
        reason: String,
    },
    #[error("{0}")]
    BadRequest(String),
    #[error("request body must be a JSON object")]
    BodyNotObject,
    #[error("no database connection available: {0}")]
    PoolBusy(String),
    #[error("query failed: {0}")]
    Upstream(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownRelation { .. } => StatusCode::NOT_FOUND,
            ApiError::Unavailable { .. } | ApiError::PoolBusy(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::BadRequest(_) | ApiError::BodyNotObject => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Attach routing context to a resolve failure.
    pub fn from_resolve(schema: &str, relation: &str, err: ResolveError) -> Self {
        match err {
            ResolveError::Unavailable(reason) => ApiError::Unavailable {
                schema: schema.to_string(),
                relation: relation.to_string(),
                reason: reason.to_string(),
            },
            ResolveError::NotBound => ApiError::Unavailable {
                schema: schema.to_string(),
                relation: relation.to_string(),
                reason: "not bound".to_string(),
            },
            ResolveError::Input(e) => ApiError::BadRequest(e.to_string()),
            ResolveError::Pool(e @ PoolError::AcquireTimeout(_)) => {
                ApiError::PoolBusy(e.to_string())
            }
            ResolveError::Pool(e) => ApiError::Upstream(e.to_string()),
            ResolveError::Execution { source } => ApiError::Upstream(source.to_string()),
            ResolveError::Decode { column, source } => {
                ApiError::Upstream(format!("column {column}: {source}"))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("request failed ({status}): {self}");
        } else {
            log::debug!("request rejected ({status}): {self}");
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}
