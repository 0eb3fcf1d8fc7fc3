use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// FieldError
///
/// A single validation violation tied to a named input field. Validation is
/// collected, not fail-fast: a request with three bad fields reports all three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// ApiError
///
/// The closed set of failure outcomes the core can produce. Every service
/// call returns `Result<T, ApiError>`; the transport adapters translate the
/// variant into a protocol-specific response (HTTP status / GraphQL
/// extension code) so both surfaces honor identical semantics.
///
/// Authentication, authorization and validation failures are expected
/// outcomes and are never logged as server faults. `Internal` is the only
/// variant that represents a fault; its detail is logged and the caller
/// receives an opaque message.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Deliberately the same message for "unknown email" and "wrong password"
    // so login failures cannot be used for account enumeration.
    #[error("not authenticated")]
    Unauthenticated,
    #[error("not authorized")]
    Forbidden,
    #[error("resource not found")]
    NotFound,
    #[error("validation failed")]
    ValidationFailed(Vec<FieldError>),
    #[error("{0}")]
    Conflict(String),
    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    /// Machine-readable error code, shared verbatim by the GraphQL surface
    /// and the REST error body.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::ValidationFailed(_) => "VALIDATION_FAILED",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    /// REST mapping: `{message, code, data?}` with the status codes the API
    /// contract documents. `Internal` detail stays server-side.
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "internal server error");
        }

        let data = match &self {
            ApiError::ValidationFailed(fields) => Some(fields.clone()),
            _ => None,
        };

        let body = serde_json::json!({
            "message": self.to_string(),
            "code": self.code(),
            "data": data,
        });

        (self.status(), Json(body)).into_response()
    }
}

impl async_graphql::ErrorExtensions for ApiError {
    /// GraphQL mapping: the message plus `extensions.code`, and for
    /// validation failures the full per-field list under `extensions.errors`.
    /// Resolvers apply this at their boundary via `map_err(|e| e.extend())`.
    fn extend(&self) -> async_graphql::Error {
        use async_graphql::ErrorExtensions as _;

        if let ApiError::Internal(detail) = self {
            tracing::error!(error = %detail, "internal server error");
        }

        async_graphql::Error::new(self.to_string()).extend_with(|_, ext| {
            ext.set("code", self.code());
            if let ApiError::ValidationFailed(fields) = self {
                if let Ok(value) = async_graphql::Value::from_json(serde_json::json!(fields)) {
                    ext.set("errors", value);
                }
            }
        })
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::Conflict("resource already exists".to_string())
            }
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
