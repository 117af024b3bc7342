//! API error type with IntoResponse
//!
//! Every error body is `{"error": <code>, "message": <text>}`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use tcf_core::{QuotaError, TransitionError, ValidationError};

use crate::auth::AuthError;
use crate::db::repos::DbError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Domain validation failed (400)
    Validation(ValidationError),

    /// Malformed request body, query or path (400)
    BadRequest { message: String },

    /// Missing or invalid token (401)
    Unauthorized(AuthError),

    /// Valid token but no marketplace profile yet (404)
    UserNotRegistered,

    /// Caller may not do this (403)
    Forbidden { code: &'static str, reason: String },

    /// Free promotion refused (403)
    Quota(QuotaError),

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// Write conflicts with current state (409)
    Conflict { code: &'static str, message: String },

    /// Database error (500, logged)
    Database(DbError),

    /// Internal error (500, logged)
    Internal { message: String },
}

impl ApiError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            code: "forbidden",
            reason: reason.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Validation(e) => (StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
            Self::BadRequest { message } => (StatusCode::BAD_REQUEST, "bad_request", message.clone()),
            Self::Unauthorized(e) => (StatusCode::UNAUTHORIZED, "unauthorized", e.to_string()),
            Self::UserNotRegistered => (
                StatusCode::NOT_FOUND,
                "user_not_found",
                "no marketplace profile for this account; register first".to_string(),
            ),
            Self::Forbidden { code, reason } => (StatusCode::FORBIDDEN, *code, reason.clone()),
            Self::Quota(e) => (StatusCode::FORBIDDEN, e.reason(), e.to_string()),
            Self::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{} '{}' not found", resource, id),
            ),
            Self::Conflict { code, message } => (StatusCode::CONFLICT, *code, message.clone()),
            Self::Database(e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "an internal error occurred".to_string(),
                )
            }
            Self::Internal { message } => {
                tracing::error!(%message, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "an internal error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self::Unauthorized(e)
    }
}

impl From<TransitionError> for ApiError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::NotAParty => Self::Forbidden {
                code: "not_a_party",
                reason: e.to_string(),
            },
            TransitionError::NotAllowed { .. } => Self::Forbidden {
                code: "forbidden",
                reason: e.to_string(),
            },
            TransitionError::Invalid { .. } => Self::Conflict {
                code: "invalid_transition",
                message: e.to_string(),
            },
        }
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::Conflict { message } => Self::Conflict {
                code: "conflict",
                message,
            },
            DbError::Forbidden { reason } => Self::forbidden(reason),
            DbError::Transition(t) => t.into(),
            DbError::Quota(q) => Self::Quota(q),
            DbError::Validation(v) => Self::Validation(v),
            DbError::Sqlx(_) => Self::Database(e),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use tcf_core::{OrderStatus, Party};

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_error_is_400() {
        let (status, body) = body_of(ApiError::Validation(ValidationError::Empty { field: "name" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], "name cannot be empty");
    }

    #[tokio::test]
    async fn transition_errors_map_to_403_and_409() {
        let (status, body) = body_of(TransitionError::NotAParty.into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "not_a_party");

        let (status, _) = body_of(
            TransitionError::NotAllowed {
                party: Party::Buyer,
                target: OrderStatus::Shipped,
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = body_of(
            DbError::from(TransitionError::Invalid {
                from: OrderStatus::Completed,
                to: OrderStatus::Cancelled,
            })
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "invalid_transition");
    }

    #[tokio::test]
    async fn quota_errors_carry_reason() {
        let (status, body) = body_of(DbError::Quota(QuotaError::Exhausted).into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "quota_exhausted");
    }

    #[tokio::test]
    async fn database_errors_are_generic() {
        let (status, body) = body_of(DbError::Sqlx(sqlx::Error::PoolTimedOut).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "an internal error occurred");
    }

    #[tokio::test]
    async fn unknown_user_is_404() {
        let (status, body) = body_of(ApiError::UserNotRegistered).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "user_not_found");
    }
}
