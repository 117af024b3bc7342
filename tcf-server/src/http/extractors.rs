//! Custom Axum extractors
//!
//! Authentication is an extractor: a handler that takes [`AuthUser`] cannot
//! run for an anonymous or suspended caller.

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Path};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;

use tcf_core::{Username, ValidationError};

use super::error::ApiError;
use super::server::AppState;
use crate::auth::{bearer_token, session_cookie, AuthError, Claims};
use crate::db::{User, UserRepo};

/// JSON body whose rejections use the API error format
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Query string whose rejections use the API error format
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// Numeric id from the single path segment
pub struct IdPath(pub i64);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state).await?;

        let id = raw
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or(ValidationError::InvalidFormat {
                field: "id",
                reason: "must be a positive integer",
            })?;
        Ok(Self(id))
    }
}

/// Validated username from the single path segment
pub struct UsernamePath(pub Username);

impl<S> FromRequestParts<S> for UsernamePath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state).await?;
        Ok(Self(Username::new(&raw)?))
    }
}

fn token_from(parts: &Parts) -> Result<&str, AuthError> {
    if let Some(header) = parts.headers.get(AUTHORIZATION) {
        let value = header.to_str().map_err(|_| AuthError::Invalid)?;
        return bearer_token(value).ok_or(AuthError::Invalid);
    }
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(session_cookie)
        .ok_or(AuthError::Missing)
}

/// Verified token claims, with or without a marketplace profile
pub struct TokenClaims(pub Claims);

impl FromRequestParts<Arc<AppState>> for TokenClaims {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from(parts)?;
        Ok(Self(state.verifier.verify(token)?))
    }
}

/// The authenticated, active marketplace user
pub struct AuthUser(pub User);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let TokenClaims(claims) = TokenClaims::from_request_parts(parts, state).await?;

        let user = UserRepo::new(&state.pool)
            .find_by_auth_subject(claims.sub)
            .await?
            .ok_or(ApiError::UserNotRegistered)?;

        if user.is_suspended() {
            tracing::info!(user_id = user.id, "suspended user rejected");
            return Err(ApiError::Forbidden {
                code: "account_suspended",
                reason: "this account is suspended".into(),
            });
        }
        Ok(Self(user))
    }
}

/// An authenticated user with the ADMIN role
pub struct AdminUser(pub User);

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::forbidden("administrator role required"));
        }
        Ok(Self(user))
    }
}
