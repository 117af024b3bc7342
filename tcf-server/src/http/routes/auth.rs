//! Account endpoints
//!
//! Sign-up and sign-in happen at the auth provider. Registration here only
//! attaches a marketplace profile to an already verified provider account.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tcf_core::{Role, UserStatus, Username, ValidationError};

use crate::db::{User, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, JsonBody, TokenClaims};
use crate::http::server::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    /// Falls back to the email claim of the token
    pub email: Option<String>,
}

/// A user as the API shows it to the user themself and to admins
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
    pub free_promotions_used: i32,
    pub average_rating: Option<Decimal>,
    pub total_reviews: i32,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role,
            status: u.status,
            is_premium: u.is_premium,
            premium_until: u.premium_until,
            free_promotions_used: u.free_promotions_used,
            average_rating: u.average_rating,
            total_reviews: u.total_reviews,
            avatar_url: u.avatar_url,
            created_at: u.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    /// Premium status right now, accounting for `premium_until`
    pub premium_active: bool,
    pub free_promotions_remaining: i32,
}

/// POST /api/auth/register - create the profile for the token's account
async fn register(
    State(state): State<Arc<AppState>>,
    TokenClaims(claims): TokenClaims,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let username = Username::new(&req.username)?;
    let email = req
        .email
        .or(claims.email)
        .map(|e| e.trim().to_owned())
        .filter(|e| e.contains('@'))
        .ok_or(ValidationError::InvalidFormat {
            field: "email",
            reason: "a valid email address is required",
        })?;

    let user = UserRepo::new(&state.pool)
        .register(claims.sub, username, &email)
        .await?;

    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /api/auth/me - the current user
async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Json<MeResponse> {
    let now = Utc::now();
    let premium_active = user.has_active_premium(now);
    let free_promotions_remaining = state.quota.remaining(&user.quota_state(), now);

    Json(MeResponse {
        user: UserResponse::from(user),
        premium_active,
        free_promotions_remaining,
    })
}

/// Account routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/me", get(me))
}
