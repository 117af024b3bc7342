//! Premium benefits: free promotion credits, upgrades and listing promotions

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tcf_core::PromotionStatus;

use crate::db::{NewPromotion, Promotion, PromotionRepo, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, JsonBody};
use crate::http::routes::auth::UserResponse;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct FreePromotionResponse {
    pub ok: bool,
    pub used: i32,
    pub remaining: i32,
}

#[derive(Deserialize)]
pub struct PremiumRequest {
    pub months: u32,
}

#[derive(Deserialize)]
pub struct CreatePromotionRequest {
    pub listing_id: i64,
    pub days: u32,
    #[serde(default)]
    pub use_free_credit: bool,
}

#[derive(Serialize)]
pub struct PromotionResponse {
    pub id: i64,
    pub listing_id: i64,
    pub seller_id: i64,
    pub status: PromotionStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub used_free_credit: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Promotion> for PromotionResponse {
    fn from(p: Promotion) -> Self {
        Self {
            id: p.id,
            listing_id: p.listing_id,
            seller_id: p.seller_id,
            status: p.status,
            starts_at: p.starts_at,
            ends_at: p.ends_at,
            used_free_credit: p.used_free_credit,
            created_at: p.created_at,
        }
    }
}

impl From<CreatePromotionRequest> for NewPromotion {
    fn from(req: CreatePromotionRequest) -> Self {
        Self {
            listing_id: req.listing_id,
            days: req.days,
            use_free_credit: req.use_free_credit,
        }
    }
}

/// POST /api/user/benefits/use-free-promotion
async fn use_free_promotion(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<FreePromotionResponse>, ApiError> {
    let outcome = UserRepo::new(&state.pool)
        .use_free_promotion(user.id, state.quota, Utc::now())
        .await?;

    Ok(Json(FreePromotionResponse {
        ok: true,
        used: outcome.used,
        remaining: outcome.remaining,
    }))
}

/// POST /api/profile/premium - extend premium by whole months
async fn upgrade_premium(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<PremiumRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserRepo::new(&state.pool)
        .upgrade_premium(user.id, req.months, Utc::now())
        .await?;
    Ok(Json(UserResponse::from(user)))
}

/// POST /api/promotions - seller promotes one of their listings
async fn create_promotion(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<CreatePromotionRequest>,
) -> Result<(StatusCode, Json<PromotionResponse>), ApiError> {
    let promotion = PromotionRepo::new(&state.pool)
        .create(user.caller(), req.into(), state.quota, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(PromotionResponse::from(promotion))))
}

/// Benefit routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/user/benefits/use-free-promotion",
            post(use_free_promotion),
        )
        .route("/api/profile/premium", post(upgrade_premium))
        .route("/api/promotions", post(create_promotion))
}
