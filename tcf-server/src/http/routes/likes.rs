//! Liked listings

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tcf_core::{LikeAction, Paginated, Pagination, PaginationParams};

use crate::db::{LikeRepo, LikedListing};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, JsonBody, QueryParams};
use crate::http::routes::listings::ListingResponse;
use crate::http::server::AppState;

#[derive(Deserialize)]
pub struct LikeRequest {
    pub listing_id: i64,
    pub action: LikeAction,
}

#[derive(Serialize)]
pub struct LikeResponse {
    pub listing_id: i64,
    pub liked: bool,
}

#[derive(Serialize)]
pub struct LikedListingResponse {
    pub listing: ListingResponse,
    pub liked_at: DateTime<Utc>,
}

impl From<LikedListing> for LikedListingResponse {
    fn from(l: LikedListing) -> Self {
        Self {
            listing: ListingResponse::from(l.listing),
            liked_at: l.liked_at,
        }
    }
}

/// GET /api/likes - the caller's liked listings
async fn list_likes(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    QueryParams(params): QueryParams<PaginationParams>,
) -> Result<Json<Paginated<LikedListingResponse>>, ApiError> {
    let result = LikeRepo::new(&state.pool)
        .list_for_user(user.id, Pagination::from(params))
        .await?;
    Ok(Json(result.map(LikedListingResponse::from)))
}

/// POST /api/likes - like or unlike a listing
async fn set_like(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<LikeRequest>,
) -> Result<Json<LikeResponse>, ApiError> {
    let liked = LikeRepo::new(&state.pool)
        .apply(user.id, req.listing_id, req.action)
        .await?;
    Ok(Json(LikeResponse {
        listing_id: req.listing_id,
        liked,
    }))
}

/// Like routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/likes", get(list_likes).post(set_like))
}
