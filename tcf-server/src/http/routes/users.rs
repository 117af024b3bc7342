//! Public seller profiles and shops

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tcf_core::{Paginated, Pagination, PaginationParams};

use crate::db::{ListingRepo, PublicProfile, ShopFilter, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{QueryParams, UsernamePath};
use crate::http::routes::listings::ListingResponse;
use crate::http::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ShopQuery {
    #[serde(default)]
    pub status: ShopFilter,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// A profile as anyone may see it; no email, role or premium details
#[derive(Serialize)]
pub struct PublicProfileResponse {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub average_rating: Option<Decimal>,
    pub total_reviews: i32,
    pub total_listings: i64,
    pub active_listings: i64,
    pub sold_listings: i64,
    pub member_since: DateTime<Utc>,
}

impl From<PublicProfile> for PublicProfileResponse {
    fn from(p: PublicProfile) -> Self {
        Self {
            id: p.id,
            username: p.username,
            avatar_url: p.avatar_url,
            average_rating: p.average_rating,
            total_reviews: p.total_reviews,
            total_listings: p.total_listings,
            active_listings: p.active_listings,
            sold_listings: p.sold_listings,
            member_since: p.created_at,
        }
    }
}

/// GET /api/users/{username}
async fn get_profile(
    State(state): State<Arc<AppState>>,
    UsernamePath(username): UsernamePath,
) -> Result<Json<PublicProfileResponse>, ApiError> {
    let profile = UserRepo::new(&state.pool)
        .public_profile(username.as_str())
        .await?;
    Ok(Json(PublicProfileResponse::from(profile)))
}

/// GET /api/users/{username}/listings?status=active|sold|all
async fn shop_listings(
    State(state): State<Arc<AppState>>,
    UsernamePath(username): UsernamePath,
    QueryParams(query): QueryParams<ShopQuery>,
) -> Result<Json<Paginated<ListingResponse>>, ApiError> {
    let seller = UserRepo::new(&state.pool)
        .public_profile(username.as_str())
        .await?;
    let page = Pagination::from(PaginationParams {
        page: query.page,
        per_page: query.per_page,
    });

    let result = ListingRepo::new(&state.pool)
        .list_for_seller(seller.id, query.status, page)
        .await?;
    Ok(Json(result.map(ListingResponse::from)))
}

/// Public profile routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users/{username}", get(get_profile))
        .route("/api/users/{username}/listings", get(shop_listings))
}
