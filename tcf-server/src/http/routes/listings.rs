//! Listing endpoints

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tcf_core::listing::description;
use tcf_core::{Condition, ImageUrls, ListingName, Paginated, Pagination, PaginationParams, Price};

use crate::db::{Listing, ListingChanges, ListingRepo, NewListing, ShopFilter};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, IdPath, JsonBody, QueryParams};
use crate::http::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Deserialize)]
pub struct CreateListingRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub condition: String,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdateListingRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub condition: Option<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub category: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub listed: Option<bool>,
}

#[derive(Serialize)]
pub struct ListingResponse {
    pub id: i64,
    pub seller_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub condition: Condition,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub category: Option<String>,
    pub cover_image: Option<String>,
    pub image_urls: Vec<String>,
    pub listed: bool,
    pub sold: bool,
    pub sold_at: Option<DateTime<Utc>>,
    pub is_promoted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Listing> for ListingResponse {
    fn from(l: Listing) -> Self {
        Self {
            id: l.id,
            seller_id: l.seller_id,
            name: l.name,
            description: l.description,
            price: l.price,
            condition: l.condition,
            brand: l.brand,
            size: l.size,
            category: l.category,
            cover_image: l.image_urls.first().cloned(),
            image_urls: l.image_urls,
            listed: l.listed,
            sold: l.sold,
            sold_at: l.sold_at,
            is_promoted: l.is_promoted,
            created_at: l.created_at,
            updated_at: l.updated_at,
        }
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// GET /api/listings - marketplace feed
async fn list_listings(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<ListingQuery>,
) -> Result<Json<Paginated<ListingResponse>>, ApiError> {
    let page = Pagination::from(PaginationParams {
        page: query.page,
        per_page: query.per_page,
    });
    let result = ListingRepo::new(&state.pool)
        .list_public(query.q.as_deref(), query.category.as_deref(), page)
        .await?;

    Ok(Json(result.map(ListingResponse::from)))
}

/// POST /api/listings - create a listing
async fn create_listing(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<CreateListingRequest>,
) -> Result<(StatusCode, Json<ListingResponse>), ApiError> {
    let new = NewListing {
        name: ListingName::new(&req.name)?,
        description: description(req.description.as_deref())?,
        price: Price::new(req.price)?,
        condition: req.condition.parse()?,
        brand: optional_text(req.brand),
        size: optional_text(req.size),
        category: optional_text(req.category),
        image_urls: ImageUrls::new(req.image_urls)?,
    };

    let listing = ListingRepo::new(&state.pool).create(user.id, new).await?;
    tracing::info!(listing_id = listing.id, seller_id = user.id, "listing created");

    Ok((StatusCode::CREATED, Json(ListingResponse::from(listing))))
}

/// GET /api/listings/my - the caller's own listings
async fn my_listings(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    QueryParams(params): QueryParams<PaginationParams>,
) -> Result<Json<Paginated<ListingResponse>>, ApiError> {
    let result = ListingRepo::new(&state.pool)
        .list_for_seller(user.id, ShopFilter::All, Pagination::from(params))
        .await?;
    Ok(Json(result.map(ListingResponse::from)))
}

/// GET /api/listings/{id}
async fn get_listing(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<ListingResponse>, ApiError> {
    let listing = ListingRepo::new(&state.pool).get(id).await?;
    Ok(Json(ListingResponse::from(listing)))
}

/// PATCH /api/listings/{id} - seller edits a listing
async fn update_listing(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath,
    JsonBody(req): JsonBody<UpdateListingRequest>,
) -> Result<Json<ListingResponse>, ApiError> {
    let changes = ListingChanges {
        name: req.name.as_deref().map(ListingName::new).transpose()?,
        description: description(req.description.as_deref())?,
        price: req.price.map(Price::new).transpose()?,
        condition: req.condition.map(|c| c.parse()).transpose()?,
        brand: optional_text(req.brand),
        size: optional_text(req.size),
        category: optional_text(req.category),
        image_urls: req.image_urls.map(ImageUrls::new).transpose()?,
        listed: req.listed,
    };

    let listing = ListingRepo::new(&state.pool)
        .update(id, user.caller(), changes)
        .await?;
    Ok(Json(ListingResponse::from(listing)))
}

/// DELETE /api/listings/{id}
async fn delete_listing(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath,
) -> Result<StatusCode, ApiError> {
    ListingRepo::new(&state.pool).delete(id, user.caller()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Listing routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/listings", get(list_listings).post(create_listing))
        .route("/api/listings/my", get(my_listings))
        .route(
            "/api/listings/{id}",
            get(get_listing).patch(update_listing).delete(delete_listing),
        )
}
