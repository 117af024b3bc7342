//! Review endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tcf_core::user::review_comment;
use tcf_core::{Paginated, Pagination, PaginationParams, Rating};

use crate::db::{Review, ReviewRepo, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, IdPath, JsonBody, QueryParams};
use crate::http::server::AppState;

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Serialize)]
pub struct ReviewResponse {
    pub id: i64,
    pub order_id: i64,
    pub reviewer_id: i64,
    pub reviewer_username: Option<String>,
    pub reviewee_id: i64,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(r: Review) -> Self {
        Self {
            id: r.id,
            order_id: r.order_id,
            reviewer_id: r.reviewer_id,
            reviewer_username: r.reviewer_username,
            reviewee_id: r.reviewee_id,
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at,
        }
    }
}

/// GET /api/orders/{id}/reviews
async fn list_order_reviews(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(order_id): IdPath,
) -> Result<Json<Vec<ReviewResponse>>, ApiError> {
    let reviews = ReviewRepo::new(&state.pool)
        .list_for_order(order_id, user.caller())
        .await?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

/// POST /api/orders/{id}/reviews - review the other party
async fn create_review(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(order_id): IdPath,
    JsonBody(req): JsonBody<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), ApiError> {
    let rating = Rating::new(req.rating)?;
    let comment = review_comment(req.comment.as_deref())?;

    let review = ReviewRepo::new(&state.pool)
        .create(order_id, user.caller(), rating, comment, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(ReviewResponse::from(review))))
}

/// GET /api/users/{username}/reviews - public reviews a user received
async fn list_user_reviews(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    QueryParams(params): QueryParams<PaginationParams>,
) -> Result<Json<Paginated<ReviewResponse>>, ApiError> {
    let user = UserRepo::new(&state.pool).get_by_username(&username).await?;
    let result = ReviewRepo::new(&state.pool)
        .list_for_user(user.id, Pagination::from(params))
        .await?;
    Ok(Json(result.map(ReviewResponse::from)))
}

/// Review routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/orders/{id}/reviews",
            get(list_order_reviews).post(create_review),
        )
        .route("/api/users/{username}/reviews", get(list_user_reviews))
}
