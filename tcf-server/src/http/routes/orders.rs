//! Order endpoints
//!
//! `PATCH /api/orders/{id}` is the only way a user changes an order's status;
//! the repository runs it through the state machine.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tcf_core::{OrderStatus, Paginated, Pagination, PaginationParams, ValidationError};

use crate::db::{Order, OrderFilter, OrderRepo, OrderRole};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, IdPath, JsonBody, QueryParams};
use crate::http::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    #[serde(rename = "type")]
    pub role: Option<OrderRole>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl OrderQuery {
    pub(crate) fn status(&self) -> Result<Option<OrderStatus>, ValidationError> {
        self.status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<OrderStatus>)
            .transpose()
    }

    pub(crate) fn pagination(&self) -> Pagination {
        Pagination::from(PaginationParams {
            page: self.page,
            per_page: self.per_page,
        })
    }
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub listing_id: i64,
    pub shipping_method: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateOrderRequest {
    pub status: String,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub order_number: String,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub listing_id: i64,
    pub listing_name: Option<String>,
    pub status: OrderStatus,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub shipping_method: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            order_number: o.order_number,
            buyer_id: o.buyer_id,
            seller_id: o.seller_id,
            listing_id: o.listing_id,
            listing_name: o.listing_name,
            status: o.status,
            quantity: o.quantity,
            unit_price: o.unit_price,
            subtotal: o.subtotal,
            shipping_fee: o.shipping_fee,
            tax_amount: o.tax_amount,
            total_amount: o.total_amount,
            currency: o.currency,
            shipping_method: o.shipping_method,
            notes: o.notes,
            created_at: o.created_at,
            updated_at: o.updated_at,
            shipped_at: o.shipped_at,
            delivered_at: o.delivered_at,
            completed_at: o.completed_at,
            cancelled_at: o.cancelled_at,
        }
    }
}

/// GET /api/orders - the caller's purchases and/or sales
async fn list_orders(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    QueryParams(query): QueryParams<OrderQuery>,
) -> Result<Json<Paginated<OrderResponse>>, ApiError> {
    let filter = OrderFilter {
        role: query.role.unwrap_or_default(),
        status: query.status()?,
    };
    let result = OrderRepo::new(&state.pool)
        .list_for_user(user.id, filter, query.pagination())
        .await?;
    Ok(Json(result.map(OrderResponse::from)))
}

/// POST /api/orders - buy a listing
async fn create_order(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = OrderRepo::new(&state.pool)
        .create(
            user.id,
            req.listing_id,
            req.shipping_method.filter(|s| !s.trim().is_empty()),
            req.notes.filter(|s| !s.trim().is_empty()),
            Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

/// GET /api/orders/{id}
async fn get_order(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = OrderRepo::new(&state.pool)
        .get_for_party(id, user.caller())
        .await?;
    Ok(Json(OrderResponse::from(order)))
}

/// PATCH /api/orders/{id} - move the order to a new status
async fn update_order(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath,
    JsonBody(req): JsonBody<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let target: OrderStatus = req.status.parse()?;
    let order = OrderRepo::new(&state.pool)
        .transition(id, user.caller(), target, Utc::now())
        .await?;
    Ok(Json(OrderResponse::from(order)))
}

/// Order routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/{id}", get(get_order).patch(update_order))
}
