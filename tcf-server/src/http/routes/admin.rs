//! Administrator endpoints
//!
//! Every handler takes [`AdminUser`]. Order changes still go through the
//! state machine; the admin party only widens which moves are allowed.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use tcf_core::{
    OrderStatus, Paginated, Pagination, PaginationParams, PromotionStatus, ReportStatus, Role,
    UserStatus, ValidationError,
};

use crate::db::{
    AdminUserUpdate, DashboardRepo, DashboardStats, OrderRepo, PromotionRepo, ReportRepo,
    ReportUpdate, UserRepo,
};
use crate::http::error::ApiError;
use crate::http::extractors::{AdminUser, IdPath, JsonBody, QueryParams};
use crate::http::routes::auth::UserResponse;
use crate::http::routes::benefits::{CreatePromotionRequest, PromotionResponse};
use crate::http::routes::orders::{OrderQuery, OrderResponse, UpdateOrderRequest};
use crate::http::routes::reports::ReportResponse;
use crate::http::server::AppState;
use crate::maintenance::{self, MaintenanceReport};

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminUserRequest {
    pub role: Option<String>,
    pub status: Option<String>,
    pub is_premium: Option<bool>,
}

impl TryFrom<AdminUserRequest> for AdminUserUpdate {
    type Error = ValidationError;

    fn try_from(req: AdminUserRequest) -> Result<Self, Self::Error> {
        let update = Self {
            role: req.role.as_deref().map(str::parse::<Role>).transpose()?,
            status: req.status.as_deref().map(str::parse::<UserStatus>).transpose()?,
            is_premium: req.is_premium,
        };
        if update.is_empty() {
            return Err(ValidationError::Empty { field: "update" });
        }
        Ok(update)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PromotionQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportUpdateRequest {
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<ReportUpdateRequest> for ReportUpdate {
    type Error = ValidationError;

    fn try_from(req: ReportUpdateRequest) -> Result<Self, Self::Error> {
        let update = Self {
            status: req.status.as_deref().map(str::parse::<ReportStatus>).transpose()?,
            notes: req.notes.map(|n| n.trim().to_owned()),
        };
        if update.is_empty() {
            return Err(ValidationError::Empty { field: "update" });
        }
        Ok(update)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceQuery {
    #[serde(default)]
    pub dry_run: bool,
}

/// GET /api/admin/users
async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    QueryParams(query): QueryParams<UserQuery>,
) -> Result<Json<Paginated<UserResponse>>, ApiError> {
    let page = Pagination::from(PaginationParams {
        page: query.page,
        per_page: query.per_page,
    });
    let result = UserRepo::new(&state.pool)
        .list(query.q.as_deref(), page)
        .await?;
    Ok(Json(result.map(UserResponse::from)))
}

/// GET /api/admin/users/{id}
async fn get_user(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    IdPath(id): IdPath,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserRepo::new(&state.pool).get(id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// PATCH /api/admin/users/{id} - change role, status or premium
async fn update_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    IdPath(id): IdPath,
    JsonBody(req): JsonBody<AdminUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let update = AdminUserUpdate::try_from(req)?;
    if id == admin.id && update.status.is_some_and(|s| s != admin.status) {
        return Err(ApiError::forbidden("administrators cannot change their own status"));
    }

    let user = UserRepo::new(&state.pool).update_admin(id, update).await?;
    tracing::info!(admin_id = admin.id, user_id = id, "user updated by admin");
    Ok(Json(UserResponse::from(user)))
}

/// GET /api/admin/transactions - every order
async fn list_transactions(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    QueryParams(query): QueryParams<OrderQuery>,
) -> Result<Json<Paginated<OrderResponse>>, ApiError> {
    let result = OrderRepo::new(&state.pool)
        .list_all(query.status()?, query.pagination())
        .await?;
    Ok(Json(result.map(OrderResponse::from)))
}

/// PATCH /api/admin/transactions/{id}
async fn update_transaction(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    IdPath(id): IdPath,
    JsonBody(req): JsonBody<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let target: OrderStatus = req.status.parse()?;
    let order = OrderRepo::new(&state.pool)
        .transition(id, admin.caller(), target, Utc::now())
        .await?;
    Ok(Json(OrderResponse::from(order)))
}

/// GET /api/admin/promotions
async fn list_promotions(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    QueryParams(query): QueryParams<PromotionQuery>,
) -> Result<Json<Paginated<PromotionResponse>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<PromotionStatus>)
        .transpose()?;
    let page = Pagination::from(PaginationParams {
        page: query.page,
        per_page: query.per_page,
    });

    let result = PromotionRepo::new(&state.pool).list(status, page).await?;
    Ok(Json(result.map(PromotionResponse::from)))
}

/// POST /api/admin/promotions - promote any listing
async fn create_promotion(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    JsonBody(req): JsonBody<CreatePromotionRequest>,
) -> Result<(StatusCode, Json<PromotionResponse>), ApiError> {
    let promotion = PromotionRepo::new(&state.pool)
        .create(admin.caller(), req.into(), state.quota, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(PromotionResponse::from(promotion))))
}

/// GET /api/admin/dashboard - marketplace counters
async fn dashboard(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<DashboardStats>, ApiError> {
    let stats = DashboardRepo::new(&state.pool).stats(Utc::now()).await?;
    Ok(Json(stats))
}

/// GET /api/admin/reports
async fn list_reports(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    QueryParams(query): QueryParams<ReportQuery>,
) -> Result<Json<Paginated<ReportResponse>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<ReportStatus>)
        .transpose()?;
    let page = Pagination::from(PaginationParams {
        page: query.page,
        per_page: query.per_page,
    });

    let result = ReportRepo::new(&state.pool).list(status, page).await?;
    Ok(Json(result.map(ReportResponse::from)))
}

/// PATCH /api/admin/reports/{id} - resolve, dismiss or annotate
async fn update_report(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    IdPath(id): IdPath,
    JsonBody(req): JsonBody<ReportUpdateRequest>,
) -> Result<Json<ReportResponse>, ApiError> {
    let update = ReportUpdate::try_from(req)?;
    let report = ReportRepo::new(&state.pool)
        .update(id, update, Utc::now())
        .await?;
    tracing::info!(admin_id = admin.id, report_id = id, status = %report.status, "report updated");
    Ok(Json(ReportResponse::from(report)))
}

/// POST /api/admin/maintenance/reconcile
async fn reconcile(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    QueryParams(query): QueryParams<MaintenanceQuery>,
) -> Result<Json<MaintenanceReport>, ApiError> {
    let report = maintenance::run_all(&state.pool, Utc::now(), query.dry_run).await?;
    tracing::info!(
        admin_id = admin.id,
        dry_run = query.dry_run,
        issues = report.issue_count(),
        "maintenance run from admin api"
    );
    Ok(Json(report))
}

/// Admin routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{id}", get(get_user).patch(update_user))
        .route("/api/admin/transactions", get(list_transactions))
        .route("/api/admin/transactions/{id}", patch(update_transaction))
        .route(
            "/api/admin/promotions",
            get(list_promotions).post(create_promotion),
        )
        .route("/api/admin/dashboard", get(dashboard))
        .route("/api/admin/reports", get(list_reports))
        .route("/api/admin/reports/{id}", patch(update_report))
        .route("/api/admin/maintenance/reconcile", post(reconcile))
}
