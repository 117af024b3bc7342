//! Moderation reports filed by users

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tcf_core::{ReportReason, ReportStatus, ReportTarget, ValidationError};

use crate::db::{Report, ReportRepo, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, JsonBody};
use crate::http::server::AppState;

#[derive(Deserialize)]
pub struct CreateReportRequest {
    pub target_type: String,
    pub target_id: Option<i64>,
    /// Alternative to `target_id` for user reports
    pub reported_username: Option<String>,
    pub category: Option<String>,
    pub details: Option<String>,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub id: i64,
    pub reporter_id: i64,
    pub target_type: ReportTarget,
    pub target_id: i64,
    pub reason: String,
    pub status: ReportStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<Report> for ReportResponse {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            reporter_id: r.reporter_id,
            target_type: r.target_type,
            target_id: r.target_id,
            reason: r.reason,
            status: r.status,
            notes: r.notes,
            created_at: r.created_at,
            resolved_at: r.resolved_at,
        }
    }
}

/// POST /api/reports - report a listing or a user
async fn create_report(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    JsonBody(req): JsonBody<CreateReportRequest>,
) -> Result<(StatusCode, Json<ReportResponse>), ApiError> {
    let target: ReportTarget = req.target_type.parse()?;
    let reason = ReportReason::new(req.category.as_deref(), req.details.as_deref())?;

    let target_id = match (target, req.target_id, req.reported_username.as_deref()) {
        (_, Some(id), _) => id,
        (ReportTarget::User, None, Some(username)) => {
            UserRepo::new(&state.pool).get_by_username(username).await?.id
        }
        _ => return Err(ValidationError::Empty { field: "target_id" }.into()),
    };

    let report = ReportRepo::new(&state.pool)
        .create(user.id, target, target_id, reason)
        .await?;
    Ok((StatusCode::CREATED, Json(ReportResponse::from(report))))
}

/// Report routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/reports", post(create_report))
}
