//! Moderation report repository

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};

use tcf_core::{Paginated, Pagination, ReportReason, ReportStatus, ReportTarget};

use super::DbError;

const REPORT_COLUMNS: &str = r#"
    id, reporter_id, target_type, target_id, reason, status, notes, created_at, resolved_at
"#;

/// Report record from database
#[derive(Debug, Clone, FromRow)]
pub struct Report {
    pub id: i64,
    pub reporter_id: i64,
    #[sqlx(try_from = "String")]
    pub target_type: ReportTarget,
    pub target_id: i64,
    pub reason: String,
    #[sqlx(try_from = "String")]
    pub status: ReportStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Moderator changes; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct ReportUpdate {
    pub status: Option<ReportStatus>,
    pub notes: Option<String>,
}

impl ReportUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.notes.is_none()
    }
}

/// Report repository
pub struct ReportRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ReportRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// File a report against a listing or a user. The target must exist.
    pub async fn create(
        &self,
        reporter_id: i64,
        target: ReportTarget,
        target_id: i64,
        reason: ReportReason,
    ) -> Result<Report, DbError> {
        if target == ReportTarget::User && target_id == reporter_id {
            return Err(DbError::conflict("cannot report yourself"));
        }

        let sql = match target {
            ReportTarget::Listing => "SELECT EXISTS(SELECT 1 FROM listings WHERE id = $1)",
            ReportTarget::User => "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)",
        };
        let exists: bool = sqlx::query_scalar(sql)
            .bind(target_id)
            .fetch_one(self.pool)
            .await?;
        if !exists {
            let resource = match target {
                ReportTarget::Listing => "listing",
                ReportTarget::User => "user",
            };
            return Err(DbError::not_found(resource, target_id));
        }

        let report: Report = sqlx::query_as(&format!(
            r#"
            INSERT INTO reports (reporter_id, target_type, target_id, reason)
            VALUES ($1, $2, $3, $4)
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(reporter_id)
        .bind(target.as_str())
        .bind(target_id)
        .bind(reason.as_str())
        .fetch_one(self.pool)
        .await?;

        tracing::info!(
            report_id = report.id,
            reporter_id,
            %target,
            target_id,
            "report filed"
        );
        Ok(report)
    }

    /// Reports for moderators, newest first, optionally by status.
    pub async fn list(
        &self,
        status: Option<ReportStatus>,
        page: Pagination,
    ) -> Result<Paginated<Report>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {REPORT_COLUMNS}, COUNT(*) OVER() AS total
            FROM reports
            WHERE $1::text IS NULL OR status = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(Report::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(page.wrap(items, total))
    }

    /// Change status and notes. Closing stamps `resolved_at` once; reopening
    /// clears it.
    pub async fn update(
        &self,
        id: i64,
        update: ReportUpdate,
        now: DateTime<Utc>,
    ) -> Result<Report, DbError> {
        sqlx::query_as(&format!(
            r#"
            UPDATE reports
            SET status = COALESCE($2, status),
                notes = COALESCE($3, notes),
                resolved_at = CASE
                    WHEN $2::text IS NULL THEN resolved_at
                    WHEN $4 THEN COALESCE(resolved_at, $5)
                    ELSE NULL
                END
            WHERE id = $1
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.notes)
        .bind(update.status.is_some_and(|s| s.is_closed()))
        .bind(now)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("report", id))
    }
}
