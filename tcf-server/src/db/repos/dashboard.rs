//! Admin dashboard counters

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use tcf_core::{OrderStatus, ReportStatus, UserStatus};

use super::DbError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
    pub premium: i64,
    pub new_this_week: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ListingStats {
    pub total: i64,
    pub active: i64,
    pub sold: i64,
    pub new_this_week: i64,
}

/// Revenue counts orders that reached a sold status
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderStats {
    pub total: i64,
    pub completed: i64,
    pub this_week: i64,
    pub revenue_total: Decimal,
    pub revenue_this_month: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub users: UserStats,
    pub listings: ListingStats,
    pub orders: OrderStats,
    pub open_reports: i64,
    pub generated_at: DateTime<Utc>,
}

/// Midnight UTC on the first of `now`'s month.
pub(crate) fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Dashboard repository
pub struct DashboardRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Snapshot of marketplace counters. "This week" is the last seven days.
    pub async fn stats(&self, now: DateTime<Utc>) -> Result<DashboardStats, DbError> {
        let week_ago = now - Duration::days(7);

        let users: UserStats = sqlx::query_as(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = $1) AS active,
                   COUNT(*) FILTER (WHERE is_premium AND (premium_until IS NULL OR premium_until > $2)) AS premium,
                   COUNT(*) FILTER (WHERE created_at >= $3) AS new_this_week
            FROM users
            "#,
        )
        .bind(UserStatus::Active.as_str())
        .bind(now)
        .bind(week_ago)
        .fetch_one(self.pool)
        .await?;

        let listings: ListingStats = sqlx::query_as(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE listed AND NOT sold) AS active,
                   COUNT(*) FILTER (WHERE sold) AS sold,
                   COUNT(*) FILTER (WHERE created_at >= $1) AS new_this_week
            FROM listings
            "#,
        )
        .bind(week_ago)
        .fetch_one(self.pool)
        .await?;

        let orders: OrderStats = sqlx::query_as(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = ANY($1)) AS completed,
                   COUNT(*) FILTER (WHERE created_at >= $2) AS this_week,
                   COALESCE(SUM(total_amount) FILTER (WHERE status = ANY($1)), 0) AS revenue_total,
                   COALESCE(SUM(total_amount) FILTER (WHERE status = ANY($1) AND created_at >= $3), 0)
                       AS revenue_this_month
            FROM orders
            "#,
        )
        .bind(OrderStatus::sold_statuses())
        .bind(week_ago)
        .bind(month_start(now))
        .fetch_one(self.pool)
        .await?;

        let open_reports: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE status = $1")
            .bind(ReportStatus::Open.as_str())
            .fetch_one(self.pool)
            .await?;

        Ok(DashboardStats {
            users,
            listings,
            orders,
            open_reports,
            generated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_start_is_first_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 3, 17, 15, 42, 9).unwrap();
        assert_eq!(month_start(now), Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
        let first = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(month_start(first), first);
    }
}
