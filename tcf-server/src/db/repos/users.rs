//! User repository
//!
//! Accounts are created by the auth provider; this table maps the provider's
//! subject id to a marketplace profile and holds role, status, premium and
//! review aggregates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool, Row};
use uuid::Uuid;

use tcf_core::promotion::{self, FreePromotionQuota, QuotaOutcome, QuotaState};
use tcf_core::{Paginated, Pagination, Role, UserStatus, Username};

use super::{Caller, DbError};

const USER_COLUMNS: &str = r#"
    id, auth_subject, username, email, role, status, is_premium, premium_until,
    free_promotions_used, free_promotions_reset_at, average_rating, total_reviews,
    avatar_url, created_at
"#;

/// User record from database
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub auth_subject: Uuid,
    pub username: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[sqlx(try_from = "String")]
    pub status: UserStatus,
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
    pub free_promotions_used: i32,
    pub free_promotions_reset_at: Option<DateTime<Utc>>,
    pub average_rating: Option<Decimal>,
    pub total_reviews: i32,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_suspended(&self) -> bool {
        self.status == UserStatus::Suspended
    }

    pub fn caller(&self) -> Caller {
        Caller {
            user_id: self.id,
            is_admin: self.is_admin(),
        }
    }

    pub fn quota_state(&self) -> QuotaState {
        QuotaState {
            is_premium: self.is_premium,
            premium_until: self.premium_until,
            used: self.free_promotions_used,
            reset_at: self.free_promotions_reset_at,
        }
    }

    pub fn has_active_premium(&self, now: DateTime<Utc>) -> bool {
        promotion::is_premium(self.is_premium, self.premium_until, now)
    }
}

/// What anyone can see about a seller
#[derive(Debug, Clone, FromRow)]
pub struct PublicProfile {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub average_rating: Option<Decimal>,
    pub total_reviews: i32,
    pub total_listings: i64,
    pub active_listings: i64,
    pub sold_listings: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields an administrator may change; `None` leaves the column alone
#[derive(Debug, Clone, Default)]
pub struct AdminUserUpdate {
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub is_premium: Option<bool>,
}

impl AdminUserUpdate {
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.status.is_none() && self.is_premium.is_none()
    }
}

/// Lock the user row and consume one free promotion.
///
/// Runs on the caller's transaction so promotion creation and the counter
/// update commit together.
pub(crate) async fn consume_free_promotion(
    conn: &mut PgConnection,
    user_id: i64,
    quota: FreePromotionQuota,
    now: DateTime<Utc>,
) -> Result<QuotaOutcome, DbError> {
    let user: User = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
    ))
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("user", user_id))?;

    let outcome = quota.consume(&user.quota_state(), now)?;

    sqlx::query(
        r#"
        UPDATE users
        SET free_promotions_used = $2,
            free_promotions_reset_at = CASE WHEN $3 THEN $4 ELSE free_promotions_reset_at END,
            updated_at = $4
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(outcome.used)
    .bind(outcome.was_reset)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(outcome)
}

/// User repository
pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up the profile for an auth provider subject.
    pub async fn find_by_auth_subject(&self, subject: Uuid) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE auth_subject = $1"
        ))
        .bind(subject)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    pub async fn get(&self, id: i64) -> Result<User, DbError> {
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("user", id))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User, DbError> {
        sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(username) = lower($1)"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("user", username))
    }

    /// Public profile with listing counts. Suspended accounts are hidden.
    pub async fn public_profile(&self, username: &str) -> Result<PublicProfile, DbError> {
        sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.avatar_url, u.average_rating, u.total_reviews,
                   COUNT(l.id) AS total_listings,
                   COUNT(l.id) FILTER (WHERE l.listed AND NOT l.sold) AS active_listings,
                   COUNT(l.id) FILTER (WHERE l.sold) AS sold_listings,
                   u.created_at
            FROM users u
            LEFT JOIN listings l ON l.seller_id = u.id
            WHERE lower(u.username) = lower($1) AND u.status = $2
            GROUP BY u.id
            "#,
        )
        .bind(username)
        .bind(UserStatus::Active.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("user", username))
    }

    /// Create the marketplace profile for a verified provider account.
    pub async fn register(
        &self,
        subject: Uuid,
        username: Username,
        email: &str,
    ) -> Result<User, DbError> {
        sqlx::query_as(&format!(
            r#"
            INSERT INTO users (auth_subject, username, email)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(subject)
        .bind(username.as_str())
        .bind(email)
        .fetch_one(self.pool)
        .await
        .map_err(|e| DbError::on_unique_violation(e, "account or username already registered"))
    }

    /// List users for the admin dashboard, optionally filtered by a
    /// case-insensitive match on username or email.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: Pagination,
    ) -> Result<Paginated<User>, DbError> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")));

        let rows = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}, COUNT(*) OVER() AS total
            FROM users
            WHERE $1::text IS NULL OR username ILIKE $1 OR email ILIKE $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(pattern)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(User::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(page.wrap(items, total))
    }

    /// Apply an admin edit. Granting premium without an end date makes it
    /// open-ended; revoking clears the end date.
    pub async fn update_admin(&self, id: i64, update: AdminUserUpdate) -> Result<User, DbError> {
        sqlx::query_as(&format!(
            r#"
            UPDATE users
            SET role = COALESCE($2, role),
                status = COALESCE($3, status),
                is_premium = COALESCE($4, is_premium),
                premium_until = CASE WHEN $4 = FALSE THEN NULL ELSE premium_until END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.role.map(|r| r.as_str()))
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.is_premium)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("user", id))
    }

    /// Buy `months` of premium. The free promotion counter starts over.
    pub async fn upgrade_premium(
        &self,
        id: i64,
        months: u32,
        now: DateTime<Utc>,
    ) -> Result<User, DbError> {
        let mut tx = self.pool.begin().await?;

        let current: User = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("user", id))?;

        let active_until = current.premium_until.filter(|_| current.is_premium);
        let until = promotion::extend_premium(active_until, months, now)?;

        let user = sqlx::query_as(&format!(
            r#"
            UPDATE users
            SET is_premium = TRUE,
                premium_until = $2,
                free_promotions_used = 0,
                free_promotions_reset_at = $3,
                updated_at = $3
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(until)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(user_id = id, %until, "premium upgraded");
        Ok(user)
    }

    /// Consume one free promotion from the monthly allowance.
    pub async fn use_free_promotion(
        &self,
        id: i64,
        quota: FreePromotionQuota,
        now: DateTime<Utc>,
    ) -> Result<QuotaOutcome, DbError> {
        let mut tx = self.pool.begin().await?;
        let outcome = consume_free_promotion(&mut tx, id, quota, now).await?;
        tx.commit().await?;
        Ok(outcome)
    }
}
