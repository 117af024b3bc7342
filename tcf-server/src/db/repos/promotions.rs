//! Listing promotion repository

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};

use tcf_core::promotion::{promotion_end, FreePromotionQuota};
use tcf_core::{Paginated, Pagination, PromotionStatus};

use super::listings::lock_listing;
use super::users::consume_free_promotion;
use super::{Caller, DbError};

const PROMOTION_COLUMNS: &str = r#"
    id, listing_id, seller_id, status, starts_at, ends_at, used_free_credit, created_at
"#;

/// Promotion record from database
#[derive(Debug, Clone, FromRow)]
pub struct Promotion {
    pub id: i64,
    pub listing_id: i64,
    pub seller_id: i64,
    #[sqlx(try_from = "String")]
    pub status: PromotionStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub used_free_credit: bool,
    pub created_at: DateTime<Utc>,
}

/// Request to promote a listing
#[derive(Debug, Clone, Copy)]
pub struct NewPromotion {
    pub listing_id: i64,
    pub days: u32,
    /// Pay with one of the seller's monthly free promotions
    pub use_free_credit: bool,
}

/// Promotion repository
pub struct PromotionRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> PromotionRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Promote a listing. A free credit, if used, is consumed from the
    /// seller's quota in the same transaction.
    pub async fn create(
        &self,
        caller: Caller,
        new: NewPromotion,
        quota: FreePromotionQuota,
        now: DateTime<Utc>,
    ) -> Result<Promotion, DbError> {
        let ends_at = promotion_end(now, new.days)?;

        let mut tx = self.pool.begin().await?;
        let listing = lock_listing(&mut tx, new.listing_id).await?;

        if !listing.is_owned_by(caller) && !caller.is_admin {
            return Err(DbError::forbidden("only the seller can promote this listing"));
        }
        if listing.sold {
            return Err(DbError::conflict("a sold listing cannot be promoted"));
        }

        // Lapsed rows the sweeper has not reached yet must not block a new one.
        let lapsed = sqlx::query(
            r#"
            UPDATE listing_promotions SET status = $1
            WHERE listing_id = $2 AND status = $3 AND ends_at <= $4
            "#,
        )
        .bind(PromotionStatus::Expired.as_str())
        .bind(new.listing_id)
        .bind(PromotionStatus::Active.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if lapsed > 0 {
            tracing::debug!(listing_id = new.listing_id, lapsed, "expired lapsed promotion");
        }

        let active: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM listing_promotions WHERE listing_id = $1 AND status = $2)",
        )
        .bind(new.listing_id)
        .bind(PromotionStatus::Active.as_str())
        .fetch_one(&mut *tx)
        .await?;
        if active {
            return Err(DbError::conflict("listing already has an active promotion"));
        }

        if new.use_free_credit {
            let outcome = consume_free_promotion(&mut tx, listing.seller_id, quota, now).await?;
            tracing::debug!(
                seller_id = listing.seller_id,
                remaining = outcome.remaining,
                "free promotion credit used"
            );
        }

        let promotion = sqlx::query_as(&format!(
            r#"
            INSERT INTO listing_promotions
                (listing_id, seller_id, status, starts_at, ends_at, used_free_credit, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $4)
            RETURNING {PROMOTION_COLUMNS}
            "#
        ))
        .bind(new.listing_id)
        .bind(listing.seller_id)
        .bind(PromotionStatus::Active.as_str())
        .bind(now)
        .bind(ends_at)
        .bind(new.use_free_credit)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::on_unique_violation(e, "listing already has an active promotion"))?;

        tx.commit().await?;
        tracing::info!(listing_id = new.listing_id, days = new.days, "listing promoted");
        Ok(promotion)
    }

    /// All promotions, newest first, optionally by status.
    pub async fn list(
        &self,
        status: Option<PromotionStatus>,
        page: Pagination,
    ) -> Result<Paginated<Promotion>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PROMOTION_COLUMNS}, COUNT(*) OVER() AS total
            FROM listing_promotions
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
            .map(Promotion::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(page.wrap(items, total))
    }

    /// Active promotions whose end time has passed.
    pub async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Promotion>, DbError> {
        let due = sqlx::query_as(&format!(
            r#"
            SELECT {PROMOTION_COLUMNS}
            FROM listing_promotions
            WHERE status = $1 AND ends_at <= $2
            ORDER BY ends_at
            "#
        ))
        .bind(PromotionStatus::Active.as_str())
        .bind(now)
        .fetch_all(self.pool)
        .await?;
        Ok(due)
    }

    /// Expire every active promotion whose end time has passed.
    pub async fn expire_due(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
        let expired = sqlx::query(
            "UPDATE listing_promotions SET status = $1 WHERE status = $2 AND ends_at <= $3",
        )
        .bind(PromotionStatus::Expired.as_str())
        .bind(PromotionStatus::Active.as_str())
        .bind(now)
        .execute(self.pool)
        .await?
        .rows_affected();
        Ok(expired)
    }
}
