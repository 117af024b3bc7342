//! Review repository
//!
//! Each party of a completed order may review the other once. When the second
//! review lands the order moves to REVIEWED.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};

use tcf_core::{OrderStatus, Paginated, Pagination, Rating};

use super::orders::{apply_transition, lock_order_for};
use super::{Caller, DbError};

/// Review record from database
#[derive(Debug, Clone, FromRow)]
pub struct Review {
    pub id: i64,
    pub order_id: i64,
    pub reviewer_id: i64,
    pub reviewee_id: i64,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub reviewer_username: Option<String>,
}

/// Review repository
pub struct ReviewRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Review the other party of an order.
    pub async fn create(
        &self,
        order_id: i64,
        caller: Caller,
        rating: Rating,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Review, DbError> {
        let mut tx = self.pool.begin().await?;

        let (order, party) = lock_order_for(&mut tx, order_id, Caller::user(caller.user_id)).await?;
        if !order.status.is_reviewable() {
            return Err(DbError::conflict(format!(
                "orders can be reviewed once completed (status is {})",
                order.status
            )));
        }

        let reviewee_id = order.counterpart(caller.user_id);
        let review: Review = sqlx::query_as(
            r#"
            INSERT INTO reviews (order_id, reviewer_id, reviewee_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, order_id, reviewer_id, reviewee_id, rating, comment, created_at
            "#,
        )
        .bind(order_id)
        .bind(caller.user_id)
        .bind(reviewee_id)
        .bind(rating.value())
        .bind(comment)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::on_unique_violation(e, "you already reviewed this order"))?;

        let reviews: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE order_id = $1")
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;
        if reviews >= 2 && order.status == OrderStatus::Completed {
            apply_transition(&mut tx, &order, party, OrderStatus::Reviewed, now).await?;
        }

        sqlx::query(
            r#"
            UPDATE users u
            SET average_rating = agg.avg_rating,
                total_reviews = agg.total,
                updated_at = $2
            FROM (
                SELECT ROUND(AVG(rating)::numeric, 2) AS avg_rating, COUNT(*)::int AS total
                FROM reviews
                WHERE reviewee_id = $1
            ) agg
            WHERE u.id = $1
            "#,
        )
        .bind(reviewee_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(order_id, reviewer_id = caller.user_id, reviewee_id, "review posted");
        Ok(review)
    }

    /// Reviews on an order the caller is a party to.
    pub async fn list_for_order(&self, order_id: i64, caller: Caller) -> Result<Vec<Review>, DbError> {
        let visible: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1 AND ($2 OR buyer_id = $3 OR seller_id = $3))",
        )
        .bind(order_id)
        .bind(caller.is_admin)
        .bind(caller.user_id)
        .fetch_one(self.pool)
        .await?;
        if !visible {
            return Err(DbError::not_found("order", order_id));
        }

        let reviews = sqlx::query_as(
            r#"
            SELECT r.id, r.order_id, r.reviewer_id, r.reviewee_id, r.rating, r.comment,
                   r.created_at, u.username AS reviewer_username
            FROM reviews r
            JOIN users u ON u.id = r.reviewer_id
            WHERE r.order_id = $1
            ORDER BY r.created_at ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(reviews)
    }

    /// Public reviews received by a user.
    pub async fn list_for_user(
        &self,
        reviewee_id: i64,
        page: Pagination,
    ) -> Result<Paginated<Review>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.order_id, r.reviewer_id, r.reviewee_id, r.rating, r.comment,
                   r.created_at, u.username AS reviewer_username,
                   COUNT(*) OVER() AS total
            FROM reviews r
            JOIN users u ON u.id = r.reviewer_id
            WHERE r.reviewee_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(reviewee_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(Review::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(page.wrap(items, total))
    }
}
