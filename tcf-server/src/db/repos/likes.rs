//! Liked listings

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};

use tcf_core::{LikeAction, Paginated, Pagination};

use super::listings::{Listing, LISTING_COLUMNS};
use super::DbError;

/// A listing the user liked, with when they liked it
#[derive(Debug, Clone)]
pub struct LikedListing {
    pub listing: Listing,
    pub liked_at: DateTime<Utc>,
}

/// Like repository
pub struct LikeRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> LikeRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Like or unlike. Both are idempotent; returns whether the listing is
    /// now liked.
    pub async fn apply(
        &self,
        user_id: i64,
        listing_id: i64,
        action: LikeAction,
    ) -> Result<bool, DbError> {
        match action {
            LikeAction::Like => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM listings WHERE id = $1)")
                        .bind(listing_id)
                        .fetch_one(self.pool)
                        .await?;
                if !exists {
                    return Err(DbError::not_found("listing", listing_id));
                }
                sqlx::query(
                    r#"
                    INSERT INTO user_likes (user_id, listing_id)
                    VALUES ($1, $2)
                    ON CONFLICT (user_id, listing_id) DO NOTHING
                    "#,
                )
                .bind(user_id)
                .bind(listing_id)
                .execute(self.pool)
                .await?;
            }
            LikeAction::Unlike => {
                sqlx::query("DELETE FROM user_likes WHERE user_id = $1 AND listing_id = $2")
                    .bind(user_id)
                    .bind(listing_id)
                    .execute(self.pool)
                    .await?;
            }
        }

        tracing::debug!(user_id, listing_id, ?action, "like updated");
        Ok(action.liked())
    }

    /// The user's liked listings, most recently liked first.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        page: Pagination,
    ) -> Result<Paginated<LikedListing>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {LISTING_COLUMNS}, ul.created_at AS liked_at, COUNT(*) OVER() AS total
            FROM user_likes ul
            JOIN listings l ON l.id = ul.listing_id
            WHERE ul.user_id = $1
            ORDER BY ul.created_at DESC, l.id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(|row| {
                Ok(LikedListing {
                    listing: Listing::from_row(row)?,
                    liked_at: row.try_get("liked_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(page.wrap(items, total))
    }
}
