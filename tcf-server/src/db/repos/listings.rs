//! Listing repository

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgConnection, PgPool, Row};

use tcf_core::{
    Condition, ImageUrls, ListingEffect, ListingName, ListingState, OrderStatus, Paginated,
    Pagination, Price,
};

use super::{Caller, DbError};

pub(crate) const LISTING_COLUMNS: &str = r#"
    l.id, l.seller_id, l.name, l.description, l.price, l.condition_type, l.brand,
    l.size, l.category, l.image_urls, l.listed, l.sold, l.sold_at, l.created_at,
    l.updated_at
"#;

/// Listing record from database
#[derive(Debug, Clone, FromRow)]
pub struct Listing {
    pub id: i64,
    pub seller_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[sqlx(rename = "condition_type", try_from = "String")]
    pub condition: Condition,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub category: Option<String>,
    pub image_urls: Vec<String>,
    pub listed: bool,
    pub sold: bool,
    pub sold_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Only selected by the public feed
    #[sqlx(default)]
    pub is_promoted: bool,
}

impl Listing {
    pub fn state(&self) -> ListingState {
        ListingState {
            listed: self.listed,
            sold: self.sold,
            sold_at: self.sold_at,
        }
    }

    pub fn is_owned_by(&self, caller: Caller) -> bool {
        self.seller_id == caller.user_id
    }
}

/// Validated input for a new listing
#[derive(Debug, Clone)]
pub struct NewListing {
    pub name: ListingName,
    pub description: Option<String>,
    pub price: Price,
    pub condition: Condition,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub category: Option<String>,
    pub image_urls: ImageUrls,
}

/// Partial update; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct ListingChanges {
    pub name: Option<ListingName>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub condition: Option<Condition>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub category: Option<String>,
    pub image_urls: Option<ImageUrls>,
    /// Owner hiding or re-showing an unsold listing
    pub listed: Option<bool>,
}

/// Which of a seller's listings to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShopFilter {
    /// On the feed: listed and unsold
    #[default]
    Active,
    Sold,
    All,
}

impl ShopFilter {
    fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Sold => "sold",
            Self::All => "all",
        }
    }
}

/// Lock a listing row for the rest of the transaction.
pub(crate) async fn lock_listing(conn: &mut PgConnection, id: i64) -> Result<Listing, DbError> {
    sqlx::query_as(&format!(
        "SELECT {LISTING_COLUMNS} FROM listings l WHERE l.id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("listing", id))
}

async fn fetch_listing(conn: &mut PgConnection, id: i64) -> Result<Listing, DbError> {
    sqlx::query_as(&format!("SELECT {LISTING_COLUMNS} FROM listings l WHERE l.id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("listing", id))
}

async fn has_open_order(conn: &mut PgConnection, listing_id: i64) -> Result<bool, DbError> {
    let open: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM orders WHERE listing_id = $1 AND status = ANY($2))",
    )
    .bind(listing_id)
    .bind(OrderStatus::open_statuses())
    .fetch_one(&mut *conn)
    .await?;
    Ok(open)
}

/// Apply an order's listing effect inside the order's transaction.
///
/// Zero affected rows is an error so the caller's transaction rolls back.
pub(crate) async fn apply_effect(
    conn: &mut PgConnection,
    listing_id: i64,
    effect: ListingEffect,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    let sql = match effect {
        ListingEffect::None => return Ok(()),
        ListingEffect::MarkSold => {
            r#"
            UPDATE listings
            SET sold = TRUE, listed = FALSE, sold_at = COALESCE(sold_at, $2), updated_at = $2
            WHERE id = $1
            RETURNING id
            "#
        }
        ListingEffect::Relist => {
            r#"
            UPDATE listings
            SET sold = FALSE, listed = TRUE, sold_at = NULL, updated_at = $2
            WHERE id = $1
            RETURNING id
            "#
        }
    };

    let updated: Option<i64> = sqlx::query_scalar(sql)
        .bind(listing_id)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

    if updated.is_none() {
        tracing::warn!(listing_id, ?effect, "listing update touched no rows");
        return Err(DbError::not_found("listing", listing_id));
    }
    Ok(())
}

/// Listing repository
pub struct ListingRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ListingRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, seller_id: i64, new: NewListing) -> Result<Listing, DbError> {
        let listing = sqlx::query_as(&format!(
            r#"
            INSERT INTO listings AS l (
                seller_id, name, description, price, condition_type, brand, size,
                category, image_urls
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {LISTING_COLUMNS}
            "#
        ))
        .bind(seller_id)
        .bind(new.name.as_str())
        .bind(new.description)
        .bind(new.price.amount())
        .bind(new.condition.as_str())
        .bind(new.brand)
        .bind(new.size)
        .bind(new.category)
        .bind(new.image_urls.into_inner())
        .fetch_one(self.pool)
        .await?;
        Ok(listing)
    }

    pub async fn get(&self, id: i64) -> Result<Listing, DbError> {
        let mut conn = self.pool.acquire().await?;
        fetch_listing(&mut conn, id).await
    }

    /// Marketplace feed: listed, unsold items, promoted ones first.
    pub async fn list_public(
        &self,
        search: Option<&str>,
        category: Option<&str>,
        page: Pagination,
    ) -> Result<Paginated<Listing>, DbError> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")));

        let rows = sqlx::query(&format!(
            r#"
            SELECT {LISTING_COLUMNS},
                   EXISTS(
                       SELECT 1 FROM listing_promotions p
                       WHERE p.listing_id = l.id AND p.status = 'ACTIVE' AND p.ends_at > NOW()
                   ) AS is_promoted,
                   COUNT(*) OVER() AS total
            FROM listings l
            WHERE l.listed AND NOT l.sold
              AND ($1::text IS NULL OR l.name ILIKE $1 OR l.brand ILIKE $1 OR l.description ILIKE $1)
              AND ($2::text IS NULL OR lower(l.category) = lower($2))
            ORDER BY is_promoted DESC, l.created_at DESC, l.id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(pattern)
        .bind(category)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(Listing::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(page.wrap(items, total))
    }

    /// A seller's listings, newest first. `All` includes sold and hidden items.
    pub async fn list_for_seller(
        &self,
        seller_id: i64,
        filter: ShopFilter,
        page: Pagination,
    ) -> Result<Paginated<Listing>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {LISTING_COLUMNS}, COUNT(*) OVER() AS total
            FROM listings l
            WHERE l.seller_id = $1
              AND CASE $2
                    WHEN 'active' THEN l.listed AND NOT l.sold
                    WHEN 'sold' THEN l.sold
                    ELSE TRUE
                  END
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(seller_id)
        .bind(filter.as_str())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(Listing::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(page.wrap(items, total))
    }

    /// Edit a listing. Sale state is owned by orders and cannot be set here.
    pub async fn update(
        &self,
        id: i64,
        caller: Caller,
        changes: ListingChanges,
    ) -> Result<Listing, DbError> {
        let mut tx = self.pool.begin().await?;
        let current = lock_listing(&mut tx, id).await?;

        if !current.is_owned_by(caller) && !caller.is_admin {
            return Err(DbError::forbidden("only the seller can edit this listing"));
        }
        if current.sold && changes.price.is_some() {
            return Err(DbError::conflict("a sold listing cannot be repriced"));
        }
        if changes.listed == Some(true) && current.sold {
            return Err(DbError::conflict("a sold listing cannot be relisted"));
        }
        // Cancelling the order decides visibility, so it cannot be changed meanwhile.
        if changes.listed.is_some() && has_open_order(&mut tx, id).await? {
            return Err(DbError::conflict("listing is reserved by an open order"));
        }

        sqlx::query(
            r#"
            UPDATE listings
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                condition_type = COALESCE($5, condition_type),
                brand = COALESCE($6, brand),
                size = COALESCE($7, size),
                category = COALESCE($8, category),
                image_urls = COALESCE($9, image_urls),
                listed = COALESCE($10, listed),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.name.as_ref().map(ListingName::as_str))
        .bind(changes.description)
        .bind(changes.price.map(|p| p.amount()))
        .bind(changes.condition.map(|c| c.as_str()))
        .bind(changes.brand)
        .bind(changes.size)
        .bind(changes.category)
        .bind(changes.image_urls.map(ImageUrls::into_inner))
        .bind(changes.listed)
        .execute(&mut *tx)
        .await?;

        let listing = fetch_listing(&mut tx, id).await?;
        tx.commit().await?;
        Ok(listing)
    }

    /// Delete a listing that has never been ordered.
    pub async fn delete(&self, id: i64, caller: Caller) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        let current = lock_listing(&mut tx, id).await?;

        if !current.is_owned_by(caller) && !caller.is_admin {
            return Err(DbError::forbidden("only the seller can delete this listing"));
        }
        if has_open_order(&mut tx, id).await? {
            return Err(DbError::conflict("listing has an open order"));
        }
        let has_history: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE listing_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if has_history {
            return Err(DbError::conflict(
                "listing has order history; unlist it instead",
            ));
        }

        sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(listing_id = id, "listing deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(seller_id: i64) -> Listing {
        Listing {
            id: 1,
            seller_id,
            name: "Denim jacket".into(),
            description: None,
            price: Decimal::new(4500, 2),
            condition: Condition::Good,
            brand: Some("Levi's".into()),
            size: Some("M".into()),
            category: Some("outerwear".into()),
            image_urls: vec![],
            listed: true,
            sold: false,
            sold_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_promoted: false,
        }
    }

    #[test]
    fn ownership() {
        let l = listing(3);
        assert!(l.is_owned_by(Caller::user(3)));
        assert!(!l.is_owned_by(Caller::admin(4)));
    }

    #[test]
    fn state_mirrors_flags() {
        let l = listing(3);
        assert_eq!(l.state(), ListingState::new_listed());
    }
}
