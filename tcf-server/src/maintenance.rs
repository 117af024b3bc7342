//! Consistency checks and repairs
//!
//! The order state machine keeps listings and conversations consistent for
//! every write it makes. These jobs find rows that drifted anyway (manual SQL,
//! data imported from older versions) and fix them. Every job can run as a
//! dry run that only reports.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};

use tcf_core::OrderStatus;

use crate::db::{DbError, PromotionRepo};

/// A listing whose flags disagree with its orders
#[derive(Debug, Clone, Serialize)]
pub struct ListingDrift {
    pub listing_id: i64,
    pub order_id: i64,
    pub order_status: String,
    pub listed: bool,
    pub sold: bool,
}

/// A conversation whose `last_message_at` is not its latest message time
#[derive(Debug, Clone, Serialize)]
pub struct TimestampDrift {
    pub conversation_id: i64,
    pub stored: Option<DateTime<Utc>>,
    pub actual: Option<DateTime<Utc>>,
    /// `actual - stored` in seconds, when both are present
    pub drift_secs: Option<i64>,
}

impl TimestampDrift {
    fn new(conversation_id: i64, stored: Option<DateTime<Utc>>, actual: Option<DateTime<Utc>>) -> Self {
        let drift_secs = match (stored, actual) {
            (Some(stored), Some(actual)) => Some((actual - stored).num_seconds()),
            _ => None,
        };
        Self {
            conversation_id,
            stored,
            actual,
            drift_secs,
        }
    }
}

/// Result of a maintenance run
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaintenanceReport {
    pub dry_run: bool,
    /// Sold orders whose listing is not marked sold
    pub sold_listings: Vec<ListingDrift>,
    /// Open orders whose listing is still on the feed
    pub reserved_listings: Vec<ListingDrift>,
    pub conversations: Vec<TimestampDrift>,
    pub expired_promotions: Vec<i64>,
}

impl MaintenanceReport {
    pub fn issue_count(&self) -> usize {
        self.sold_listings.len()
            + self.reserved_listings.len()
            + self.conversations.len()
            + self.expired_promotions.len()
    }

    pub fn is_clean(&self) -> bool {
        self.issue_count() == 0
    }
}

fn listing_drift(row: &sqlx::postgres::PgRow) -> ListingDrift {
    ListingDrift {
        listing_id: row.get("listing_id"),
        order_id: row.get("order_id"),
        order_status: row.get("order_status"),
        listed: row.get("listed"),
        sold: row.get("sold"),
    }
}

/// Mark listings sold when one of their orders has reached a sold status.
///
/// `sold_at` keeps an existing value, otherwise takes the order's last update.
pub async fn reconcile_sold_listings(pool: &PgPool, dry_run: bool) -> Result<Vec<ListingDrift>, DbError> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        r#"
        SELECT l.id AS listing_id, l.listed, l.sold,
               o.id AS order_id, o.status AS order_status, o.updated_at AS order_updated_at
        FROM listings l
        JOIN LATERAL (
            SELECT id, status, updated_at FROM orders
            WHERE listing_id = l.id AND status = ANY($1)
            ORDER BY updated_at ASC
            LIMIT 1
        ) o ON TRUE
        WHERE NOT l.sold OR l.listed OR l.sold_at IS NULL
        ORDER BY l.id
        FOR UPDATE OF l
        "#,
    )
    .bind(OrderStatus::sold_statuses())
    .fetch_all(&mut *tx)
    .await?;

    let drift: Vec<ListingDrift> = rows.iter().map(listing_drift).collect();

    if !dry_run {
        for row in &rows {
            let listing_id: i64 = row.get("listing_id");
            let sold_at: DateTime<Utc> = row.get("order_updated_at");
            sqlx::query(
                r#"
                UPDATE listings
                SET sold = TRUE, listed = FALSE, sold_at = COALESCE(sold_at, $2), updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(listing_id)
            .bind(sold_at)
            .execute(&mut *tx)
            .await?;
        }
    }
    tx.commit().await?;

    if !drift.is_empty() {
        tracing::warn!(count = drift.len(), dry_run, "sold listings out of sync");
    }
    Ok(drift)
}

/// Take listings off the feed while an unsold order holds them.
pub async fn reconcile_open_orders(pool: &PgPool, dry_run: bool) -> Result<Vec<ListingDrift>, DbError> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        r#"
        SELECT l.id AS listing_id, l.listed, l.sold, o.id AS order_id, o.status AS order_status
        FROM listings l
        JOIN orders o ON o.listing_id = l.id AND o.status = ANY($1)
        WHERE l.listed
        ORDER BY l.id
        FOR UPDATE OF l
        "#,
    )
    .bind(OrderStatus::open_statuses())
    .fetch_all(&mut *tx)
    .await?;

    let drift: Vec<ListingDrift> = rows.iter().map(listing_drift).collect();

    if !dry_run && !drift.is_empty() {
        let ids: Vec<i64> = drift.iter().map(|d| d.listing_id).collect();
        sqlx::query("UPDATE listings SET listed = FALSE, updated_at = NOW() WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    if !drift.is_empty() {
        tracing::warn!(count = drift.len(), dry_run, "reserved listings still on the feed");
    }
    Ok(drift)
}

/// Set each conversation's `last_message_at` to its newest message.
pub async fn reconcile_last_message_at(
    pool: &PgPool,
    dry_run: bool,
) -> Result<Vec<TimestampDrift>, DbError> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.last_message_at, m.latest
        FROM conversations c
        LEFT JOIN LATERAL (
            SELECT MAX(created_at) AS latest FROM messages WHERE conversation_id = c.id
        ) m ON TRUE
        WHERE c.last_message_at IS DISTINCT FROM m.latest
        ORDER BY c.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let drift: Vec<TimestampDrift> = rows
        .iter()
        .map(|r| TimestampDrift::new(r.get("id"), r.get("last_message_at"), r.get("latest")))
        .collect();

    if !dry_run && !drift.is_empty() {
        sqlx::query(
            r#"
            UPDATE conversations c
            SET last_message_at = (SELECT MAX(created_at) FROM messages WHERE conversation_id = c.id)
            WHERE c.id = ANY($1)
            "#,
        )
        .bind(drift.iter().map(|d| d.conversation_id).collect::<Vec<_>>())
        .execute(pool)
        .await?;
    }

    if !drift.is_empty() {
        tracing::warn!(count = drift.len(), dry_run, "conversation timestamps out of sync");
    }
    Ok(drift)
}

/// End active promotions whose time is up.
pub async fn expire_promotions(
    pool: &PgPool,
    now: DateTime<Utc>,
    dry_run: bool,
) -> Result<Vec<i64>, DbError> {
    let repo = PromotionRepo::new(pool);
    let due: Vec<i64> = repo.find_due(now).await?.into_iter().map(|p| p.id).collect();

    if !dry_run && !due.is_empty() {
        let expired = repo.expire_due(now).await?;
        tracing::info!(expired, "promotions expired");
    }
    Ok(due)
}

/// Run every job in order.
pub async fn run_all(pool: &PgPool, now: DateTime<Utc>, dry_run: bool) -> Result<MaintenanceReport, DbError> {
    let report = MaintenanceReport {
        dry_run,
        sold_listings: reconcile_sold_listings(pool, dry_run).await?,
        reserved_listings: reconcile_open_orders(pool, dry_run).await?,
        conversations: reconcile_last_message_at(pool, dry_run).await?,
        expired_promotions: expire_promotions(pool, now, dry_run).await?,
    };

    tracing::info!(issues = report.issue_count(), dry_run, "maintenance finished");
    Ok(report)
}
