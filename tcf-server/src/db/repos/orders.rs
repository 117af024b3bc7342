//! Order repository
//!
//! Every status change runs through [`tcf_core::plan_transition`] and writes
//! the order, its listing, promotions and the order conversation in one
//! transaction. Nothing else in the crate updates `orders.status`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgConnection, PgPool, Row};

use tcf_core::{
    order_number, plan_transition, ConversationKind, ListingEffect, OrderStatus, OrderTotals,
    Paginated, Pagination, Party, PromotionStatus,
};

use super::conversations::{ensure_conversation, find_between, post_system_message};
use super::listings::{apply_effect, lock_listing};
use super::{Caller, DbError};

const ORDER_COLUMNS: &str = r#"
    o.id, o.order_number, o.buyer_id, o.seller_id, o.listing_id, o.status, o.quantity,
    o.unit_price, o.subtotal, o.shipping_fee, o.tax_amount, o.total_amount, o.currency,
    o.shipping_method, o.notes, o.created_at, o.updated_at, o.shipped_at,
    o.delivered_at, o.completed_at, o.cancelled_at
"#;

/// Order record from database
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub listing_id: i64,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub shipping_method: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Joined in list queries
    #[sqlx(default)]
    pub listing_name: Option<String>,
}

impl Order {
    pub fn party(&self, caller: Caller) -> Party {
        Party::resolve(&caller.user_id, caller.is_admin, &self.buyer_id, &self.seller_id)
    }

    /// The other side of the order from `user_id`.
    pub fn counterpart(&self, user_id: i64) -> i64 {
        if self.buyer_id == user_id {
            self.seller_id
        } else {
            self.buyer_id
        }
    }
}

/// Which side of the order the user is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderRole {
    #[serde(alias = "buyer", alias = "purchases")]
    Buy,
    #[serde(alias = "seller", alias = "sales")]
    Sell,
    #[default]
    All,
}

/// Filter for order lists
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub role: OrderRole,
    pub status: Option<OrderStatus>,
}

async fn lock_order(conn: &mut PgConnection, id: i64) -> Result<Order, DbError> {
    sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("order", id))
}

pub(crate) async fn lock_order_for(
    conn: &mut PgConnection,
    id: i64,
    caller: Caller,
) -> Result<(Order, Party), DbError> {
    let order = lock_order(conn, id).await?;
    let party = order.party(caller);
    if party == Party::Stranger {
        return Err(DbError::not_found("order", id));
    }
    Ok((order, party))
}

/// Move a locked order to `target` and apply every side effect.
///
/// The caller owns the transaction; any error here must abort it.
pub(crate) async fn apply_transition(
    conn: &mut PgConnection,
    order: &Order,
    party: Party,
    target: OrderStatus,
    now: DateTime<Utc>,
) -> Result<Order, DbError> {
    let plan = plan_transition(order.status, party, target)?;

    let updated: Order = sqlx::query_as(&format!(
        r#"
        UPDATE orders AS o
        SET status = $2,
            updated_at = $3,
            shipped_at = CASE WHEN $4 THEN COALESCE(shipped_at, $3) ELSE shipped_at END,
            delivered_at = CASE WHEN $5 THEN COALESCE(delivered_at, $3) ELSE delivered_at END,
            completed_at = CASE WHEN $6 THEN COALESCE(completed_at, $3) ELSE completed_at END,
            cancelled_at = CASE WHEN $7 THEN $3 ELSE cancelled_at END
        WHERE id = $1
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(order.id)
    .bind(plan.to.as_str())
    .bind(now)
    .bind(plan.marks_shipped())
    .bind(plan.marks_delivered())
    .bind(plan.marks_completed())
    .bind(plan.to == OrderStatus::Cancelled)
    .fetch_one(&mut *conn)
    .await?;

    apply_effect(conn, order.listing_id, plan.listing_effect, now).await?;

    if plan.listing_effect == ListingEffect::MarkSold {
        let expired = sqlx::query(
            r#"
            UPDATE listing_promotions
            SET status = $2, ends_at = LEAST(ends_at, $3)
            WHERE listing_id = $1 AND status = $4
            "#,
        )
        .bind(order.listing_id)
        .bind(PromotionStatus::Expired.as_str())
        .bind(now)
        .bind(PromotionStatus::Active.as_str())
        .execute(&mut *conn)
        .await?
        .rows_affected();
        if expired > 0 {
            tracing::debug!(listing_id = order.listing_id, expired, "promotions ended by sale");
        }
    }

    if let Some(conversation) = find_between(
        conn,
        order.buyer_id,
        order.seller_id,
        Some(order.listing_id),
        ConversationKind::Order,
    )
    .await?
    {
        post_system_message(conn, conversation.id, plan.to.system_message(), now).await?;
    }

    tracing::info!(
        order_id = order.id,
        from = %plan.from,
        to = %plan.to,
        %party,
        "order status changed"
    );
    Ok(updated)
}

/// Order repository
pub struct OrderRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order for a listing and reserve it.
    ///
    /// Listings are single items, so the order is for one unit and the
    /// listing leaves the feed until the order is cancelled.
    pub async fn create(
        &self,
        buyer_id: i64,
        listing_id: i64,
        shipping_method: Option<String>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Order, DbError> {
        let mut tx = self.pool.begin().await?;

        let listing = lock_listing(&mut tx, listing_id).await?;
        if listing.seller_id == buyer_id {
            return Err(DbError::conflict("cannot buy your own listing"));
        }
        if !listing.state().is_available() {
            return Err(DbError::conflict("listing is not available"));
        }

        let totals = OrderTotals::compute(listing.price, 1);
        let number = order_number(now, rand::random::<u16>());

        let order: Order = sqlx::query_as(&format!(
            r#"
            INSERT INTO orders AS o (
                order_number, buyer_id, seller_id, listing_id, status, quantity, unit_price,
                subtotal, shipping_fee, tax_amount, total_amount, currency, shipping_method,
                notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, 1, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(&number)
        .bind(buyer_id)
        .bind(listing.seller_id)
        .bind(listing_id)
        .bind(OrderStatus::Pending.as_str())
        .bind(listing.price)
        .bind(totals.subtotal)
        .bind(totals.shipping_fee)
        .bind(totals.tax_amount)
        .bind(totals.total_amount)
        .bind(tcf_core::pricing::CURRENCY)
        .bind(shipping_method)
        .bind(notes)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::on_unique_violation(e, "listing already has an open order"))?;

        let reserved: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE listings SET listed = FALSE, updated_at = $2
            WHERE id = $1 AND listed AND NOT sold
            RETURNING id
            "#,
        )
        .bind(listing_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;
        if reserved.is_none() {
            return Err(DbError::conflict("listing is not available"));
        }

        let conversation = ensure_conversation(
            &mut tx,
            buyer_id,
            listing.seller_id,
            Some(listing_id),
            ConversationKind::Order,
        )
        .await?;
        post_system_message(
            &mut tx,
            conversation.id,
            OrderStatus::Pending.system_message(),
            now,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            listing_id,
            buyer_id,
            "order placed"
        );
        Ok(order)
    }

    /// Fetch an order the caller is a party to (admins see every order).
    pub async fn get_for_party(&self, id: i64, caller: Caller) -> Result<Order, DbError> {
        let order: Order = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("order", id))?;

        if order.party(caller) == Party::Stranger {
            return Err(DbError::not_found("order", id));
        }
        Ok(order)
    }

    /// Orders the user bought, sold, or both.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        filter: OrderFilter,
        page: Pagination,
    ) -> Result<Paginated<Order>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}, l.name AS listing_name, COUNT(*) OVER() AS total
            FROM orders o
            JOIN listings l ON l.id = o.listing_id
            WHERE CASE $2
                    WHEN 'buy' THEN o.buyer_id = $1
                    WHEN 'sell' THEN o.seller_id = $1
                    ELSE o.buyer_id = $1 OR o.seller_id = $1
                  END
              AND ($3::text IS NULL OR o.status = $3)
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(user_id)
        .bind(match filter.role {
            OrderRole::Buy => "buy",
            OrderRole::Sell => "sell",
            OrderRole::All => "all",
        })
        .bind(filter.status.map(|s| s.as_str()))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        collect_page(rows, page)
    }

    /// Every order, for the admin transactions view.
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
        page: Pagination,
    ) -> Result<Paginated<Order>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}, l.name AS listing_name, COUNT(*) OVER() AS total
            FROM orders o
            JOIN listings l ON l.id = o.listing_id
            WHERE $1::text IS NULL OR o.status = $1
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        collect_page(rows, page)
    }

    /// Change an order's status on behalf of `caller`.
    pub async fn transition(
        &self,
        id: i64,
        caller: Caller,
        target: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Order, DbError> {
        let mut tx = self.pool.begin().await?;

        let order = lock_order(&mut tx, id).await?;
        let party = order.party(caller);
        let updated = apply_transition(&mut tx, &order, party, target, now).await?;

        tx.commit().await?;
        Ok(updated)
    }
}

fn collect_page(
    rows: Vec<sqlx::postgres::PgRow>,
    page: Pagination,
) -> Result<Paginated<Order>, DbError> {
    let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
    let items = rows
        .iter()
        .map(Order::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(page.wrap(items, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order {
            id: 1,
            order_number: "TOP-1-001".into(),
            buyer_id: 10,
            seller_id: 20,
            listing_id: 5,
            status: OrderStatus::Pending,
            quantity: 1,
            unit_price: Decimal::new(5000, 2),
            subtotal: Decimal::new(5000, 2),
            shipping_fee: Decimal::new(800, 2),
            tax_amount: Decimal::new(400, 2),
            total_amount: Decimal::new(6200, 2),
            currency: "USD".into(),
            shipping_method: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            shipped_at: None,
            delivered_at: None,
            completed_at: None,
            cancelled_at: None,
            listing_name: None,
        }
    }

    #[test]
    fn party_resolution() {
        let o = order();
        assert_eq!(o.party(Caller::user(10)), Party::Buyer);
        assert_eq!(o.party(Caller::user(20)), Party::Seller);
        assert_eq!(o.party(Caller::admin(99)), Party::Admin);
        assert_eq!(o.party(Caller::user(99)), Party::Stranger);
        assert_eq!(o.counterpart(10), 20);
    }

    #[test]
    fn order_role_accepts_legacy_names() {
        let role: OrderRole = serde_json::from_str("\"purchases\"").unwrap();
        assert_eq!(role, OrderRole::Buy);
        let role: OrderRole = serde_json::from_str("\"sell\"").unwrap();
        assert_eq!(role, OrderRole::Sell);
    }
}
