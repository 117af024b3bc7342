//! Premium pricing plans

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use super::DbError;

#[derive(Debug, Clone, FromRow)]
pub struct PricingPlan {
    pub id: i64,
    pub name: String,
    pub months: i32,
    pub price: Decimal,
    pub free_promotions_per_month: i32,
    pub description: Option<String>,
}

pub struct PricingPlanRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> PricingPlanRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Plans on sale, shortest first.
    pub async fn list(&self) -> Result<Vec<PricingPlan>, DbError> {
        let plans = sqlx::query_as(
            r#"
            SELECT id, name, months, price, free_promotions_per_month, description
            FROM pricing_plans
            WHERE active
            ORDER BY months, price
            "#,
        )
        .fetch_all(self.pool)
        .await?;
        Ok(plans)
    }
}
