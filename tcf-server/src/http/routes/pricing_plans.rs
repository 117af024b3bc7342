//! Public premium plan catalogue

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::{PricingPlan, PricingPlanRepo};
use crate::http::error::ApiError;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct PricingPlanResponse {
    pub id: i64,
    pub name: String,
    pub months: i32,
    pub price: Decimal,
    pub free_promotions_per_month: i32,
    pub description: Option<String>,
}

impl From<PricingPlan> for PricingPlanResponse {
    fn from(p: PricingPlan) -> Self {
        Self {
            id: p.id,
            name: p.name,
            months: p.months,
            price: p.price,
            free_promotions_per_month: p.free_promotions_per_month,
            description: p.description,
        }
    }
}

/// GET /api/pricing-plans
async fn list_plans(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PricingPlanResponse>>, ApiError> {
    let plans = PricingPlanRepo::new(&state.pool).list().await?;
    Ok(Json(plans.into_iter().map(PricingPlanResponse::from).collect()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/pricing-plans", get(list_plans))
}
