//! Order totals and order numbers

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Currency of every order
pub const CURRENCY: &str = "USD";

/// Flat shipping fee per order, in dollars
fn shipping_fee() -> Decimal {
    Decimal::new(800, 2)
}

/// Sales tax rate applied to the subtotal (8%)
fn tax_rate() -> Decimal {
    Decimal::new(8, 2)
}

/// Money breakdown stored on an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

impl OrderTotals {
    /// Totals for `quantity` units at `unit_price`.
    pub fn compute(unit_price: Decimal, quantity: u32) -> Self {
        let subtotal = unit_price * Decimal::from(quantity);
        let tax_amount = (subtotal * tax_rate())
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let shipping_fee = shipping_fee();

        Self {
            subtotal,
            shipping_fee,
            tax_amount,
            total_amount: subtotal + shipping_fee + tax_amount,
        }
    }
}

/// Human-facing order number, `TOP-<unix millis>-<3 digit suffix>`.
pub fn order_number(now: DateTime<Utc>, suffix: u16) -> String {
    format!("TOP-{}-{:03}", now.timestamp_millis(), suffix % 1000)
}
