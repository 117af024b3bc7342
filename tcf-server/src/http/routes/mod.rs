//! Route handlers, one router per resource

pub mod admin;
pub mod auth;
pub mod benefits;
pub mod conversations;
pub mod health;
pub mod likes;
pub mod listings;
pub mod orders;
pub mod pricing_plans;
pub mod reports;
pub mod reviews;
pub mod users;
