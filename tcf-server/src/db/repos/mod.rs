//! Repository implementations for database access
//!
//! Each repository follows these patterns:
//! - Borrows the pool (`XRepo::new(&pool)`), no shared mutable state
//! - Rows that a decision depends on are locked with `SELECT ... FOR UPDATE`
//!   inside the transaction that writes the result
//! - Uniqueness is enforced by the database; violations map to `Conflict`

pub mod conversations;
pub mod dashboard;
pub mod likes;
pub mod listings;
pub mod messages;
pub mod orders;
pub mod pricing_plans;
pub mod promotions;
pub mod reports;
pub mod reviews;
pub mod users;

pub use conversations::{Conversation, ConversationRepo, ConversationSummary};
pub use dashboard::{DashboardRepo, DashboardStats};
pub use likes::{LikeRepo, LikedListing};
pub use listings::{Listing, ListingChanges, ListingRepo, NewListing, ShopFilter};
pub use messages::{Message, MessageRepo};
pub use orders::{Order, OrderFilter, OrderRepo, OrderRole};
pub use pricing_plans::{PricingPlan, PricingPlanRepo};
pub use promotions::{NewPromotion, Promotion, PromotionRepo};
pub use reports::{Report, ReportRepo, ReportUpdate};
pub use reviews::{Review, ReviewRepo};
pub use users::{AdminUserUpdate, PublicProfile, User, UserRepo};

use tcf_core::{QuotaError, TransitionError, ValidationError};

/// The authenticated user a repository call acts for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub is_admin: bool,
}

impl Caller {
    pub fn user(user_id: i64) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: i64) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }
}

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    /// The write would break a uniqueness or availability rule
    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Quota(#[from] QuotaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl DbError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Map a unique violation to `Conflict`, pass anything else through.
    pub fn on_unique_violation(err: sqlx::Error, message: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::conflict(message),
            _ => Self::Sqlx(err),
        }
    }
}
