//! tcf-core: marketplace domain rules
//!
//! Everything in here is pure: no database, no HTTP. The server crate loads
//! rows, asks these types what should happen, and writes the answer back
//! inside a single transaction.
//!
//! - [`order`]: order status state machine and the listing effect of each move
//! - [`listing`]: listing availability and validated listing input
//! - [`promotion`]: premium membership and the monthly free promotion quota
//! - [`pricing`]: order totals and order numbers
//! - [`report`]: moderation reports and listing likes

pub mod conversation;
pub mod listing;
pub mod order;
pub mod pagination;
pub mod pricing;
pub mod promotion;
pub mod report;
pub mod user;
pub mod validation;

pub use conversation::{ConversationKind, MessageBody, MessageKind};
pub use listing::{Condition, ImageUrls, ListingName, ListingState, Price};
pub use order::{plan_transition, ListingEffect, OrderStatus, Party, TransitionError, TransitionPlan};
pub use pagination::{Paginated, Pagination, PaginationParams};
pub use pricing::{order_number, OrderTotals};
pub use promotion::{FreePromotionQuota, PromotionStatus, QuotaError, QuotaOutcome, QuotaState};
pub use report::{LikeAction, ReportReason, ReportStatus, ReportTarget};
pub use user::{Rating, Role, UserStatus, Username};
pub use validation::ValidationError;
