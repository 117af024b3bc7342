//! Order lifecycle state machine
//!
//! Every status change of an order goes through [`plan_transition`]. The plan
//! says whether the caller may make the move and what must happen to the
//! listing in the same transaction:
//!
//! ```text
//! PENDING -> TO_SHIP -> SHIPPED -> DELIVERED -> RECEIVED -> COMPLETED -> REVIEWED
//!    \__________\__________\___________\
//!                                       -> CANCELLED
//! ```
//!
//! Forward moves may skip steps. RECEIVED, COMPLETED and REVIEWED are "sold":
//! once an order is sold it can no longer be cancelled and its listing stays
//! off the market.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::ValidationError;

/// Lifecycle status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[serde(alias = "IN_PROGRESS")]
    Pending,
    ToShip,
    Shipped,
    Delivered,
    Received,
    Completed,
    Reviewed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        Self::Pending,
        Self::ToShip,
        Self::Shipped,
        Self::Delivered,
        Self::Received,
        Self::Completed,
        Self::Reviewed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::ToShip => "TO_SHIP",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Received => "RECEIVED",
            Self::Completed => "COMPLETED",
            Self::Reviewed => "REVIEWED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Position on the forward chain; `None` for CANCELLED.
    fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::ToShip => Some(1),
            Self::Shipped => Some(2),
            Self::Delivered => Some(3),
            Self::Received => Some(4),
            Self::Completed => Some(5),
            Self::Reviewed => Some(6),
            Self::Cancelled => None,
        }
    }

    /// The buyer has the item: the listing is sold.
    pub fn is_sold(self) -> bool {
        matches!(self, Self::Received | Self::Completed | Self::Reviewed)
    }

    /// No further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Reviewed | Self::Cancelled)
    }

    /// Still holding the listing without having sold it.
    pub fn is_open(self) -> bool {
        !self.is_sold() && self != Self::Cancelled
    }

    /// Reviews may be written in these statuses.
    pub fn is_reviewable(self) -> bool {
        matches!(self, Self::Completed | Self::Reviewed)
    }

    /// Statuses that are considered sold, for SQL `= ANY($1)` filters.
    pub fn sold_statuses() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|s| s.is_sold())
            .map(|s| s.as_str())
            .collect()
    }

    /// Statuses that still hold a listing, for SQL `= ANY($1)` filters.
    pub fn open_statuses() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|s| s.is_open())
            .map(|s| s.as_str())
            .collect()
    }

    /// Whether the state graph has an edge from `self` to `next`.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self.is_terminal() || self == next {
            return false;
        }
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to > from,
            (Some(_), None) => !self.is_sold(),
            (None, _) => false,
        }
    }

    /// Text of the system message posted to the order conversation.
    pub fn system_message(self) -> &'static str {
        match self {
            Self::Pending => "Order placed.",
            Self::ToShip => "Seller is preparing the order for shipping.",
            Self::Shipped => "Seller has shipped the order.",
            Self::Delivered => "Order has been delivered.",
            Self::Received => "Buyer confirmed the order was received.",
            Self::Completed => "Order completed. You can now leave a review.",
            Self::Reviewed => "Both parties have reviewed this order.",
            Self::Cancelled => "Order was cancelled.",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        if normalized == "IN_PROGRESS" {
            return Ok(Self::Pending);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ValidationError::InvalidVariant {
                field: "status",
                value: s.to_owned(),
            })
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The caller's relationship to an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Buyer,
    Seller,
    /// Marketplace administrator acting on someone else's order
    Admin,
    Stranger,
}

impl Party {
    /// Resolve the caller against an order's buyer and seller.
    ///
    /// Being a party takes precedence over the admin role, so an admin buying
    /// an item is held to buyer rules.
    pub fn resolve<Id: PartialEq>(caller: &Id, is_admin: bool, buyer: &Id, seller: &Id) -> Self {
        if caller == buyer {
            Self::Buyer
        } else if caller == seller {
            Self::Seller
        } else if is_admin {
            Self::Admin
        } else {
            Self::Stranger
        }
    }

    pub fn is_party(self) -> bool {
        matches!(self, Self::Buyer | Self::Seller)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
            Self::Admin => "admin",
            Self::Stranger => "stranger",
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the listing behind an order must do in the same transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingEffect {
    None,
    /// `sold = true, listed = false, sold_at = now`
    MarkSold,
    /// `sold = false, listed = true, sold_at = NULL`
    Relist,
}

impl ListingEffect {
    /// Effect of moving an order from `from` to `to`.
    pub fn between(from: OrderStatus, to: OrderStatus) -> Self {
        if to == OrderStatus::Cancelled {
            Self::Relist
        } else if to.is_sold() && !from.is_sold() {
            Self::MarkSold
        } else {
            Self::None
        }
    }
}

/// An approved status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub listing_effect: ListingEffect,
}

impl TransitionPlan {
    fn crosses(&self, step: OrderStatus) -> bool {
        match (self.from.rank(), self.to.rank(), step.rank()) {
            (Some(from), Some(to), Some(step)) => from < step && to >= step,
            _ => false,
        }
    }

    /// `shipped_at` should be stamped.
    pub fn marks_shipped(&self) -> bool {
        self.crosses(OrderStatus::Shipped)
    }

    /// `delivered_at` should be stamped.
    pub fn marks_delivered(&self) -> bool {
        self.crosses(OrderStatus::Delivered)
    }

    /// `completed_at` should be stamped.
    pub fn marks_completed(&self) -> bool {
        self.crosses(OrderStatus::Completed)
    }
}

/// Why a status change was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("caller is not a party to this order")]
    NotAParty,

    #[error("the {party} may not move an order to {target}")]
    NotAllowed { party: Party, target: OrderStatus },

    #[error("cannot move an order from {from} to {to}")]
    Invalid { from: OrderStatus, to: OrderStatus },
}

fn party_may_request(party: Party, current: OrderStatus, target: OrderStatus) -> bool {
    use OrderStatus::*;

    match (party, target) {
        (Party::Stranger, _) => false,
        (Party::Admin, _) => true,
        (Party::Seller, ToShip | Shipped) => true,
        (Party::Buyer, Delivered | Received) => true,
        (Party::Buyer | Party::Seller, Completed | Reviewed) => true,
        (Party::Seller, Cancelled) => true,
        (Party::Buyer, Cancelled) => matches!(current, Pending | ToShip),
        _ => false,
    }
}

/// Decide whether `party` may move an order from `current` to `target`.
///
/// # Example
/// ```
/// use tcf_core::order::{plan_transition, ListingEffect, OrderStatus, Party};
///
/// let plan = plan_transition(OrderStatus::Shipped, Party::Buyer, OrderStatus::Received).unwrap();
/// assert_eq!(plan.listing_effect, ListingEffect::MarkSold);
///
/// assert!(plan_transition(OrderStatus::Received, Party::Seller, OrderStatus::Cancelled).is_err());
/// ```
pub fn plan_transition(
    current: OrderStatus,
    party: Party,
    target: OrderStatus,
) -> Result<TransitionPlan, TransitionError> {
    if party == Party::Stranger {
        return Err(TransitionError::NotAParty);
    }
    if !party_may_request(party, current, target) {
        return Err(TransitionError::NotAllowed { party, target });
    }
    if !current.can_transition_to(target) {
        return Err(TransitionError::Invalid {
            from: current,
            to: target,
        });
    }

    Ok(TransitionPlan {
        from: current,
        to: target,
        listing_effect: ListingEffect::between(current, target),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn parses_wire_names() {
        assert_eq!("TO_SHIP".parse::<OrderStatus>().unwrap(), ToShip);
        assert_eq!("received".parse::<OrderStatus>().unwrap(), Received);
        assert_eq!("IN_PROGRESS".parse::<OrderStatus>().unwrap(), Pending);
        assert!("LOST".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        assert_eq!(serde_json::to_string(&ToShip).unwrap(), "\"TO_SHIP\"");
        let status: OrderStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(status, Pending);
    }

    #[test]
    fn sold_statuses() {
        assert_eq!(OrderStatus::sold_statuses(), vec!["RECEIVED", "COMPLETED", "REVIEWED"]);
        assert_eq!(
            OrderStatus::open_statuses(),
            vec!["PENDING", "TO_SHIP", "SHIPPED", "DELIVERED"]
        );
    }

    #[test]
    fn forward_moves_may_skip_steps() {
        assert!(Pending.can_transition_to(Received));
        assert!(Shipped.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Reviewed));
    }

    #[test]
    fn backward_and_repeated_moves_are_rejected() {
        assert!(!Shipped.can_transition_to(ToShip));
        assert!(!Shipped.can_transition_to(Shipped));
        assert!(!Reviewed.can_transition_to(Completed));
    }

    #[test]
    fn cancel_only_before_sale() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Delivered.can_transition_to(Cancelled));
        assert!(!Received.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn receiving_marks_listing_sold() {
        let plan = plan_transition(Shipped, Party::Buyer, Received).unwrap();
        assert_eq!(plan.listing_effect, ListingEffect::MarkSold);
        assert!(!plan.marks_shipped());
        assert!(plan.marks_delivered());
    }

    #[test]
    fn completing_after_receipt_leaves_listing_alone() {
        let plan = plan_transition(Received, Party::Seller, Completed).unwrap();
        assert_eq!(plan.listing_effect, ListingEffect::None);
        assert!(plan.marks_completed());
    }

    #[test]
    fn skipping_straight_to_completed_marks_sold_once() {
        let plan = plan_transition(Pending, Party::Buyer, Completed).unwrap();
        assert_eq!(plan.listing_effect, ListingEffect::MarkSold);
        assert!(plan.marks_shipped());
        assert!(plan.marks_delivered());
        assert!(plan.marks_completed());
    }

    #[test]
    fn cancelling_relists() {
        let plan = plan_transition(ToShip, Party::Buyer, Cancelled).unwrap();
        assert_eq!(plan.listing_effect, ListingEffect::Relist);
        assert!(!plan.marks_shipped());
    }

    #[test]
    fn buyer_cannot_cancel_after_shipping() {
        let err = plan_transition(Shipped, Party::Buyer, Cancelled).unwrap_err();
        assert_eq!(
            err,
            TransitionError::NotAllowed {
                party: Party::Buyer,
                target: Cancelled
            }
        );
        assert!(plan_transition(Shipped, Party::Seller, Cancelled).is_ok());
    }

    #[test]
    fn role_rules() {
        assert!(plan_transition(Pending, Party::Buyer, Shipped).is_err());
        assert!(plan_transition(Shipped, Party::Seller, Received).is_err());
        assert!(plan_transition(Pending, Party::Seller, Shipped).is_ok());
        assert!(plan_transition(Delivered, Party::Buyer, Received).is_ok());
        assert_eq!(
            plan_transition(Pending, Party::Stranger, Cancelled),
            Err(TransitionError::NotAParty)
        );
    }

    #[test]
    fn admin_still_bound_by_the_graph() {
        assert!(plan_transition(Shipped, Party::Admin, Received).is_ok());
        assert_eq!(
            plan_transition(Completed, Party::Admin, Cancelled),
            Err(TransitionError::Invalid {
                from: Completed,
                to: Cancelled
            })
        );
    }

    #[test]
    fn party_resolution_prefers_membership_over_admin() {
        assert_eq!(Party::resolve(&1, true, &1, &2), Party::Buyer);
        assert_eq!(Party::resolve(&2, false, &1, &2), Party::Seller);
        assert_eq!(Party::resolve(&3, true, &1, &2), Party::Admin);
        assert_eq!(Party::resolve(&3, false, &1, &2), Party::Stranger);
    }

    #[test]
    fn error_messages() {
        let err = TransitionError::Invalid {
            from: Reviewed,
            to: Cancelled,
        };
        assert_eq!(err.to_string(), "cannot move an order from REVIEWED to CANCELLED");
    }
}
