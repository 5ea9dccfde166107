//! Core types for the order core
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact arithmetic (Decimal for money)
//! - Status changes only through the defined transition tables

use chrono::{DateTime, Utc};
use momo_gateway::{GatewayStatus, ReferenceId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Catalog product row
///
/// Created and edited by the catalog collaborator; `stock` and
/// `reserved` are mutated only through inventory-ledger operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID
    pub product_id: Uuid,

    /// Display title
    pub title: String,

    /// Unit price (exact decimal, 2 fractional digits)
    pub unit_price: Decimal,

    /// Available stock; never negative by construction
    pub stock: u32,

    /// Units decremented from stock and not yet released back
    ///
    /// Lets `release` clamp an over-release at zero instead of
    /// inflating stock past what was ever reserved.
    pub reserved: u32,

    /// Category label
    pub category: String,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Create a product with full stock and nothing reserved
    pub fn new(title: impl Into<String>, unit_price: Decimal, stock: u32, category: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            product_id: Uuid::new_v4(),
            title: title.into(),
            unit_price,
            stock,
            reserved: 0,
            category: category.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// One requested line of a cart, as submitted by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Requested product
    pub product_id: Uuid,

    /// Requested quantity (must be >= 1)
    pub quantity: u32,
}

/// One line of a persisted order
///
/// The unit price is captured at reservation time and never tracks
/// later catalog price changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Ordered product
    pub product_id: Uuid,

    /// Ordered quantity
    pub quantity: u32,

    /// Unit price at reservation time
    pub unit_price: Decimal,
}

impl OrderItem {
    /// Line subtotal: quantity x captured unit price
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Order fulfillment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderStatus {
    /// Placed, awaiting payment
    Pending = 1,
    /// Paid, fulfillment may proceed
    Processing = 2,
    /// Handed to the carrier
    Shipped = 3,
    /// Received by the buyer (terminal)
    Delivered = 4,
    /// Cancelled before shipping (terminal)
    Cancelled = 5,
}

impl OrderStatus {
    /// Whether the administrative transition table allows `self -> to`
    ///
    /// Allowed: pending -> processing -> shipped -> delivered, and
    /// pending|processing -> cancelled. Everything else is rejected.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
        )
    }

    /// Whether no further transition is permitted
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Lowercase label, as rendered to the storefront
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted order with its items
///
/// Items are owned exclusively by the order (cascade lifetime): they
/// serialize inside the order record and are never addressed or
/// mutated independently. After creation, `status` and `updated_at`
/// are the only fields that change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order ID (UUIDv7 for time-ordering)
    pub order_id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Server-computed total: sum of line subtotals
    pub total: Decimal,

    /// Fulfillment status
    pub status: OrderStatus,

    /// Order lines, in input order
    pub items: Vec<OrderItem>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// Payment attempt state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AttemptState {
    /// Charge submitted, awaiting payer action
    Pending = 1,
    /// Funds collected (terminal)
    Successful = 2,
    /// Payer rejected or charge expired (terminal)
    Failed = 3,
}

impl AttemptState {
    /// Whether no further transition is permitted
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptState::Successful | AttemptState::Failed)
    }
}

impl From<GatewayStatus> for AttemptState {
    fn from(status: GatewayStatus) -> Self {
        match status {
            GatewayStatus::Pending => AttemptState::Pending,
            GatewayStatus::Successful => AttemptState::Successful,
            GatewayStatus::Failed => AttemptState::Failed,
        }
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttemptState::Pending => "PENDING",
            AttemptState::Successful => "SUCCESSFUL",
            AttemptState::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// One payment attempt against an order
///
/// Retries create new attempts; existing attempts are never reused.
/// At most one attempt per order may be SUCCESSFUL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAttempt {
    /// Gateway charge reference
    pub reference: ReferenceId,

    /// Order this attempt pays for
    pub order_id: Uuid,

    /// Requested amount (the order total at initiation time)
    pub amount: Decimal,

    /// Current state
    pub state: AttemptState,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last time a status report was applied or refreshed
    pub last_checked: DateTime<Utc>,
}

/// Caller role, supplied by the identity collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Regular shopper
    User,
    /// Administrative caller
    Admin,
}

impl Role {
    /// Whether this role may use administrative operations
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Authenticated caller identity, trusted as given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// Authenticated user id
    pub user_id: Uuid,

    /// Role flag
    pub role: Role,
}

impl Caller {
    /// Regular shopper caller
    pub fn user(user_id: Uuid) -> Self {
        Self { user_id, role: Role::User }
    }

    /// Administrative caller
    pub fn admin(user_id: Uuid) -> Self {
        Self { user_id, role: Role::Admin }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use OrderStatus::*;

        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Cancelled));

        // Off-table transitions
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Delivered.can_transition_to(Pending));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());

        assert!(AttemptState::Successful.is_terminal());
        assert!(AttemptState::Failed.is_terminal());
        assert!(!AttemptState::Pending.is_terminal());
    }

    #[test]
    fn test_item_subtotal() {
        let item = OrderItem {
            product_id: Uuid::new_v4(),
            quantity: 3,
            unit_price: Decimal::new(1050, 2), // 10.50
        };
        assert_eq!(item.subtotal(), Decimal::new(3150, 2)); // 31.50
    }

    #[test]
    fn test_attempt_state_from_gateway() {
        assert_eq!(AttemptState::from(GatewayStatus::Pending), AttemptState::Pending);
        assert_eq!(AttemptState::from(GatewayStatus::Successful), AttemptState::Successful);
        assert_eq!(AttemptState::from(GatewayStatus::Failed), AttemptState::Failed);
    }
}
