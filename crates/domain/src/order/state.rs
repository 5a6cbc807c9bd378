//! The two independent order status machines.

use serde::{Deserialize, Serialize};

/// Where the order is in its physical lifecycle.
///
/// ```text
/// pending ──► confirmed ──► processing ──► shipped ──► in_transit ──► delivered
///    │            │
///    └────────────┴──► cancelled
/// ```
///
/// Cancellation is only reachable while nothing has left a vendor's hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    /// Order exists but settlement has not confirmed it.
    #[default]
    Pending,

    /// Settlement succeeded (or cash-on-delivery accepted).
    Confirmed,

    /// A vendor is preparing the order.
    Processing,

    /// Every parcel has left its vendor.
    Shipped,

    /// Parcels are with the carrier.
    InTransit,

    /// All parcels delivered, or digital goods released (terminal).
    Delivered,

    /// Order was cancelled (terminal).
    Cancelled,
}

impl FulfillmentStatus {
    /// Returns true if the order can still be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(self, FulfillmentStatus::Pending | FulfillmentStatus::Confirmed)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FulfillmentStatus::Delivered | FulfillmentStatus::Cancelled)
    }

    /// Position of the status in the forward progression.
    ///
    /// Cancelled sits outside the progression and returns None.
    pub fn rank(&self) -> Option<u8> {
        match self {
            FulfillmentStatus::Pending => Some(0),
            FulfillmentStatus::Confirmed => Some(1),
            FulfillmentStatus::Processing => Some(2),
            FulfillmentStatus::Shipped => Some(3),
            FulfillmentStatus::InTransit => Some(4),
            FulfillmentStatus::Delivered => Some(5),
            FulfillmentStatus::Cancelled => None,
        }
    }

    /// Returns true if a vendor-initiated update may move the order from
    /// `self` to `next`. Updates only move forward, never skip backward,
    /// and never leave or enter the cancelled state (that path goes
    /// through cancellation).
    pub fn can_advance_to(&self, next: FulfillmentStatus) -> bool {
        match (self.rank(), next.rank()) {
            (Some(current), Some(target)) => current >= 1 && target > current,
            _ => false,
        }
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Pending => "pending",
            FulfillmentStatus::Confirmed => "confirmed",
            FulfillmentStatus::Processing => "processing",
            FulfillmentStatus::Shipped => "shipped",
            FulfillmentStatus::InTransit => "in_transit",
            FulfillmentStatus::Delivered => "delivered",
            FulfillmentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the order's money is.
///
/// ```text
/// pending ──┬──► completed ──► refunded
///           └──► failed
/// ```
///
/// Refunded is only reachable after cancellation of a paid order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting settlement.
    #[default]
    Pending,

    /// Settlement succeeded.
    Completed,

    /// Settlement failed (terminal; a new order is required).
    Failed,

    /// Payment was returned to the customer's wallet.
    Refunded,
}

impl PaymentStatus {
    /// Returns true if settlement can still complete.
    pub fn can_complete(&self) -> bool {
        matches!(self, PaymentStatus::Pending)
    }

    /// Returns true if the payment can be refunded.
    pub fn can_refund(&self) -> bool {
        matches!(self, PaymentStatus::Completed)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Failed | PaymentStatus::Refunded)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
