//! Order service providing a simplified API for order operations.

use common::{Money, OrderNumber, StreamId, VendorId};
use event_store::EventStore;
use uuid::Uuid;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::events::OrderPlacedData;
use super::{FulfillmentStatus, Order};

/// Service for managing orders.
///
/// Wraps the command handler with one method per state-machine
/// transition. Every method loads the durably committed order, runs the
/// transition, and appends with the expected-version check.
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
}

impl<S: EventStore + Clone> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
        }
    }
}

impl<S: EventStore> OrderService<S> {
    /// Creates a new order service with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Commits a validated, priced cart as a new order.
    #[tracing::instrument(skip(self, data), fields(order_number = %data.order_number))]
    pub async fn place_order(
        &self,
        data: OrderPlacedData,
    ) -> Result<CommandResult<Order>, DomainError> {
        let stream = StreamId::order(&data.order_number);
        let result = self
            .handler
            .execute(&stream, |order| order.place(data))
            .await?;

        metrics::counter!("orders_placed_total").increment(1);
        Ok(result)
    }

    /// Records successful settlement for an order.
    #[tracing::instrument(skip(self))]
    pub async fn complete_payment(
        &self,
        number: &OrderNumber,
        gateway_ref: Option<String>,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.handler
            .execute(&StreamId::order(number), |order| {
                order.complete_payment(gateway_ref)
            })
            .await
    }

    /// Records a failed settlement attempt.
    #[tracing::instrument(skip(self))]
    pub async fn fail_payment(
        &self,
        number: &OrderNumber,
        reason: String,
    ) -> Result<CommandResult<Order>, DomainError> {
        metrics::counter!("orders_payment_failed_total").increment(1);
        self.handler
            .execute(&StreamId::order(number), |order| order.fail_payment(reason))
            .await
    }

    /// Accepts a cash-on-delivery order for fulfillment.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, number: &OrderNumber) -> Result<CommandResult<Order>, DomainError> {
        self.handler
            .execute(&StreamId::order(number), |order| order.confirm())
            .await
    }

    /// Applies a vendor-initiated fulfillment update.
    #[tracing::instrument(skip(self))]
    pub async fn advance_fulfillment(
        &self,
        number: &OrderNumber,
        next: FulfillmentStatus,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.handler
            .execute(&StreamId::order(number), |order| {
                order.advance_fulfillment(next)
            })
            .await
    }

    /// Marks the inventory decrement side effect as done.
    ///
    /// Returns a result whose `events` list is empty when the stock was
    /// already committed, so callers can gate their own exactly-once
    /// side effects on it.
    #[tracing::instrument(skip(self))]
    pub async fn commit_stock(
        &self,
        number: &OrderNumber,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.handler
            .execute(&StreamId::order(number), |order| order.commit_stock())
            .await
    }

    /// Records a courier booking for one vendor's parcel.
    #[tracing::instrument(skip(self))]
    pub async fn book_shipment(
        &self,
        number: &OrderNumber,
        vendor_id: VendorId,
        courier: String,
        tracking_ref: String,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.handler
            .execute(&StreamId::order(number), |order| {
                order.book_shipment(vendor_id, courier, tracking_ref)
            })
            .await
    }

    /// Issues a license for a digital line.
    #[tracing::instrument(skip(self, key))]
    pub async fn issue_license(
        &self,
        number: &OrderNumber,
        item_id: Uuid,
        key: String,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.handler
            .execute(&StreamId::order(number), |order| {
                order.issue_license(item_id, key)
            })
            .await
    }

    /// Cancels an order.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(
        &self,
        number: &OrderNumber,
        reason: String,
    ) -> Result<CommandResult<Order>, DomainError> {
        metrics::counter!("orders_cancelled_total").increment(1);
        self.handler
            .execute(&StreamId::order(number), |order| order.cancel(reason))
            .await
    }

    /// Records the wallet refund of a cancelled, paid order.
    #[tracing::instrument(skip(self))]
    pub async fn record_refund(
        &self,
        number: &OrderNumber,
        amount: Money,
        reason: String,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.handler
            .execute(&StreamId::order(number), |order| {
                order.record_refund(amount, reason)
            })
            .await
    }

    /// Loads an order by number, or None if it doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, number: &OrderNumber) -> Result<Option<Order>, DomainError> {
        self.handler.load_existing(&StreamId::order(number)).await
    }
}
