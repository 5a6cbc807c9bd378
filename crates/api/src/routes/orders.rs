//! Checkout, verification, cancellation and order query endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use common::{Address, CustomerId, OrderNumber};
use domain::{DeliveryKind, FulfillmentStatus, Order, PaymentMethod};
use event_store::EventStore;
use settlement::{CheckoutRequest, PaymentInstruction, RateSource};

use crate::error::ApiError;

use super::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutBody {
    pub customer_id: String,
    pub email: String,
    pub delivery: DeliveryKind,
    pub payment_method: PaymentMethod,
    pub destination: Address,
}

#[derive(Deserialize)]
pub struct DeliveryOptionsBody {
    pub customer_id: String,
    pub destination: Address,
}

#[derive(Deserialize)]
pub struct CancelBody {
    pub reason: String,
}

#[derive(Deserialize)]
pub struct FulfillmentBody {
    pub status: FulfillmentStatus,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_number: String,
    pub customer_id: String,
    pub fulfillment_status: FulfillmentStatus,
    pub payment_status: domain::PaymentStatus,
    pub delivery: Option<DeliveryKind>,
    pub payment_method: Option<PaymentMethod>,
    pub is_digital: bool,
    pub items: Vec<OrderItemResponse>,
    pub shipments: Vec<ShipmentResponse>,
    pub subtotal_minor: i64,
    pub discount_minor: i64,
    pub shipping_minor: i64,
    pub tax_minor: i64,
    pub total_minor: i64,
    pub refund_minor: Option<i64>,
    pub cancel_reason: Option<String>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price_minor: i64,
    pub vendor_id: String,
    pub kind: String,
}

#[derive(Serialize)]
pub struct ShipmentResponse {
    pub vendor_id: String,
    pub shipping_cost_minor: i64,
    pub courier: Option<String>,
    pub tracking_ref: Option<String>,
    pub status: String,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentInstructionResponse {
    Redirect {
        redirect_url: String,
        access_code: String,
    },
    Paid,
    CashOnDelivery,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order: OrderResponse,
    pub payment: PaymentInstructionResponse,
    pub rate_source: Option<RateSource>,
}

#[derive(Serialize)]
pub struct DeliveryOptionResponse {
    pub tier: settlement::RateTier,
    pub label: String,
    pub courier_name: String,
    pub price_minor: i64,
    pub estimated_days: u32,
}

#[derive(Serialize)]
pub struct DeliveryOptionsResponse {
    pub options: Vec<DeliveryOptionResponse>,
    pub source: RateSource,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        let totals = order.totals();
        Self {
            order_number: order
                .order_number()
                .map(|n| n.as_str().to_string())
                .unwrap_or_default(),
            customer_id: order
                .customer_id()
                .map(|c| c.to_string())
                .unwrap_or_default(),
            fulfillment_status: order.fulfillment(),
            payment_status: order.payment(),
            delivery: order.delivery(),
            payment_method: order.payment_method(),
            is_digital: order.is_digital(),
            items: order
                .items()
                .iter()
                .map(|i| OrderItemResponse {
                    product_id: i.product_id.to_string(),
                    name: i.name.clone(),
                    quantity: i.quantity,
                    unit_price_minor: i.unit_price.minor(),
                    vendor_id: i.vendor_id.to_string(),
                    kind: i.kind.to_string(),
                })
                .collect(),
            shipments: order
                .shipments()
                .iter()
                .map(|s| ShipmentResponse {
                    vendor_id: s.vendor_id.to_string(),
                    shipping_cost_minor: s.shipping_cost.minor(),
                    courier: s.courier.clone(),
                    tracking_ref: s.tracking_ref.clone(),
                    status: s.status.to_string(),
                })
                .collect(),
            subtotal_minor: totals.subtotal.minor(),
            discount_minor: totals.discount.minor(),
            shipping_minor: totals.shipping.minor(),
            tax_minor: totals.tax.minor(),
            total_minor: totals.total.minor(),
            refund_minor: order.refund_amount().map(|m| m.minor()),
            cancel_reason: order.cancel_reason().map(|r| r.to_string()),
        }
    }
}

fn parse_customer(raw: &str) -> Result<CustomerId, ApiError> {
    let uuid = uuid::Uuid::parse_str(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid customer_id: {e}")))?;
    Ok(CustomerId::from_uuid(uuid))
}

// -- Handlers --

/// POST /checkout — settle the customer's cart into an order.
#[tracing::instrument(skip(state, body))]
pub async fn checkout<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<CheckoutBody>,
) -> Result<(axum::http::StatusCode, Json<CheckoutResponse>), ApiError> {
    let customer_id = parse_customer(&body.customer_id)?;

    let outcome = state
        .checkout
        .checkout(CheckoutRequest {
            customer_id,
            email: body.email,
            delivery: body.delivery,
            payment_method: body.payment_method,
            destination: body.destination,
        })
        .await?;

    let payment = match outcome.payment {
        PaymentInstruction::Redirect {
            redirect_url,
            access_code,
        } => PaymentInstructionResponse::Redirect {
            redirect_url,
            access_code,
        },
        PaymentInstruction::Paid => PaymentInstructionResponse::Paid,
        PaymentInstruction::CashOnDelivery => PaymentInstructionResponse::CashOnDelivery,
    };

    Ok((
        axum::http::StatusCode::CREATED,
        Json(CheckoutResponse {
            order: OrderResponse::from(&outcome.order),
            payment,
            rate_source: outcome.rate_source,
        }),
    ))
}

/// POST /delivery-options — quote delivery options for the current cart.
#[tracing::instrument(skip(state, body))]
pub async fn delivery_options<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<DeliveryOptionsBody>,
) -> Result<Json<DeliveryOptionsResponse>, ApiError> {
    let customer_id = parse_customer(&body.customer_id)?;

    let rates = state
        .checkout
        .delivery_options(customer_id, &body.destination)
        .await?;

    Ok(Json(DeliveryOptionsResponse {
        options: rates
            .options
            .iter()
            .map(|o| DeliveryOptionResponse {
                tier: o.tier,
                label: o.label.clone(),
                courier_name: o.courier_name.clone(),
                price_minor: o.price.minor(),
                estimated_days: o.estimated_days,
            })
            .collect(),
        source: rates.source,
    }))
}

/// GET /orders/{number} — fetch an order.
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(number): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let number = OrderNumber::new(number);
    let order = state
        .checkout
        .orders()
        .get_order(&number)
        .await
        .map_err(ApiError::Domain)?
        .ok_or_else(|| ApiError::NotFound(format!("Order not found: {number}")))?;

    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{number}/verify — idempotent gateway verification.
#[tracing::instrument(skip(state))]
pub async fn verify<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(number): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let number = OrderNumber::new(number);
    let order = state.checkout.verify_payment(&number).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{number}/cancel — cancel an order.
#[tracing::instrument(skip(state, body))]
pub async fn cancel<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(number): Path<String>,
    Json(body): Json<CancelBody>,
) -> Result<Json<OrderResponse>, ApiError> {
    let number = OrderNumber::new(number);
    let order = state.checkout.cancel_order(&number, &body.reason).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{number}/fulfillment — vendor-initiated status update.
#[tracing::instrument(skip(state, body))]
pub async fn advance_fulfillment<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(number): Path<String>,
    Json(body): Json<FulfillmentBody>,
) -> Result<Json<OrderResponse>, ApiError> {
    let number = OrderNumber::new(number);
    let result = state
        .checkout
        .orders()
        .advance_fulfillment(&number, body.status)
        .await
        .map_err(ApiError::Domain)?;

    Ok(Json(OrderResponse::from(&result.aggregate)))
}
