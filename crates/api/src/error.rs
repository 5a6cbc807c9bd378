//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError, WalletError};
use event_store::EventStoreError;
use settlement::SettlementError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Settlement workflow error.
    Settlement(SettlementError),
    /// Domain logic error.
    Domain(DomainError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Settlement(err) => settlement_error_to_response(err),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn settlement_error_to_response(err: SettlementError) -> (StatusCode, String) {
    match &err {
        SettlementError::EmptyCart
        | SettlementError::InvalidQuantity { .. }
        | SettlementError::ProductInactive(_)
        | SettlementError::MethodNotAllowed(_)
        | SettlementError::DeliveryUnavailable(_)
        | SettlementError::AmountMismatch { .. } => (StatusCode::BAD_REQUEST, err.to_string()),

        SettlementError::InsufficientStock { .. } | SettlementError::PaymentAlreadyFailed(_) => {
            (StatusCode::CONFLICT, err.to_string())
        }

        SettlementError::InsufficientFunds { .. } => {
            (StatusCode::PAYMENT_REQUIRED, err.to_string())
        }

        SettlementError::ProductNotFound(_) | SettlementError::OrderNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }

        SettlementError::Gateway(_) | SettlementError::Carrier(_) => {
            (StatusCode::BAD_GATEWAY, err.to_string())
        }

        SettlementError::Domain(inner) => (domain_error_status(inner), err.to_string()),

        _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    (domain_error_status(&err), err.to_string())
}

fn domain_error_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Order(order_err) => match order_err {
            OrderError::InvalidFulfillmentTransition { .. }
            | OrderError::InvalidPaymentTransition { .. }
            | OrderError::CancellationNotAllowed { .. }
            | OrderError::RefundAlreadyIssued
            | OrderError::AlreadyPlaced => StatusCode::CONFLICT,

            OrderError::NotPlaced
            | OrderError::ShipmentNotFound { .. }
            | OrderError::ItemNotFound { .. } => StatusCode::NOT_FOUND,

            _ => StatusCode::BAD_REQUEST,
        },
        DomainError::Wallet(wallet_err) => match wallet_err {
            WalletError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
            WalletError::TransactionNotFound { .. } => StatusCode::NOT_FOUND,
            WalletError::AlreadyResolved { .. } => StatusCode::CONFLICT,
            WalletError::InvalidAmount { .. } => StatusCode::BAD_REQUEST,
        },
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. }) => {
            StatusCode::CONFLICT
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        ApiError::Settlement(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}
