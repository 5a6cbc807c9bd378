//! Wallet query and ledger endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use chrono::{DateTime, Utc};
use common::{CustomerId, Money};
use domain::{TransactionDirection, TransactionStatus, Wallet};
use event_store::EventStore;

use crate::error::ApiError;

use super::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CreditBody {
    pub amount_minor: i64,
    pub purpose: String,
    pub reference: String,
}

#[derive(Deserialize)]
pub struct WithdrawalBody {
    pub amount_minor: i64,
}

#[derive(Deserialize)]
pub struct ResolveBody {
    pub approved: bool,
}

// -- Response types --

#[derive(Serialize)]
pub struct WalletResponse {
    pub customer_id: String,
    pub balance_minor: i64,
    pub total_earned_minor: i64,
    pub total_spent_minor: i64,
    pub total_withdrawn_minor: i64,
    pub pending_balance_minor: i64,
    pub transactions: Vec<TransactionResponse>,
}

#[derive(Serialize)]
pub struct TransactionResponse {
    pub id: String,
    pub direction: TransactionDirection,
    pub amount_minor: i64,
    pub purpose: String,
    pub reference: String,
    pub order_number: Option<String>,
    pub status: TransactionStatus,
    pub at: DateTime<Utc>,
}

fn wallet_response(customer_id: CustomerId, wallet: &Wallet) -> WalletResponse {
    WalletResponse {
        customer_id: customer_id.to_string(),
        balance_minor: wallet.balance().minor(),
        total_earned_minor: wallet.total_earned().minor(),
        total_spent_minor: wallet.total_spent().minor(),
        total_withdrawn_minor: wallet.total_withdrawn().minor(),
        pending_balance_minor: wallet.pending_balance().minor(),
        transactions: wallet
            .transactions()
            .iter()
            .map(|t| TransactionResponse {
                id: t.id.to_string(),
                direction: t.direction,
                amount_minor: t.amount.minor(),
                purpose: t.purpose.clone(),
                reference: t.reference.clone(),
                order_number: t.order_number.as_ref().map(|n| n.as_str().to_string()),
                status: t.status,
                at: t.at,
            })
            .collect(),
    }
}

fn parse_customer(raw: &str) -> Result<CustomerId, ApiError> {
    let uuid = uuid::Uuid::parse_str(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid customer id: {e}")))?;
    Ok(CustomerId::from_uuid(uuid))
}

// -- Handlers --

/// GET /wallets/{customer} — fetch a customer's wallet.
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(customer): Path<String>,
) -> Result<Json<WalletResponse>, ApiError> {
    let customer_id = parse_customer(&customer)?;
    let wallet = state
        .checkout
        .wallets()
        .get_wallet(customer_id)
        .await
        .map_err(ApiError::Domain)?;

    Ok(Json(wallet_response(customer_id, &wallet)))
}

/// POST /wallets/{customer}/credit — add funds.
#[tracing::instrument(skip(state, body))]
pub async fn credit<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(customer): Path<String>,
    Json(body): Json<CreditBody>,
) -> Result<Json<WalletResponse>, ApiError> {
    let customer_id = parse_customer(&customer)?;
    let result = state
        .checkout
        .wallets()
        .credit(
            customer_id,
            Money::from_minor(body.amount_minor),
            &body.purpose,
            &body.reference,
            None,
        )
        .await
        .map_err(ApiError::Domain)?;

    Ok(Json(wallet_response(customer_id, &result.aggregate)))
}

/// POST /wallets/{customer}/withdrawals — reserve a withdrawal.
#[tracing::instrument(skip(state, body))]
pub async fn reserve_withdrawal<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(customer): Path<String>,
    Json(body): Json<WithdrawalBody>,
) -> Result<Json<WalletResponse>, ApiError> {
    let customer_id = parse_customer(&customer)?;
    let result = state
        .checkout
        .wallets()
        .reserve_withdrawal(customer_id, Money::from_minor(body.amount_minor))
        .await
        .map_err(ApiError::Domain)?;

    Ok(Json(wallet_response(customer_id, &result.aggregate)))
}

/// POST /wallets/{customer}/withdrawals/{transaction}/resolve — resolve
/// a pending withdrawal to completed or failed.
#[tracing::instrument(skip(state, body))]
pub async fn resolve_withdrawal<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((customer, transaction)): Path<(String, String)>,
    Json(body): Json<ResolveBody>,
) -> Result<Json<WalletResponse>, ApiError> {
    let customer_id = parse_customer(&customer)?;
    let transaction_id = uuid::Uuid::parse_str(&transaction)
        .map_err(|e| ApiError::BadRequest(format!("Invalid transaction id: {e}")))?;

    let result = state
        .checkout
        .wallets()
        .resolve_withdrawal(customer_id, transaction_id, body.approved)
        .await
        .map_err(ApiError::Domain)?;

    Ok(Json(wallet_response(customer_id, &result.aggregate)))
}
