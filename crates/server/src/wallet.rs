//! Wallet API endpoints.

use api_types::wallet::{
    TransactionClass as ApiClass, TransactionView, TransactionsResponse, WalletAudit, WalletView,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::{ServerError, server::ServerState, user};
use ledger::{ParentTransaction, TransactionClass};

fn map_class(class: TransactionClass) -> ApiClass {
    match class {
        TransactionClass::Topup => ApiClass::Topup,
        TransactionClass::Deduction => ApiClass::Deduction,
        TransactionClass::PendingDeferred => ApiClass::PendingDeferred,
    }
}

fn view(tx: ParentTransaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        class: map_class(tx.classify()),
        amount_minor: tx.amount.cents(),
        balance_before_minor: tx.balance_before.cents(),
        balance_after_minor: tx.balance_after.cents(),
        order_ids: tx.order_ids,
        reason: tx.reason,
        created_at: tx.created_at,
    }
}

#[derive(Debug, Deserialize)]
pub struct WalletQuery {
    /// Admins may inspect any wallet; parents only their own.
    pub parent_id: Option<String>,
}

/// Resolve which wallet the caller may read.
fn resolve_parent<'a>(
    user: &'a user::Model,
    requested: Option<&'a str>,
) -> Result<&'a str, ServerError> {
    match requested {
        Some(parent_id) if user.is_admin() || parent_id == user.username => Ok(parent_id),
        Some(_) => Err(ServerError::Forbidden(
            "cannot read another parent's wallet".to_string(),
        )),
        None if user.is_admin() => Err(ServerError::Generic(
            "parent_id is required for admin reads".to_string(),
        )),
        None => Ok(user.username.as_str()),
    }
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<WalletQuery>,
) -> Result<Json<WalletView>, ServerError> {
    let parent_id = resolve_parent(&user, query.parent_id.as_deref())?;
    let parent = state.ledger.parent(parent_id).await?;
    Ok(Json(WalletView {
        parent_id: parent.user_id,
        balance_minor: parent.balance.cents(),
        children: parent.children,
    }))
}

/// Replay the ledger against the stored balance (admin diagnostic).
pub async fn audit(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<WalletQuery>,
) -> Result<Json<WalletAudit>, ServerError> {
    if !user.is_admin() {
        return Err(ServerError::Forbidden(
            "only admins audit wallets".to_string(),
        ));
    }
    let Some(parent_id) = query.parent_id.as_deref() else {
        return Err(ServerError::Generic("parent_id is required".to_string()));
    };

    let balance = state.ledger.balance(parent_id).await?;
    let replayed = state.ledger.reconcile(parent_id).await?;
    Ok(Json(WalletAudit {
        parent_id: parent_id.to_string(),
        balance_minor: balance.cents(),
        replayed_minor: replayed.cents(),
        consistent: balance == replayed,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub parent_id: Option<String>,
    pub limit: Option<u64>,
}

pub async fn transactions(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<TransactionsResponse>, ServerError> {
    let parent_id = resolve_parent(&user, query.parent_id.as_deref())?;
    let limit = query.limit.unwrap_or(50);

    let transactions = state.ledger.list_transactions(parent_id, limit).await?;
    Ok(Json(TransactionsResponse {
        transactions: transactions.into_iter().map(view).collect(),
    }))
}
