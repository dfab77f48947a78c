//! Top-up API endpoints.
//!
//! Approval and the wallet credit are one admin action here: `approve`
//! transitions the request to `approved` and immediately applies it, which
//! credits the wallet and completes the top-up. The ledger guarantees the
//! credit happens at most once.

use api_types::topup::{
    PaymentMethod as ApiMethod, TopupNew, TopupStatus as ApiStatus, TopupView, TopupsResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};
use ledger::{MoneyCents, PaymentMethod, Topup, TopupStatus};

fn map_status(status: TopupStatus) -> ApiStatus {
    match status {
        TopupStatus::Pending => ApiStatus::Pending,
        TopupStatus::Approved => ApiStatus::Approved,
        TopupStatus::Declined => ApiStatus::Declined,
        TopupStatus::Completed => ApiStatus::Completed,
    }
}

fn unmap_status(status: ApiStatus) -> TopupStatus {
    match status {
        ApiStatus::Pending => TopupStatus::Pending,
        ApiStatus::Approved => TopupStatus::Approved,
        ApiStatus::Declined => TopupStatus::Declined,
        ApiStatus::Completed => TopupStatus::Completed,
    }
}

fn unmap_method(method: ApiMethod) -> PaymentMethod {
    match method {
        ApiMethod::Cash => PaymentMethod::Cash,
        ApiMethod::BankTransfer => PaymentMethod::BankTransfer,
        ApiMethod::Card => PaymentMethod::Card,
    }
}

fn map_method(method: PaymentMethod) -> ApiMethod {
    match method {
        PaymentMethod::Cash => ApiMethod::Cash,
        PaymentMethod::BankTransfer => ApiMethod::BankTransfer,
        PaymentMethod::Card => ApiMethod::Card,
    }
}

fn view(topup: Topup) -> TopupView {
    TopupView {
        id: topup.id,
        parent_id: topup.parent_id,
        amount_minor: topup.amount.cents(),
        status: map_status(topup.status),
        method: map_method(topup.method),
        reference: topup.reference,
        requested_at: topup.requested_at,
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TopupNew>,
) -> Result<Json<TopupView>, ServerError> {
    if user.is_admin() {
        return Err(ServerError::Forbidden(
            "top-ups are requested from a parent account".to_string(),
        ));
    }

    let topup = state
        .ledger
        .request_topup(
            &user.username,
            MoneyCents::new(payload.amount_minor),
            unmap_method(payload.method),
            payload.reference,
        )
        .await?;
    Ok(Json(view(topup)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<ApiStatus>,
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<TopupsResponse>, ServerError> {
    let parent_id = if user.is_admin() {
        None
    } else {
        Some(user.username.as_str())
    };
    let topups = state
        .ledger
        .list_topups(parent_id, query.status.map(unmap_status))
        .await?;
    Ok(Json(TopupsResponse {
        topups: topups.into_iter().map(view).collect(),
    }))
}

/// Approve and credit in one step.
pub async fn approve(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TopupView>, ServerError> {
    if !user.is_admin() {
        return Err(ServerError::Forbidden(
            "only admins approve top-ups".to_string(),
        ));
    }

    let approved = state.ledger.approve_topup(id).await?;
    state.ledger.apply_topup(&approved.parent_id, id).await?;
    let completed = state.ledger.topup(id).await?;
    Ok(Json(view(completed)))
}

pub async fn decline(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TopupView>, ServerError> {
    if !user.is_admin() {
        return Err(ServerError::Forbidden(
            "only admins decline top-ups".to_string(),
        ));
    }

    let topup = state.ledger.decline_topup(id).await?;
    Ok(Json(view(topup)))
}
