//! Order API endpoints.

use api_types::order::{
    OrderLineView, OrderNew, OrderStatus as ApiStatus, OrderStatusUpdate, OrderView,
    OrdersResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};
use ledger::{Order, OrderStatus};

fn map_status(status: OrderStatus) -> ApiStatus {
    match status {
        OrderStatus::Pending => ApiStatus::Pending,
        OrderStatus::Confirmed => ApiStatus::Confirmed,
        OrderStatus::Preparing => ApiStatus::Preparing,
        OrderStatus::Ready => ApiStatus::Ready,
        OrderStatus::Completed => ApiStatus::Completed,
        OrderStatus::Cancelled => ApiStatus::Cancelled,
    }
}

fn unmap_status(status: ApiStatus) -> OrderStatus {
    match status {
        ApiStatus::Pending => OrderStatus::Pending,
        ApiStatus::Confirmed => OrderStatus::Confirmed,
        ApiStatus::Preparing => OrderStatus::Preparing,
        ApiStatus::Ready => OrderStatus::Ready,
        ApiStatus::Completed => OrderStatus::Completed,
        ApiStatus::Cancelled => OrderStatus::Cancelled,
    }
}

fn view(order: Order) -> OrderView {
    OrderView {
        id: order.id,
        parent_id: order.parent_id,
        student_id: order.student_id,
        status: map_status(order.status),
        total_minor: order.total.cents(),
        order_date: order.order_date,
        completed_at: order.completed_at,
        cancelled_at: order.cancelled_at,
        instructions: order.instructions,
        lines: order
            .items
            .into_iter()
            .map(|item| OrderLineView {
                menu_item_id: item.menu_item_id,
                name: item.name,
                price_minor: item.price.cents(),
                quantity: item.quantity,
            })
            .collect(),
    }
}

/// Place an order; the wallet is charged (or the charge deferred) before
/// the order is acknowledged.
pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<OrderNew>,
) -> Result<Json<OrderView>, ServerError> {
    if user.is_admin() {
        return Err(ServerError::Forbidden(
            "orders are placed from a parent account".to_string(),
        ));
    }

    let lines: Vec<(Uuid, i64)> = payload
        .lines
        .iter()
        .map(|line| (line.menu_item_id, line.quantity))
        .collect();

    let (order, _) = state
        .ledger
        .place_order(
            &user.username,
            payload.student_id,
            &lines,
            payload.deferred,
            payload.instructions,
        )
        .await?;
    Ok(Json(view(order)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<ApiStatus>,
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<OrdersResponse>, ServerError> {
    let parent_id = if user.is_admin() {
        None
    } else {
        Some(user.username.as_str())
    };
    let orders = state
        .ledger
        .list_orders(parent_id, query.status.map(unmap_status))
        .await?;
    Ok(Json(OrdersResponse {
        orders: orders.into_iter().map(view).collect(),
    }))
}

/// Canteen staff drive the status machine; invalid moves are rejected by
/// the ledger.
pub async fn update_status(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderStatusUpdate>,
) -> Result<Json<OrderView>, ServerError> {
    if !user.is_admin() {
        return Err(ServerError::Forbidden(
            "only admins update order status".to_string(),
        ));
    }

    let order = state
        .ledger
        .update_order_status(id, unmap_status(payload.status))
        .await?;
    Ok(Json(view(order)))
}
