//! Orders and the order status state machine.
//!
//! Status moves only forward along
//! `pending → confirmed → preparing → ready → completed`, with every
//! non-terminal state also allowing `cancelled`. The two terminal states
//! stamp `completed_at`/`cancelled_at` and accept no further moves.
//!
//! An order's total is fixed at creation from its snapshot lines and is
//! never recomputed implicitly afterwards.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, MoneyCents, ResultLedger, order_items::OrderItem};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether `self → next` is on the status graph.
    #[must_use]
    pub fn can_transition(self, next: OrderStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Confirmed)
            | (Self::Confirmed, Self::Preparing)
            | (Self::Preparing, Self::Ready)
            | (Self::Ready, Self::Completed) => true,
            (from, Self::Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "preparing" => Ok(Self::Preparing),
            "ready" => Ok(Self::Ready),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(LedgerError::InvalidState(format!(
                "invalid order status: {other}"
            ))),
        }
    }
}

/// A placed order with its snapshot lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub parent_id: String,
    pub student_id: Uuid,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub total: MoneyCents,
    pub order_date: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub instructions: Option<String>,
}

impl Order {
    /// Builds an order in `pending` with `total` derived from its lines.
    pub fn new(
        parent_id: String,
        student_id: Uuid,
        items: Vec<OrderItem>,
        order_date: DateTime<Utc>,
        instructions: Option<String>,
    ) -> ResultLedger<Self> {
        if items.is_empty() {
            return Err(LedgerError::InvalidAmount(
                "order needs at least one line".to_string(),
            ));
        }
        let mut total = MoneyCents::ZERO;
        for item in &items {
            total = total
                .checked_add(item.total()?)
                .ok_or_else(|| LedgerError::InvalidAmount("order total overflow".to_string()))?;
        }
        Ok(Self {
            id: Uuid::new_v4(),
            parent_id,
            student_id,
            items,
            status: OrderStatus::Pending,
            total,
            order_date,
            completed_at: None,
            cancelled_at: None,
            instructions,
        })
    }

    /// Moves the order to `next`, stamping the terminal timestamps.
    pub fn transition(&mut self, next: OrderStatus, at: DateTime<Utc>) -> ResultLedger<()> {
        if !self.status.can_transition(next) {
            return Err(LedgerError::InvalidTransition(format!(
                "{} -> {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        match next {
            OrderStatus::Completed => self.completed_at = Some(at),
            OrderStatus::Cancelled => self.cancelled_at = Some(at),
            _ => {}
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub parent_id: String,
    pub student_id: String,
    pub status: String,
    pub total_minor: i64,
    pub order_date: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
    pub cancelled_at: Option<DateTimeUtc>,
    pub instructions: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
    #[sea_orm(
        belongs_to = "super::parents::Entity",
        from = "Column::ParentId",
        to = "super::parents::Column::UserId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Parents,
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::parents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Order> for ActiveModel {
    fn from(order: &Order) -> Self {
        Self {
            id: ActiveValue::Set(order.id.to_string()),
            parent_id: ActiveValue::Set(order.parent_id.clone()),
            student_id: ActiveValue::Set(order.student_id.to_string()),
            status: ActiveValue::Set(order.status.as_str().to_string()),
            total_minor: ActiveValue::Set(order.total.cents()),
            order_date: ActiveValue::Set(order.order_date),
            completed_at: ActiveValue::Set(order.completed_at),
            cancelled_at: ActiveValue::Set(order.cancelled_at),
            instructions: ActiveValue::Set(order.instructions.clone()),
        }
    }
}

impl TryFrom<Model> for Order {
    type Error = LedgerError;

    /// Lines are loaded separately; the result starts with `items` empty.
    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::KeyNotFound("order not exists".to_string()))?,
            parent_id: model.parent_id,
            student_id: Uuid::parse_str(&model.student_id)
                .map_err(|_| LedgerError::KeyNotFound("student not exists".to_string()))?,
            items: Vec::new(),
            status: OrderStatus::try_from(model.status.as_str())?,
            total: MoneyCents::new(model.total_minor),
            order_date: model.order_date,
            completed_at: model.completed_at,
            cancelled_at: model.cancelled_at,
            instructions: model.instructions,
        })
    }
}
