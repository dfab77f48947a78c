//! Top-up requests.
//!
//! A top-up is a parent's request to add funds, subject to admin approval:
//! `pending → approved | declined`, then `approved → completed`. The wallet
//! is credited exactly at the `approved → completed` transition, which is
//! the ledger's `apply_topup` — a completed top-up can never credit again.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, MoneyCents, ResultLedger};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopupStatus {
    Pending,
    Approved,
    Declined,
    Completed,
}

impl TopupStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Declined => "declined",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for TopupStatus {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "declined" => Ok(Self::Declined),
            "completed" => Ok(Self::Completed),
            other => Err(LedgerError::InvalidState(format!(
                "invalid topup status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
            Self::Card => "card",
        }
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "cash" => Ok(Self::Cash),
            "bank_transfer" => Ok(Self::BankTransfer),
            "card" => Ok(Self::Card),
            other => Err(LedgerError::InvalidState(format!(
                "invalid payment method: {other}"
            ))),
        }
    }
}

/// A request to add funds to a parent wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topup {
    pub id: Uuid,
    pub parent_id: String,
    pub amount: MoneyCents,
    pub status: TopupStatus,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub requested_at: DateTime<Utc>,
}

impl Topup {
    pub fn new(
        parent_id: String,
        amount: MoneyCents,
        method: PaymentMethod,
        reference: Option<String>,
        requested_at: DateTime<Utc>,
    ) -> ResultLedger<Self> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "topup amount must be > 0, got {amount}"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            parent_id,
            amount,
            status: TopupStatus::Pending,
            method,
            reference,
            requested_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "topups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub parent_id: String,
    pub amount_minor: i64,
    pub status: String,
    pub method: String,
    pub reference: Option<String>,
    pub requested_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::parents::Entity",
        from = "Column::ParentId",
        to = "super::parents::Column::UserId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Parents,
}

impl Related<super::parents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Topup> for ActiveModel {
    fn from(topup: &Topup) -> Self {
        Self {
            id: ActiveValue::Set(topup.id.to_string()),
            parent_id: ActiveValue::Set(topup.parent_id.clone()),
            amount_minor: ActiveValue::Set(topup.amount.cents()),
            status: ActiveValue::Set(topup.status.as_str().to_string()),
            method: ActiveValue::Set(topup.method.as_str().to_string()),
            reference: ActiveValue::Set(topup.reference.clone()),
            requested_at: ActiveValue::Set(topup.requested_at),
        }
    }
}

impl TryFrom<Model> for Topup {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::KeyNotFound("topup not exists".to_string()))?,
            parent_id: model.parent_id,
            amount: MoneyCents::new(model.amount_minor),
            status: TopupStatus::try_from(model.status.as_str())?,
            method: PaymentMethod::try_from(model.method.as_str())?,
            reference: model.reference,
            requested_at: model.requested_at,
        })
    }
}
