//! Parent wallet ledger entries.
//!
//! A [`ParentTransaction`] records exactly one balance mutation (or, for
//! deferred weekly orders, the promise of one). Entries are append-only:
//! they are never updated or deleted once written, and replaying their
//! amounts in creation order must reproduce the current wallet balance.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, MoneyCents, ResultLedger};

/// Structural tag of a ledger entry.
///
/// Classification is carried by this tag, not by the sign of the amount or
/// by matching substrings of the free-text reason. A realization points back
/// to its deferred origin via `deferred_transaction_id`, which is unique, so
/// a deferred charge can be applied at most once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Topup,
    Charge,
    DeferredCharge,
    RealizedDeferredCharge,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Topup => "topup",
            Self::Charge => "charge",
            Self::DeferredCharge => "deferred_charge",
            Self::RealizedDeferredCharge => "realized_deferred_charge",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "topup" => Ok(Self::Topup),
            "charge" => Ok(Self::Charge),
            "deferred_charge" => Ok(Self::DeferredCharge),
            "realized_deferred_charge" => Ok(Self::RealizedDeferredCharge),
            other => Err(LedgerError::InvalidState(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// How an entry is grouped in filtering and summary views.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionClass {
    Topup,
    Deduction,
    PendingDeferred,
}

/// One immutable wallet ledger entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentTransaction {
    pub id: Uuid,
    pub parent_id: String,
    pub kind: TransactionKind,
    /// Signed: positive credits the wallet, negative debits it, zero records
    /// a deferred charge.
    pub amount: MoneyCents,
    pub balance_before: MoneyCents,
    pub balance_after: MoneyCents,
    /// Orders this entry settles (empty for top-ups).
    pub order_ids: Vec<String>,
    /// Set only on `Topup` entries; unique, so a top-up credits once.
    pub topup_id: Option<String>,
    /// Set only on `RealizedDeferredCharge` entries; unique link back to the
    /// deferred origin.
    pub deferred_transaction_id: Option<Uuid>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl ParentTransaction {
    pub(crate) fn new(
        parent_id: String,
        kind: TransactionKind,
        amount: MoneyCents,
        balance_before: MoneyCents,
        balance_after: MoneyCents,
        order_ids: Vec<String>,
        reason: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id,
            kind,
            amount,
            balance_before,
            balance_after,
            order_ids,
            topup_id: None,
            deferred_transaction_id: None,
            reason,
            created_at,
        }
    }

    /// Pure classification for filtering/summary views.
    #[must_use]
    pub fn classify(&self) -> TransactionClass {
        match self.kind {
            TransactionKind::Topup => TransactionClass::Topup,
            TransactionKind::Charge | TransactionKind::RealizedDeferredCharge => {
                TransactionClass::Deduction
            }
            TransactionKind::DeferredCharge => TransactionClass::PendingDeferred,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "parent_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub parent_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub balance_before_minor: i64,
    pub balance_after_minor: i64,
    /// JSON array of order ids.
    pub order_ids: String,
    pub topup_id: Option<String>,
    pub deferred_transaction_id: Option<String>,
    pub reason: String,
    pub created_at: DateTimeUtc,
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

impl TryFrom<&ParentTransaction> for ActiveModel {
    type Error = LedgerError;

    fn try_from(tx: &ParentTransaction) -> ResultLedger<Self> {
        let order_ids = serde_json::to_string(&tx.order_ids)
            .map_err(|err| LedgerError::InvalidState(format!("invalid order id list: {err}")))?;
        Ok(Self {
            id: ActiveValue::Set(tx.id.to_string()),
            parent_id: ActiveValue::Set(tx.parent_id.clone()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount.cents()),
            balance_before_minor: ActiveValue::Set(tx.balance_before.cents()),
            balance_after_minor: ActiveValue::Set(tx.balance_after.cents()),
            order_ids: ActiveValue::Set(order_ids),
            topup_id: ActiveValue::Set(tx.topup_id.clone()),
            deferred_transaction_id: ActiveValue::Set(
                tx.deferred_transaction_id.map(|id| id.to_string()),
            ),
            reason: ActiveValue::Set(tx.reason.clone()),
            created_at: ActiveValue::Set(tx.created_at),
        })
    }
}

impl TryFrom<Model> for ParentTransaction {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let order_ids: Vec<String> = serde_json::from_str(&model.order_ids)
            .map_err(|err| LedgerError::InvalidState(format!("invalid order id list: {err}")))?;
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::KeyNotFound("transaction not exists".to_string()))?,
            parent_id: model.parent_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount: MoneyCents::new(model.amount_minor),
            balance_before: MoneyCents::new(model.balance_before_minor),
            balance_after: MoneyCents::new(model.balance_after_minor),
            order_ids,
            topup_id: model.topup_id,
            deferred_transaction_id: model
                .deferred_transaction_id
                .and_then(|raw| Uuid::parse_str(&raw).ok()),
            reason: model.reason,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn entry(kind: TransactionKind, amount: i64) -> ParentTransaction {
        ParentTransaction::new(
            "carla".to_string(),
            kind,
            MoneyCents::new(amount),
            MoneyCents::new(50_00),
            MoneyCents::new(50_00 + amount),
            Vec::new(),
            "test".to_string(),
            chrono::Utc.timestamp_opt(0, 0).unwrap(),
        )
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            TransactionKind::Topup,
            TransactionKind::Charge,
            TransactionKind::DeferredCharge,
            TransactionKind::RealizedDeferredCharge,
        ] {
            assert_eq!(TransactionKind::try_from(kind.as_str()).unwrap(), kind);
        }
        assert!(TransactionKind::try_from("weekly?deferred").is_err());
    }

    #[test]
    fn classification_is_structural() {
        assert_eq!(
            entry(TransactionKind::Topup, 25_000).classify(),
            TransactionClass::Topup
        );
        assert_eq!(
            entry(TransactionKind::Charge, -11_000).classify(),
            TransactionClass::Deduction
        );
        assert_eq!(
            entry(TransactionKind::RealizedDeferredCharge, -7_500).classify(),
            TransactionClass::Deduction
        );
        // A deferred entry has amount 0; the tag alone marks it pending.
        assert_eq!(
            entry(TransactionKind::DeferredCharge, 0).classify(),
            TransactionClass::PendingDeferred
        );
    }

    #[test]
    fn model_round_trip_keeps_order_ids() {
        let mut tx = entry(TransactionKind::Charge, -11_000);
        tx.order_ids = vec!["order-1".to_string(), "order-2".to_string()];
        let model_source = ActiveModel::try_from(&tx).unwrap();
        let model = Model {
            id: tx.id.to_string(),
            parent_id: tx.parent_id.clone(),
            kind: tx.kind.as_str().to_string(),
            amount_minor: tx.amount.cents(),
            balance_before_minor: tx.balance_before.cents(),
            balance_after_minor: tx.balance_after.cents(),
            order_ids: match model_source.order_ids {
                ActiveValue::Set(raw) => raw,
                _ => unreachable!(),
            },
            topup_id: None,
            deferred_transaction_id: None,
            reason: tx.reason.clone(),
            created_at: tx.created_at,
        };

        let back = ParentTransaction::try_from(model).unwrap();
        assert_eq!(back, tx);
    }
}
