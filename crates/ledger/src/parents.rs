//! The module contains the `Parent` wallet owner.
//!
//! A parent holds the single spendable balance for all of their linked
//! students. The balance column is written exclusively by the ledger's
//! compare-and-swap path; the `version` column is the optimistic-concurrency
//! token that serializes concurrent writers.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::MoneyCents;

/// A parent account and its wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parent {
    /// Opaque identifier, immutable after creation.
    pub user_id: String,
    pub balance: MoneyCents,
    /// Monotonic row version; bumped on every balance write.
    pub version: i64,
    /// Ids of the students linked to this wallet.
    pub children: Vec<String>,
}

impl Parent {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            balance: MoneyCents::ZERO,
            version: 0,
            children: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "parents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub balance_minor: i64,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::students::Entity")]
    Students,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::students::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Students.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Parent> for ActiveModel {
    fn from(parent: &Parent) -> Self {
        Self {
            user_id: ActiveValue::Set(parent.user_id.clone()),
            balance_minor: ActiveValue::Set(parent.balance.cents()),
            version: ActiveValue::Set(parent.version),
        }
    }
}

impl From<Model> for Parent {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            balance: MoneyCents::new(model.balance_minor),
            version: model.version,
            children: Vec::new(),
        }
    }
}
