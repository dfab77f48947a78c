//! Order lines.
//!
//! An [`OrderItem`] is a snapshot of one purchased menu line: it captures
//! name and price **at order time**, so later menu edits never alter
//! historical orders.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, MoneyCents, ResultLedger};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub menu_item_id: Uuid,
    /// Name at order time.
    pub name: String,
    /// Price at order time.
    pub price: MoneyCents,
    pub quantity: i64,
}

impl OrderItem {
    pub fn new(
        menu_item_id: Uuid,
        name: String,
        price: MoneyCents,
        quantity: i64,
    ) -> ResultLedger<Self> {
        if price.is_negative() {
            return Err(LedgerError::InvalidAmount(format!(
                "line price must be >= 0, got {price}"
            )));
        }
        if quantity < 1 {
            return Err(LedgerError::InvalidAmount(format!(
                "quantity must be >= 1, got {quantity}"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            menu_item_id,
            name,
            price,
            quantity,
        })
    }

    /// `price × quantity`, exact in integer cents.
    pub fn total(&self) -> ResultLedger<MoneyCents> {
        self.price
            .checked_mul(self.quantity)
            .ok_or_else(|| LedgerError::InvalidAmount("line total overflow".to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub order_id: String,
    pub menu_item_id: String,
    pub name: String,
    pub price_minor: i64,
    pub quantity: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Orders,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl OrderItem {
    /// Builds the row for this line under `order_id`.
    pub(crate) fn active_model(&self, order_id: Uuid) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Set(self.id.to_string()),
            order_id: ActiveValue::Set(order_id.to_string()),
            menu_item_id: ActiveValue::Set(self.menu_item_id.to_string()),
            name: ActiveValue::Set(self.name.clone()),
            price_minor: ActiveValue::Set(self.price.cents()),
            quantity: ActiveValue::Set(self.quantity),
        }
    }
}

impl TryFrom<Model> for OrderItem {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::KeyNotFound("order line not exists".to_string()))?,
            menu_item_id: Uuid::parse_str(&model.menu_item_id)
                .map_err(|_| LedgerError::KeyNotFound("menu item not exists".to_string()))?,
            name: model.name,
            price: MoneyCents::new(model.price_minor),
            quantity: model.quantity,
        })
    }
}
