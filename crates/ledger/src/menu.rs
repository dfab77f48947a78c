//! The module contains the canteen menu catalog.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, MoneyCents, ResultLedger};

/// Fixed set of menu categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Main,
    Snack,
    Drink,
    Dessert,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Snack => "snack",
            Self::Drink => "drink",
            Self::Dessert => "dessert",
        }
    }
}

impl TryFrom<&str> for Category {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "main" => Ok(Self::Main),
            "snack" => Ok(Self::Snack),
            "drink" => Ok(Self::Drink),
            "dessert" => Ok(Self::Dessert),
            other => Err(LedgerError::InvalidState(format!(
                "invalid menu category: {other}"
            ))),
        }
    }
}

/// A catalog entry parents can order.
///
/// `stock` is advisory: `None` means unlimited, otherwise it is kept `>= 0`
/// and decremented as orders are placed. Availability for ordering is owned
/// by the `available` flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub price: MoneyCents,
    pub category: Category,
    pub available: bool,
    pub stock: Option<i32>,
}

impl MenuItem {
    pub fn new(
        name: String,
        price: MoneyCents,
        category: Category,
        stock: Option<i32>,
    ) -> ResultLedger<Self> {
        if price.is_negative() {
            return Err(LedgerError::InvalidAmount(format!(
                "menu price must be >= 0, got {price}"
            )));
        }
        if let Some(stock) = stock
            && stock < 0
        {
            return Err(LedgerError::InvalidAmount(format!(
                "stock must be >= 0, got {stock}"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            price,
            category,
            available: true,
            stock,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "menu_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub price_minor: i64,
    pub category: String,
    pub available: bool,
    pub stock: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&MenuItem> for ActiveModel {
    fn from(item: &MenuItem) -> Self {
        Self {
            id: ActiveValue::Set(item.id.to_string()),
            name: ActiveValue::Set(item.name.clone()),
            price_minor: ActiveValue::Set(item.price.cents()),
            category: ActiveValue::Set(item.category.as_str().to_string()),
            available: ActiveValue::Set(item.available),
            stock: ActiveValue::Set(item.stock),
        }
    }
}

impl TryFrom<Model> for MenuItem {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::KeyNotFound("menu item not exists".to_string()))?,
            name: model.name,
            price: MoneyCents::new(model.price_minor),
            category: Category::try_from(model.category.as_str())?,
            available: model.available,
            stock: model.stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_price() {
        let item = MenuItem::new(
            "Pasta al pomodoro".to_string(),
            MoneyCents::new(-1),
            Category::Main,
            None,
        );
        assert!(matches!(item, Err(LedgerError::InvalidAmount(_))));
    }

    #[test]
    fn rejects_negative_stock() {
        let item = MenuItem::new(
            "Succo".to_string(),
            MoneyCents::new(150),
            Category::Drink,
            Some(-3),
        );
        assert!(matches!(item, Err(LedgerError::InvalidAmount(_))));
    }

    #[test]
    fn category_round_trips_through_str() {
        for category in [
            Category::Main,
            Category::Snack,
            Category::Drink,
            Category::Dessert,
        ] {
            assert_eq!(Category::try_from(category.as_str()).unwrap(), category);
        }
        assert!(Category::try_from("sides").is_err());
    }
}
