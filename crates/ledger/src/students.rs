//! The module contains the `Student` profile.
//!
//! A student carries identity data only. The `legacy_balance` column is kept
//! for display parity with historical exports; no billing path reads it —
//! every charge goes through the parent wallet.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A student linked to at most one parent wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub parent_id: Option<String>,
    pub name: String,
    pub grade: String,
    /// Free-text allergy/dietary notes shown to canteen staff.
    pub dietary_notes: Option<String>,
    pub legacy_balance: i64,
}

impl Student {
    pub fn new(name: String, grade: String, dietary_notes: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            name,
            grade,
            dietary_notes,
            legacy_balance: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub grade: String,
    pub dietary_notes: Option<String>,
    pub legacy_balance: i64,
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

impl From<&Student> for ActiveModel {
    fn from(student: &Student) -> Self {
        Self {
            id: ActiveValue::Set(student.id.to_string()),
            parent_id: ActiveValue::Set(student.parent_id.clone()),
            name: ActiveValue::Set(student.name.clone()),
            grade: ActiveValue::Set(student.grade.clone()),
            dietary_notes: ActiveValue::Set(student.dietary_notes.clone()),
            legacy_balance: ActiveValue::Set(student.legacy_balance),
        }
    }
}

impl TryFrom<Model> for Student {
    type Error = crate::LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| crate::LedgerError::KeyNotFound("student not exists".to_string()))?,
            parent_id: model.parent_id,
            name: model.name,
            grade: model.grade,
            dietary_notes: model.dietary_notes,
            legacy_balance: model.legacy_balance,
        })
    }
}
