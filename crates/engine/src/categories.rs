//! Expense categories.
//!
//! A category with `user_id = NULL` is a system default: visible to
//! every user, never deletable. Deleting a user category leaves its
//! expenses alive with a null reference ("Uncategorized").

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed neutral color used when grouping uncategorized expenses.
pub const UNCATEGORIZED_COLOR: &str = "#6b7280";
pub const UNCATEGORIZED_NAME: &str = "Uncategorized";

/// Names of the system default categories seeded by the migration.
/// Also the vocabulary the OCR parser accepts for suggestions.
pub const DEFAULT_CATEGORY_NAMES: [&str; 10] = [
    "Groceries",
    "Dining",
    "Transportation",
    "Shopping",
    "Utilities",
    "Healthcare",
    "Entertainment",
    "Travel",
    "Education",
    "Other",
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub sort_order: i32,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Model> for Category {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            icon: model.icon,
            color: model.color,
            sort_order: model.sort_order,
            is_default: model.is_default,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Option<String>,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub sort_order: i32,
    pub is_default: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
    #[sea_orm(has_many = "super::budgets::Entity")]
    Budgets,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budgets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
