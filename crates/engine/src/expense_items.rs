//! Line items owned by an expense.
//!
//! Items are replaced wholesale on expense update, never diffed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::MoneyCents;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseItem {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub name: String,
    pub quantity: f64,
    pub unit_price: MoneyCents,
    pub total_price: MoneyCents,
}

impl From<Model> for ExpenseItem {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            expense_id: model.expense_id,
            name: model.name,
            quantity: model.quantity,
            unit_price: MoneyCents::new(model.unit_price_cents),
            total_price: MoneyCents::new(model.total_price_cents),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub expense_id: Uuid,
    pub name: String,
    pub quantity: f64,
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expense,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
