//! Expense records.
//!
//! `amount` is the authoritative total. `subtotal`/`tax`/`tip` are an
//! informational breakdown; no algebraic identity between them and
//! `amount` is enforced.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::MoneyCents;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: String,
    pub category_id: Option<Uuid>,
    pub receipt_id: Option<Uuid>,
    pub vendor: String,
    pub description: Option<String>,
    pub amount: MoneyCents,
    pub subtotal: Option<MoneyCents>,
    pub tax: Option<MoneyCents>,
    pub tip: Option<MoneyCents>,
    pub date: NaiveDate,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for Expense {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            category_id: model.category_id,
            receipt_id: model.receipt_id,
            vendor: model.vendor,
            description: model.description,
            amount: MoneyCents::new(model.amount_cents),
            subtotal: model.subtotal_cents.map(MoneyCents::new),
            tax: model.tax_cents.map(MoneyCents::new),
            tip: model.tip_cents.map(MoneyCents::new),
            date: model.date,
            is_verified: model.is_verified,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id),
            user_id: ActiveValue::Set(expense.user_id.clone()),
            category_id: ActiveValue::Set(expense.category_id),
            receipt_id: ActiveValue::Set(expense.receipt_id),
            vendor: ActiveValue::Set(expense.vendor.clone()),
            description: ActiveValue::Set(expense.description.clone()),
            amount_cents: ActiveValue::Set(expense.amount.cents()),
            subtotal_cents: ActiveValue::Set(expense.subtotal.map(MoneyCents::cents)),
            tax_cents: ActiveValue::Set(expense.tax.map(MoneyCents::cents)),
            tip_cents: ActiveValue::Set(expense.tip.map(MoneyCents::cents)),
            date: ActiveValue::Set(expense.date),
            is_verified: ActiveValue::Set(expense.is_verified),
            created_at: ActiveValue::Set(expense.created_at),
            updated_at: ActiveValue::Set(expense.updated_at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub category_id: Option<Uuid>,
    pub receipt_id: Option<Uuid>,
    pub vendor: String,
    pub description: Option<String>,
    pub amount_cents: i64,
    pub subtotal_cents: Option<i64>,
    pub tax_cents: Option<i64>,
    pub tip_cents: Option<i64>,
    pub date: Date,
    pub is_verified: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::receipts::Entity",
        from = "Column::ReceiptId",
        to = "super::receipts::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Receipt,
    #[sea_orm(has_many = "super::expense_items::Entity")]
    Items,
    #[sea_orm(has_many = "super::expense_tags::Entity")]
    ExpenseTags,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::receipts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Receipt.def()
    }
}

impl Related<super::expense_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::tags::Entity> for Entity {
    fn to() -> RelationDef {
        super::expense_tags::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::expense_tags::Relation::Expense.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
