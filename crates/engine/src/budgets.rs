//! Monthly budgets and the pure status evaluator.
//!
//! A budget's scope is either a specific category or the whole spend
//! (`category_id = NULL`). At most one budget exists per (user, scope),
//! enforced by upsert-by-scope semantics in the ops layer.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::MoneyCents;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: String,
    pub category_id: Option<Uuid>,
    pub amount: MoneyCents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for Budget {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            category_id: model.category_id,
            amount: MoneyCents::new(model.amount_cents),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Health classification of a budget for the current month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetHealth {
    Ok,
    Warning,
    Exceeded,
}

impl BudgetHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Exceeded => "exceeded",
        }
    }
}

/// Derived view of a budget against the current month's spend.
///
/// Not persisted; recomputed on every read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub budget: Budget,
    pub spent: MoneyCents,
    pub remaining: MoneyCents,
    pub percentage: f64,
    pub health: BudgetHealth,
}

/// Result of evaluating a budget threshold against the spent amount.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation {
    pub remaining: MoneyCents,
    pub percentage: f64,
    pub health: BudgetHealth,
}

/// Evaluates a budget threshold against the spent amount.
///
/// `percentage` is uncapped (a 250% overshoot reports 250). The tier
/// thresholds are inclusive at the lower bound: warning at >= 80%,
/// exceeded at >= 100%. A non-positive `amount` reports 0% rather
/// than dividing by zero.
pub fn evaluate(amount: MoneyCents, spent: MoneyCents) -> Evaluation {
    let percentage = if amount.is_positive() {
        spent.cents() as f64 / amount.cents() as f64 * 100.0
    } else {
        0.0
    };

    let health = if percentage >= 100.0 {
        BudgetHealth::Exceeded
    } else if percentage >= 80.0 {
        BudgetHealth::Warning
    } else {
        BudgetHealth::Ok
    };

    Evaluation {
        remaining: amount - spent,
        percentage,
        health,
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub category_id: Option<Uuid>,
    pub amount_cents: i64,
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
        on_delete = "Cascade"
    )]
    Category,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
