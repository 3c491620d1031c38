use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveValue, Condition, ModelTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine, budgets,
    budgets::{Budget, BudgetStatus},
    categories, expenses,
};

use super::{Engine, with_tx};

impl Engine {
    /// Creates or updates the budget for a scope.
    ///
    /// The scope identity is `(user, category_id)` with `None` meaning
    /// the overall budget, so at most one budget ever exists per
    /// scope. Returns the budget and whether it was newly created.
    pub async fn upsert_budget(
        &self,
        user_id: &str,
        category_id: Option<Uuid>,
        amount: MoneyCents,
    ) -> ResultEngine<(Budget, bool)> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "budget amount must be > 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            async {
                if let Some(category_id) = category_id {
                    categories::Entity::find_by_id(category_id)
                        .filter(
                            Condition::any()
                                .add(categories::Column::UserId.is_null())
                                .add(categories::Column::UserId.eq(user_id)),
                        )
                        .one(&db_tx)
                        .await?
                        .ok_or_else(|| {
                            EngineError::KeyNotFound("category not exists".to_string())
                        })?;
                }

                let scope = match category_id {
                    Some(id) => budgets::Column::CategoryId.eq(id),
                    None => budgets::Column::CategoryId.is_null(),
                };
                let existing = budgets::Entity::find()
                    .filter(budgets::Column::UserId.eq(user_id))
                    .filter(scope)
                    .one(&db_tx)
                    .await?;

                match existing {
                    Some(model) => {
                        let mut active: budgets::ActiveModel = model.into();
                        active.amount_cents = ActiveValue::Set(amount.cents());
                        active.updated_at = ActiveValue::Set(Utc::now());
                        let model = active.update(&db_tx).await?;
                        Ok((Budget::from(model), false))
                    }
                    None => {
                        let now = Utc::now();
                        let active = budgets::ActiveModel {
                            id: ActiveValue::Set(Uuid::new_v4()),
                            user_id: ActiveValue::Set(user_id.to_string()),
                            category_id: ActiveValue::Set(category_id),
                            amount_cents: ActiveValue::Set(amount.cents()),
                            created_at: ActiveValue::Set(now),
                            updated_at: ActiveValue::Set(now),
                        };
                        let model = active.insert(&db_tx).await?;
                        Ok((Budget::from(model), true))
                    }
                }
            }
            .await
        })
    }

    /// Evaluates every budget against the spend inside the closed date
    /// interval `[from, to]` (typically the current month).
    ///
    /// Scoped budgets sum their category's expenses; the overall
    /// budget sums everything.
    pub async fn budget_statuses(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultEngine<Vec<BudgetStatus>> {
        let budget_models = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .order_by_asc(budgets::Column::CreatedAt)
            .all(&self.database)
            .await?;

        let mut statuses = Vec::with_capacity(budget_models.len());
        for model in budget_models {
            let mut query = expenses::Entity::find()
                .select_only()
                .column_as(expenses::Column::AmountCents.sum(), "total")
                .filter(expenses::Column::UserId.eq(user_id))
                .filter(expenses::Column::Date.gte(from))
                .filter(expenses::Column::Date.lte(to));
            if let Some(category_id) = model.category_id {
                query = query.filter(expenses::Column::CategoryId.eq(category_id));
            }
            let spent_cents: Option<Option<i64>> =
                query.into_tuple().one(&self.database).await?;
            let spent = MoneyCents::new(spent_cents.flatten().unwrap_or(0));

            let budget = Budget::from(model);
            let eval = budgets::evaluate(budget.amount, spent);
            statuses.push(BudgetStatus {
                budget,
                spent,
                remaining: eval.remaining,
                percentage: eval.percentage,
                health: eval.health,
            });
        }

        Ok(statuses)
    }

    /// Deletes a budget.
    pub async fn delete_budget(&self, user_id: &str, id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            async {
                let model = budgets::Entity::find_by_id(id)
                    .filter(budgets::Column::UserId.eq(user_id))
                    .one(&db_tx)
                    .await?
                    .ok_or_else(|| EngineError::KeyNotFound("budget not exists".to_string()))?;
                model.delete(&db_tx).await?;
                Ok(())
            }
            .await
        })
    }
}
