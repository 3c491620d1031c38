use chrono::Utc;
use sea_orm::{
    ActiveValue, Condition, ModelTrait, QueryFilter, QueryOrder, TransactionTrait,
    sea_query::Expr, prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, budgets, categories, categories::Category, expenses,
};

use super::{Engine, normalize_required_text, validate_hex_color, with_tx};

const MAX_NAME_LEN: usize = 50;
const MAX_ICON_LEN: usize = 50;

impl Engine {
    /// Lists the system defaults plus the user's own categories,
    /// ordered by sort_order then name.
    pub async fn list_categories(&self, user_id: &str) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .filter(
                Condition::any()
                    .add(categories::Column::UserId.is_null())
                    .add(categories::Column::UserId.eq(user_id)),
            )
            .order_by_asc(categories::Column::SortOrder)
            .order_by_asc(categories::Column::Name)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Category::from).collect())
    }

    /// Creates a user category. The name must be unique among the
    /// categories the user can see, defaults included.
    pub async fn create_category(
        &self,
        user_id: &str,
        name: &str,
        icon: &str,
        color: &str,
    ) -> ResultEngine<Category> {
        let name = normalize_required_text(name, "category name", MAX_NAME_LEN)?;
        let icon = normalize_required_text(icon, "category icon", MAX_ICON_LEN)?;
        let color = validate_hex_color(color)?;

        with_tx!(self, |db_tx| {
            async {
                let duplicate = categories::Entity::find()
                    .filter(
                        Condition::any()
                            .add(categories::Column::UserId.is_null())
                            .add(categories::Column::UserId.eq(user_id)),
                    )
                    .filter(categories::Column::Name.eq(name.clone()))
                    .one(&db_tx)
                    .await?;
                if duplicate.is_some() {
                    return Err(EngineError::ExistingKey(name.clone()));
                }

                let next_order = categories::Entity::find()
                    .filter(categories::Column::UserId.eq(user_id))
                    .order_by_desc(categories::Column::SortOrder)
                    .one(&db_tx)
                    .await?
                    .map_or(100, |m| m.sort_order + 1);

                let active = categories::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4()),
                    user_id: ActiveValue::Set(Some(user_id.to_string())),
                    name: ActiveValue::Set(name.clone()),
                    icon: ActiveValue::Set(icon.clone()),
                    color: ActiveValue::Set(color.clone()),
                    sort_order: ActiveValue::Set(next_order),
                    is_default: ActiveValue::Set(false),
                    created_at: ActiveValue::Set(Utc::now()),
                };
                let model = active.insert(&db_tx).await?;
                Ok(Category::from(model))
            }
            .await
        })
    }

    /// Deletes a user category. System defaults are refused; expenses
    /// referencing the category survive with a null reference, while
    /// budgets scoped to it are deleted with it.
    pub async fn delete_category(&self, user_id: &str, id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            async {
                let model = categories::Entity::find_by_id(id)
                    .filter(
                        Condition::any()
                            .add(categories::Column::UserId.is_null())
                            .add(categories::Column::UserId.eq(user_id)),
                    )
                    .one(&db_tx)
                    .await?
                    .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?;
                if model.is_default {
                    return Err(EngineError::Validation(
                        "default categories cannot be deleted".to_string(),
                    ));
                }

                expenses::Entity::update_many()
                    .col_expr(expenses::Column::CategoryId, Expr::value(Option::<Uuid>::None))
                    .filter(expenses::Column::CategoryId.eq(id))
                    .exec(&db_tx)
                    .await?;
                budgets::Entity::delete_many()
                    .filter(budgets::Column::CategoryId.eq(id))
                    .exec(&db_tx)
                    .await?;
                model.delete(&db_tx).await?;
                Ok(())
            }
            .await
        })
    }
}
