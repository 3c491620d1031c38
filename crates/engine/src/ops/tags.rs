use chrono::Utc;
use sea_orm::{
    ActiveValue, ModelTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, expense_tags, tags, tags::Tag};

use super::{Engine, normalize_required_text, validate_hex_color, with_tx};

const MAX_NAME_LEN: usize = 30;

impl Engine {
    /// Lists the user's tags, name ascending.
    pub async fn list_tags(&self, user_id: &str) -> ResultEngine<Vec<Tag>> {
        let models = tags::Entity::find()
            .filter(tags::Column::UserId.eq(user_id))
            .order_by_asc(tags::Column::Name)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Tag::from).collect())
    }

    /// Creates a tag. Names are unique per user.
    pub async fn create_tag(&self, user_id: &str, name: &str, color: &str) -> ResultEngine<Tag> {
        let name = normalize_required_text(name, "tag name", MAX_NAME_LEN)?;
        let color = validate_hex_color(color)?;

        with_tx!(self, |db_tx| {
            async {
                let duplicate = tags::Entity::find()
                    .filter(tags::Column::UserId.eq(user_id))
                    .filter(tags::Column::Name.eq(name.clone()))
                    .one(&db_tx)
                    .await?;
                if duplicate.is_some() {
                    return Err(EngineError::ExistingKey(name.clone()));
                }

                let active = tags::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4()),
                    user_id: ActiveValue::Set(user_id.to_string()),
                    name: ActiveValue::Set(name.clone()),
                    color: ActiveValue::Set(color.clone()),
                    created_at: ActiveValue::Set(Utc::now()),
                };
                let model = active.insert(&db_tx).await?;
                Ok(Tag::from(model))
            }
            .await
        })
    }

    /// Deletes a tag and its expense links; the expenses themselves
    /// are untouched.
    pub async fn delete_tag(&self, user_id: &str, id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            async {
                let model = tags::Entity::find_by_id(id)
                    .filter(tags::Column::UserId.eq(user_id))
                    .one(&db_tx)
                    .await?
                    .ok_or_else(|| EngineError::KeyNotFound("tag not exists".to_string()))?;

                expense_tags::Entity::delete_many()
                    .filter(expense_tags::Column::TagId.eq(id))
                    .exec(&db_tx)
                    .await?;
                model.delete(&db_tx).await?;
                Ok(())
            }
            .await
        })
    }
}
