use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    sea_query::Expr, prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, receipts,
    receipts::{Receipt, ReceiptStatus},
};

use super::{Engine, ExpenseDetail, ExpenseDraft, with_tx};

impl Engine {
    /// Inserts a `pending` receipt for an already reserved image path.
    pub async fn create_receipt(&self, user_id: &str, image_path: &str) -> ResultEngine<Receipt> {
        let now = Utc::now();
        let active = receipts::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            user_id: ActiveValue::Set(user_id.to_string()),
            image_path: ActiveValue::Set(image_path.to_string()),
            status: ActiveValue::Set(ReceiptStatus::Pending.as_str().to_string()),
            raw_ocr_text: ActiveValue::Set(None),
            confidence: ActiveValue::Set(None),
            error_message: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        let model = active.insert(&self.database).await?;
        Receipt::try_from(model)
    }

    pub async fn receipt(&self, user_id: &str, id: Uuid) -> ResultEngine<Receipt> {
        let model = receipts::Entity::find_by_id(id)
            .filter(receipts::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("receipt not exists".to_string()))?;
        Receipt::try_from(model)
    }

    /// Lists the user's receipts, newest first.
    pub async fn list_receipts(&self, user_id: &str) -> ResultEngine<Vec<Receipt>> {
        let models = receipts::Entity::find()
            .filter(receipts::Column::UserId.eq(user_id))
            .order_by_desc(receipts::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(Receipt::try_from).collect()
    }

    /// Claims a receipt for extraction by flipping it to `processing`.
    ///
    /// The transition is a single conditional update, so two
    /// concurrent extraction requests cannot both claim the same
    /// receipt: the second one fails with `InvalidStatus`. Allowed
    /// source states are `pending`, `review` (re-run before commit)
    /// and `failed` (retry); `processing` and `completed` refuse.
    pub async fn begin_extraction(&self, user_id: &str, id: Uuid) -> ResultEngine<Receipt> {
        self.transition_receipt(
            user_id,
            id,
            &[
                ReceiptStatus::Pending,
                ReceiptStatus::Review,
                ReceiptStatus::Failed,
            ],
            ReceiptStatus::Processing,
            |active| {
                active.error_message = ActiveValue::Set(None);
            },
        )
        .await
    }

    /// Records a successful extraction: raw model reply plus the
    /// confidence score, landing on `review`.
    pub async fn store_extraction(
        &self,
        user_id: &str,
        id: Uuid,
        raw_text: &str,
        confidence: f64,
    ) -> ResultEngine<Receipt> {
        let raw_text = raw_text.to_string();
        self.transition_receipt(
            user_id,
            id,
            &[ReceiptStatus::Processing],
            ReceiptStatus::Review,
            move |active| {
                active.raw_ocr_text = ActiveValue::Set(Some(raw_text));
                active.confidence = ActiveValue::Set(Some(confidence));
            },
        )
        .await
    }

    /// Records an extraction failure with the message, landing on
    /// `failed`. A failed receipt can be claimed again for a retry.
    pub async fn fail_extraction(
        &self,
        user_id: &str,
        id: Uuid,
        message: &str,
    ) -> ResultEngine<Receipt> {
        let message = message.to_string();
        self.transition_receipt(
            user_id,
            id,
            &[ReceiptStatus::Processing],
            ReceiptStatus::Failed,
            move |active| {
                active.error_message = ActiveValue::Set(Some(message));
            },
        )
        .await
    }

    /// Turns a reviewed receipt into an expense.
    ///
    /// The expense insert (with items and tag links) and the
    /// `review` -> `completed` flip are one transaction: any failure
    /// rolls everything back and the receipt stays reviewable.
    pub async fn commit_receipt(
        &self,
        user_id: &str,
        id: Uuid,
        draft: &ExpenseDraft,
    ) -> ResultEngine<ExpenseDetail> {
        with_tx!(self, |db_tx| {
            async {
                Self::conditional_flip(
                    &db_tx,
                    user_id,
                    id,
                    &[ReceiptStatus::Review],
                    ReceiptStatus::Completed,
                )
                .await?;

                let expense_id = Uuid::new_v4();
                self.insert_expense_tx(&db_tx, user_id, expense_id, Some(id), draft)
                    .await?;
                self.expense_detail_tx(&db_tx, user_id, expense_id).await
            }
            .await
        })
    }

    async fn transition_receipt<F>(
        &self,
        user_id: &str,
        id: Uuid,
        allowed_from: &[ReceiptStatus],
        to: ReceiptStatus,
        mutate: F,
    ) -> ResultEngine<Receipt>
    where
        F: FnOnce(&mut receipts::ActiveModel),
    {
        with_tx!(self, |db_tx| {
            async {
                Self::conditional_flip(&db_tx, user_id, id, allowed_from, to).await?;

                let model = receipts::Entity::find_by_id(id)
                    .filter(receipts::Column::UserId.eq(user_id))
                    .one(&db_tx)
                    .await?
                    .ok_or_else(|| EngineError::KeyNotFound("receipt not exists".to_string()))?;
                let mut active: receipts::ActiveModel = model.into();
                mutate(&mut active);
                active.updated_at = ActiveValue::Set(Utc::now());
                let model = active.update(&db_tx).await?;
                Receipt::try_from(model)
            }
            .await
        })
    }

    /// Flips `status` only when the row currently holds one of
    /// `allowed_from`. Zero affected rows means either the receipt
    /// does not exist (for this user) or the transition is invalid.
    async fn conditional_flip(
        db_tx: &DatabaseTransaction,
        user_id: &str,
        id: Uuid,
        allowed_from: &[ReceiptStatus],
        to: ReceiptStatus,
    ) -> ResultEngine<()> {
        let allowed: Vec<&str> = allowed_from.iter().map(|s| s.as_str()).collect();
        let result = receipts::Entity::update_many()
            .col_expr(receipts::Column::Status, Expr::value(to.as_str()))
            .filter(receipts::Column::Id.eq(id))
            .filter(receipts::Column::UserId.eq(user_id))
            .filter(receipts::Column::Status.is_in(allowed))
            .exec(db_tx)
            .await?;

        if result.rows_affected == 0 {
            let current = receipts::Entity::find_by_id(id)
                .filter(receipts::Column::UserId.eq(user_id))
                .one(db_tx)
                .await?;
            return match current {
                Some(model) => Err(EngineError::InvalidStatus(format!(
                    "cannot move receipt from {} to {}",
                    model.status,
                    to.as_str()
                ))),
                None => Err(EngineError::KeyNotFound("receipt not exists".to_string())),
            };
        }
        Ok(())
    }
}
