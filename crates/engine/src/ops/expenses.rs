use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine, categories, expense_items, expense_tags, expenses,
    expenses::Expense, tags,
};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

pub(super) const DEFAULT_PER_PAGE: u64 = 20;
const MAX_VENDOR_LEN: usize = 100;

/// Caller-supplied fields for creating or updating an expense.
///
/// `items` and `tag_ids` are the full new state: on update the stored
/// line items and tag links are replaced wholesale, never diffed.
#[derive(Clone, Debug, Default)]
pub struct ExpenseDraft {
    pub vendor: String,
    pub description: Option<String>,
    pub amount: MoneyCents,
    pub subtotal: Option<MoneyCents>,
    pub tax: Option<MoneyCents>,
    pub tip: Option<MoneyCents>,
    pub date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
    pub is_verified: bool,
    pub items: Vec<ItemDraft>,
    pub tag_ids: Vec<Uuid>,
}

#[derive(Clone, Debug)]
pub struct ItemDraft {
    pub name: String,
    pub quantity: f64,
    pub unit_price: MoneyCents,
    pub total_price: MoneyCents,
}

/// Sortable columns for expense listing. Unknown keys fall back to
/// `Date` instead of erroring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExpenseSort {
    #[default]
    Date,
    Amount,
    Vendor,
    CreatedAt,
}

impl ExpenseSort {
    pub fn from_key(key: &str) -> Self {
        match key {
            "amount" => Self::Amount,
            "vendor" => Self::Vendor,
            "created_at" => Self::CreatedAt,
            _ => Self::Date,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn from_key(key: &str) -> Self {
        match key {
            "asc" => Self::Asc,
            _ => Self::Desc,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExpenseListFilter {
    pub category_id: Option<Uuid>,
    /// Free-text match over vendor and description.
    pub search: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub sort_by: ExpenseSort,
    pub sort_order: SortOrder,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExpenseListRow {
    pub expense: Expense,
    pub category: Option<categories::Category>,
    pub tags: Vec<tags::Tag>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExpensePage {
    pub rows: Vec<ExpenseListRow>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Full detail of a single expense with everything joined.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpenseDetail {
    pub expense: Expense,
    pub category: Option<categories::Category>,
    pub items: Vec<expense_items::ExpenseItem>,
    pub tags: Vec<tags::Tag>,
}

fn validate_draft(draft: &ExpenseDraft) -> ResultEngine<(String, Option<String>)> {
    let vendor = normalize_required_text(&draft.vendor, "vendor", MAX_VENDOR_LEN)?;
    let description = normalize_optional_text(draft.description.as_deref());

    if !draft.amount.is_positive() {
        return Err(EngineError::InvalidAmount(
            "amount must be > 0".to_string(),
        ));
    }
    for (label, value) in [
        ("subtotal", draft.subtotal),
        ("tax", draft.tax),
        ("tip", draft.tip),
    ] {
        if value.is_some_and(MoneyCents::is_negative) {
            return Err(EngineError::InvalidAmount(format!(
                "{label} must not be negative"
            )));
        }
    }
    for item in &draft.items {
        if item.name.trim().is_empty() {
            return Err(EngineError::Validation(
                "item name must not be empty".to_string(),
            ));
        }
        if !item.quantity.is_finite() || item.quantity < 0.0 {
            return Err(EngineError::InvalidAmount(
                "item quantity must be >= 0".to_string(),
            ));
        }
        if item.unit_price.is_negative() || item.total_price.is_negative() {
            return Err(EngineError::InvalidAmount(
                "item prices must not be negative".to_string(),
            ));
        }
    }

    Ok((vendor, description))
}

impl Engine {
    /// Creates an expense together with its line items and tag links.
    pub async fn create_expense(
        &self,
        user_id: &str,
        draft: &ExpenseDraft,
    ) -> ResultEngine<ExpenseDetail> {
        let id = Uuid::new_v4();
        with_tx!(self, |db_tx| {
            async {
                self.insert_expense_tx(&db_tx, user_id, id, None, draft)
                    .await?;
                self.expense_detail_tx(&db_tx, user_id, id).await
            }
            .await
        })
    }

    /// Updates an expense, replacing line items and tag links wholesale.
    pub async fn update_expense(
        &self,
        user_id: &str,
        id: Uuid,
        draft: &ExpenseDraft,
    ) -> ResultEngine<ExpenseDetail> {
        with_tx!(self, |db_tx| {
            async {
                let existing = Self::require_expense(&db_tx, user_id, id).await?;
                let (vendor, description) = validate_draft(draft)?;
                self.require_refs(&db_tx, user_id, draft).await?;

                expense_items::Entity::delete_many()
                    .filter(expense_items::Column::ExpenseId.eq(id))
                    .exec(&db_tx)
                    .await?;
                expense_tags::Entity::delete_many()
                    .filter(expense_tags::Column::ExpenseId.eq(id))
                    .exec(&db_tx)
                    .await?;

                let active = expenses::ActiveModel {
                    id: ActiveValue::Set(id),
                    user_id: ActiveValue::Set(user_id.to_string()),
                    category_id: ActiveValue::Set(draft.category_id),
                    receipt_id: ActiveValue::Set(existing.receipt_id),
                    vendor: ActiveValue::Set(vendor),
                    description: ActiveValue::Set(description),
                    amount_cents: ActiveValue::Set(draft.amount.cents()),
                    subtotal_cents: ActiveValue::Set(draft.subtotal.map(MoneyCents::cents)),
                    tax_cents: ActiveValue::Set(draft.tax.map(MoneyCents::cents)),
                    tip_cents: ActiveValue::Set(draft.tip.map(MoneyCents::cents)),
                    date: ActiveValue::Set(draft.date.unwrap_or(existing.date)),
                    is_verified: ActiveValue::Set(draft.is_verified),
                    created_at: ActiveValue::Set(existing.created_at),
                    updated_at: ActiveValue::Set(Utc::now()),
                };
                active.update(&db_tx).await?;

                Self::insert_children(&db_tx, id, draft).await?;
                self.expense_detail_tx(&db_tx, user_id, id).await
            }
            .await
        })
    }

    /// Deletes an expense; line items and tag links go with it.
    pub async fn delete_expense(&self, user_id: &str, id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            async {
                let model = Self::require_expense(&db_tx, user_id, id).await?;
                expense_items::Entity::delete_many()
                    .filter(expense_items::Column::ExpenseId.eq(id))
                    .exec(&db_tx)
                    .await?;
                expense_tags::Entity::delete_many()
                    .filter(expense_tags::Column::ExpenseId.eq(id))
                    .exec(&db_tx)
                    .await?;
                model.delete(&db_tx).await?;
                Ok(())
            }
            .await
        })
    }

    /// Returns a single expense with category, items and tags joined.
    pub async fn expense(&self, user_id: &str, id: Uuid) -> ResultEngine<ExpenseDetail> {
        with_tx!(self, |db_tx| {
            self.expense_detail_tx(&db_tx, user_id, id).await
        })
    }

    /// Lists expenses with filtering, sorting and offset pagination.
    ///
    /// `page` is 1-based and coerced to at least 1; `per_page` of 0
    /// falls back to the default of 20. The returned total counts all
    /// rows matching the filter, not just the current page.
    pub async fn list_expenses(
        &self,
        user_id: &str,
        filter: &ExpenseListFilter,
        page: u64,
        per_page: u64,
    ) -> ResultEngine<ExpensePage> {
        let page = page.max(1);
        let per_page = if per_page == 0 {
            DEFAULT_PER_PAGE
        } else {
            per_page
        };

        let mut query = expenses::Entity::find().filter(expenses::Column::UserId.eq(user_id));

        if let Some(category_id) = filter.category_id {
            query = query.filter(expenses::Column::CategoryId.eq(category_id));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(expenses::Column::Vendor.contains(search))
                    .add(expenses::Column::Description.contains(search)),
            );
        }
        if let Some(from) = filter.date_from {
            query = query.filter(expenses::Column::Date.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(expenses::Column::Date.lte(to));
        }

        let total = query.clone().count(&self.database).await?;

        let column = match filter.sort_by {
            ExpenseSort::Date => expenses::Column::Date,
            ExpenseSort::Amount => expenses::Column::AmountCents,
            ExpenseSort::Vendor => expenses::Column::Vendor,
            ExpenseSort::CreatedAt => expenses::Column::CreatedAt,
        };
        query = match filter.sort_order {
            SortOrder::Asc => query.order_by_asc(column),
            SortOrder::Desc => query.order_by_desc(column),
        };
        // Deterministic page boundaries on ties.
        query = query.order_by_desc(expenses::Column::Id);

        // The driver binds u64 as i64, so keep offset and limit in
        // range instead of overflowing on absurd page values.
        let offset = page
            .saturating_sub(1)
            .saturating_mul(per_page)
            .min(i64::MAX as u64);
        let models = query
            .find_also_related(categories::Entity)
            .offset(offset)
            .limit(per_page.min(i64::MAX as u64))
            .all(&self.database)
            .await?;

        let mut rows = Vec::with_capacity(models.len());
        for (expense_model, category_model) in models {
            let expense_tags = expense_model
                .find_related(tags::Entity)
                .order_by_asc(tags::Column::Name)
                .all(&self.database)
                .await?;
            rows.push(ExpenseListRow {
                expense: Expense::from(expense_model),
                category: category_model.map(categories::Category::from),
                tags: expense_tags.into_iter().map(tags::Tag::from).collect(),
            });
        }

        Ok(ExpensePage {
            rows,
            total,
            page,
            per_page,
        })
    }

    /// Inserts a new expense row plus children inside `db_tx`.
    ///
    /// Shared between `create_expense` and the receipt commit, which
    /// additionally links the originating receipt.
    pub(super) async fn insert_expense_tx(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        id: Uuid,
        receipt_id: Option<Uuid>,
        draft: &ExpenseDraft,
    ) -> ResultEngine<()> {
        let (vendor, description) = validate_draft(draft)?;
        self.require_refs(db_tx, user_id, draft).await?;

        let now = Utc::now();
        let active = expenses::ActiveModel {
            id: ActiveValue::Set(id),
            user_id: ActiveValue::Set(user_id.to_string()),
            category_id: ActiveValue::Set(draft.category_id),
            receipt_id: ActiveValue::Set(receipt_id),
            vendor: ActiveValue::Set(vendor),
            description: ActiveValue::Set(description),
            amount_cents: ActiveValue::Set(draft.amount.cents()),
            subtotal_cents: ActiveValue::Set(draft.subtotal.map(MoneyCents::cents)),
            tax_cents: ActiveValue::Set(draft.tax.map(MoneyCents::cents)),
            tip_cents: ActiveValue::Set(draft.tip.map(MoneyCents::cents)),
            date: ActiveValue::Set(draft.date.unwrap_or_else(|| now.date_naive())),
            is_verified: ActiveValue::Set(draft.is_verified),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        active.insert(db_tx).await?;

        Self::insert_children(db_tx, id, draft).await
    }

    async fn insert_children(
        db_tx: &DatabaseTransaction,
        expense_id: Uuid,
        draft: &ExpenseDraft,
    ) -> ResultEngine<()> {
        for item in &draft.items {
            let active = expense_items::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                expense_id: ActiveValue::Set(expense_id),
                name: ActiveValue::Set(item.name.trim().to_string()),
                quantity: ActiveValue::Set(item.quantity),
                unit_price_cents: ActiveValue::Set(item.unit_price.cents()),
                total_price_cents: ActiveValue::Set(item.total_price.cents()),
            };
            active.insert(db_tx).await?;
        }
        for tag_id in &draft.tag_ids {
            let active = expense_tags::ActiveModel {
                expense_id: ActiveValue::Set(expense_id),
                tag_id: ActiveValue::Set(*tag_id),
            };
            active.insert(db_tx).await?;
        }
        Ok(())
    }

    /// Checks that the draft's category and tags exist and are visible
    /// to the user before anything is written.
    async fn require_refs(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        draft: &ExpenseDraft,
    ) -> ResultEngine<()> {
        if let Some(category_id) = draft.category_id {
            categories::Entity::find_by_id(category_id)
                .filter(
                    Condition::any()
                        .add(categories::Column::UserId.is_null())
                        .add(categories::Column::UserId.eq(user_id)),
                )
                .one(db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?;
        }
        for tag_id in &draft.tag_ids {
            tags::Entity::find_by_id(*tag_id)
                .filter(tags::Column::UserId.eq(user_id))
                .one(db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("tag not exists".to_string()))?;
        }
        Ok(())
    }

    pub(super) async fn require_expense(
        db_tx: &DatabaseTransaction,
        user_id: &str,
        id: Uuid,
    ) -> ResultEngine<expenses::Model> {
        expenses::Entity::find_by_id(id)
            .filter(expenses::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))
    }

    pub(super) async fn expense_detail_tx(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        id: Uuid,
    ) -> ResultEngine<ExpenseDetail> {
        let model = Self::require_expense(db_tx, user_id, id).await?;

        let category = match model.category_id {
            Some(category_id) => categories::Entity::find_by_id(category_id)
                .one(db_tx)
                .await?
                .map(categories::Category::from),
            None => None,
        };
        let items = model
            .find_related(expense_items::Entity)
            .order_by_asc(expense_items::Column::Id)
            .all(db_tx)
            .await?;
        let expense_tags = model
            .find_related(tags::Entity)
            .order_by_asc(tags::Column::Name)
            .all(db_tx)
            .await?;

        Ok(ExpenseDetail {
            expense: Expense::from(model),
            category,
            items: items
                .into_iter()
                .map(expense_items::ExpenseItem::from)
                .collect(),
            tags: expense_tags.into_iter().map(tags::Tag::from).collect(),
        })
    }
}
