//! Expense API endpoints.

use api_types::expense::{
    Expense, ExpenseDetail, ExpenseItem, ExpenseListEntry, ExpenseListQuery, ExpenseNew,
    ExpensePage,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{ExpenseSort, ItemDraft, MoneyCents, SortOrder};
use uuid::Uuid;

use crate::{ServerError, categories, server::ServerState, tags, user};

fn to_api_expense(expense: engine::Expense) -> Expense {
    Expense {
        id: expense.id,
        vendor: expense.vendor,
        description: expense.description,
        amount_cents: expense.amount.cents(),
        subtotal_cents: expense.subtotal.map(MoneyCents::cents),
        tax_cents: expense.tax.map(MoneyCents::cents),
        tip_cents: expense.tip.map(MoneyCents::cents),
        date: expense.date,
        category_id: expense.category_id,
        receipt_id: expense.receipt_id,
        is_verified: expense.is_verified,
        created_at: expense.created_at,
        updated_at: expense.updated_at,
    }
}

fn to_api_item(item: engine::ExpenseItem) -> ExpenseItem {
    ExpenseItem {
        id: item.id,
        name: item.name,
        quantity: item.quantity,
        unit_price_cents: item.unit_price.cents(),
        total_price_cents: item.total_price.cents(),
    }
}

pub(crate) fn to_api_detail(detail: engine::ExpenseDetail) -> ExpenseDetail {
    ExpenseDetail {
        expense: to_api_expense(detail.expense),
        category: detail.category.map(categories::to_api),
        items: detail.items.into_iter().map(to_api_item).collect(),
        tags: detail.tags.into_iter().map(tags::to_api).collect(),
    }
}

pub(crate) fn draft_from(payload: ExpenseNew) -> engine::ExpenseDraft {
    engine::ExpenseDraft {
        vendor: payload.vendor,
        description: payload.description,
        amount: MoneyCents::new(payload.amount_cents),
        subtotal: payload.subtotal_cents.map(MoneyCents::new),
        tax: payload.tax_cents.map(MoneyCents::new),
        tip: payload.tip_cents.map(MoneyCents::new),
        date: payload.date,
        category_id: payload.category_id,
        is_verified: payload.is_verified,
        items: payload
            .items
            .into_iter()
            .map(|item| ItemDraft {
                name: item.name,
                quantity: item.quantity,
                unit_price: MoneyCents::new(item.unit_price_cents),
                total_price: MoneyCents::new(item.total_price_cents),
            })
            .collect(),
        tag_ids: payload.tag_ids,
    }
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<ExpenseListQuery>,
) -> Result<Json<ExpensePage>, ServerError> {
    let filter = engine::ExpenseListFilter {
        category_id: query.category_id,
        search: query.search,
        date_from: query.date_from,
        date_to: query.date_to,
        sort_by: ExpenseSort::from_key(query.sort_by.as_deref().unwrap_or_default()),
        sort_order: SortOrder::from_key(query.sort_order.as_deref().unwrap_or_default()),
    };

    let page = state
        .engine
        .list_expenses(
            &user.username,
            &filter,
            query.page.unwrap_or(1),
            query.per_page.unwrap_or_default(),
        )
        .await?;

    Ok(Json(ExpensePage {
        expenses: page
            .rows
            .into_iter()
            .map(|row| ExpenseListEntry {
                expense: to_api_expense(row.expense),
                category: row.category.map(categories::to_api),
                tags: row.tags.into_iter().map(tags::to_api).collect(),
            })
            .collect(),
        total: page.total,
        page: page.page,
        per_page: page.per_page,
    }))
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseDetail>), ServerError> {
    let detail = state
        .engine
        .create_expense(&user.username, &draft_from(payload))
        .await?;
    Ok((StatusCode::CREATED, Json(to_api_detail(detail))))
}

pub async fn get_detail(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpenseDetail>, ServerError> {
    let detail = state.engine.expense(&user.username, id).await?;
    Ok(Json(to_api_detail(detail)))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExpenseNew>,
) -> Result<Json<ExpenseDetail>, ServerError> {
    let detail = state
        .engine
        .update_expense(&user.username, id, &draft_from(payload))
        .await?;
    Ok(Json(to_api_detail(detail)))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_expense(&user.username, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
