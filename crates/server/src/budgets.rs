//! Budget API endpoints.

use api_types::budget::{Budget, BudgetPut, BudgetStatus, BudgetWindowQuery};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{Datelike, NaiveDate, Utc};
use engine::MoneyCents;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn to_api(budget: engine::Budget) -> Budget {
    Budget {
        id: budget.id,
        category_id: budget.category_id,
        amount_cents: budget.amount.cents(),
        created_at: budget.created_at,
        updated_at: budget.updated_at,
    }
}

/// First and last day of the month `today` falls in.
fn current_month(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let from = today.with_day(1).unwrap_or(today);
    let next_month = if today.month() == 12 {
        NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
    };
    let to = next_month.and_then(|d| d.pred_opt()).unwrap_or(today);
    (from, to)
}

pub async fn upsert(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetPut>,
) -> Result<(StatusCode, Json<Budget>), ServerError> {
    let (budget, created) = state
        .engine
        .upsert_budget(
            &user.username,
            payload.category_id,
            MoneyCents::new(payload.amount_cents),
        )
        .await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(to_api(budget))))
}

/// Budget statuses over a date window, defaulting to the current
/// month.
pub async fn statuses(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<BudgetWindowQuery>,
) -> Result<Json<Vec<BudgetStatus>>, ServerError> {
    let (month_start, month_end) = current_month(Utc::now().date_naive());
    let from = query.date_from.unwrap_or(month_start);
    let to = query.date_to.unwrap_or(month_end);

    let statuses = state.engine.budget_statuses(&user.username, from, to).await?;
    Ok(Json(
        statuses
            .into_iter()
            .map(|status| BudgetStatus {
                budget: to_api(status.budget),
                spent_cents: status.spent.cents(),
                remaining_cents: status.remaining.cents(),
                percentage: status.percentage,
                health: status.health.as_str().to_string(),
            })
            .collect(),
    ))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_budget(&user.username, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_month_spans_first_to_last_day() {
        let (from, to) = current_month("2024-02-10".parse().unwrap());
        assert_eq!(from.to_string(), "2024-02-01");
        assert_eq!(to.to_string(), "2024-02-29");

        let (from, to) = current_month("2023-12-31".parse().unwrap());
        assert_eq!(from.to_string(), "2023-12-01");
        assert_eq!(to.to_string(), "2023-12-31");
    }
}
