//! Report and CSV export endpoints.

use api_types::report::{
    CategoryBreakdown, MonthBreakdown, RecentExpense, Report, ReportQuery, ReportStats,
    VendorBreakdown,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use engine::export;

use crate::{ServerError, server::ServerState, user};

fn to_api(report: engine::Report) -> Report {
    Report {
        stats: ReportStats {
            total_spent_cents: report.stats.total_spent.cents(),
            total_expenses: report.stats.total_expenses,
            avg_expense_cents: report.stats.avg_expense.cents(),
            top_category: report.stats.top_category,
        },
        by_category: report
            .by_category
            .into_iter()
            .map(|group| CategoryBreakdown {
                name: group.name,
                color: group.color,
                total_cents: group.total.cents(),
                count: group.count,
                percentage: group.percentage,
            })
            .collect(),
        by_month: report
            .by_month
            .into_iter()
            .map(|group| MonthBreakdown {
                month: group.month,
                total_cents: group.total.cents(),
                count: group.count,
            })
            .collect(),
        top_vendors: report
            .top_vendors
            .into_iter()
            .map(|group| VendorBreakdown {
                vendor: group.vendor,
                total_cents: group.total.cents(),
                count: group.count,
            })
            .collect(),
        recent: report
            .recent
            .into_iter()
            .map(|row| RecentExpense {
                id: row.id,
                vendor: row.vendor,
                amount_cents: row.amount.cents(),
                date: row.date,
                category: row.category.map(|(name, _)| name),
            })
            .collect(),
    }
}

pub async fn get_report(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Report>, ServerError> {
    let report = state
        .engine
        .report(&user.username, query.date_from, query.date_to)
        .await?;
    Ok(Json(to_api(report)))
}

/// Streams the filtered expenses as a CSV attachment.
pub async fn export_csv(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ServerError> {
    let rows = state
        .engine
        .export_rows(&user.username, query.date_from, query.date_to)
        .await?;
    let document = export::expenses_csv(&rows)?;

    let filename = format!("expenses-{}.csv", Utc::now().date_naive());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        document,
    )
        .into_response())
}
