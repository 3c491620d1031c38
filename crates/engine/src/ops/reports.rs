use chrono::NaiveDate;
use sea_orm::{QueryFilter, QueryOrder, prelude::*};

use crate::{
    ResultEngine, categories, expenses,
    export::ExportRow,
    expenses::Expense,
    reports::{Report, ReportRow, build_report},
};

use super::Engine;

impl Engine {
    /// Builds the dashboard report over an optional date window.
    pub async fn report(
        &self,
        user_id: &str,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> ResultEngine<Report> {
        let rows = self.report_models(user_id, date_from, date_to).await?;
        let report_rows: Vec<ReportRow> = rows
            .into_iter()
            .map(|(expense, category)| ReportRow {
                id: expense.id,
                vendor: expense.vendor,
                amount: crate::MoneyCents::new(expense.amount_cents),
                date: expense.date,
                category: category.map(|c| (c.name, c.color)),
            })
            .collect();
        Ok(build_report(&report_rows))
    }

    /// Fetches the rows for a CSV export, same window and ordering as
    /// the report.
    pub async fn export_rows(
        &self,
        user_id: &str,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> ResultEngine<Vec<ExportRow>> {
        let rows = self.report_models(user_id, date_from, date_to).await?;
        Ok(rows
            .into_iter()
            .map(|(expense, category)| ExportRow {
                expense: Expense::from(expense),
                category_name: category.map(|c| c.name),
            })
            .collect())
    }

    /// Expenses with joined categories, date descending (newest
    /// first), creation time as tie-break.
    async fn report_models(
        &self,
        user_id: &str,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> ResultEngine<Vec<(expenses::Model, Option<categories::Model>)>> {
        let mut query = expenses::Entity::find().filter(expenses::Column::UserId.eq(user_id));
        if let Some(from) = date_from {
            query = query.filter(expenses::Column::Date.gte(from));
        }
        if let Some(to) = date_to {
            query = query.filter(expenses::Column::Date.lte(to));
        }

        let rows = query
            .order_by_desc(expenses::Column::Date)
            .order_by_desc(expenses::Column::CreatedAt)
            .find_also_related(categories::Entity)
            .all(&self.database)
            .await?;
        Ok(rows)
    }
}
