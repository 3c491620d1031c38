//! Wire types shared between the HTTP server and its clients.
//!
//! Everything here is plain serde data: money travels as integer
//! cents, dates as `YYYY-MM-DD` strings and ids as UUIDs. Conversions
//! from the engine's domain types live on the server side.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod category {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        pub icon: String,
        pub color: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct Category {
        pub id: Uuid,
        pub name: String,
        pub icon: String,
        pub color: String,
        pub sort_order: i32,
        pub is_default: bool,
    }
}

pub mod tag {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TagNew {
        pub name: String,
        pub color: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct Tag {
        pub id: Uuid,
        pub name: String,
        pub color: String,
    }
}

pub mod expense {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseItemNew {
        pub name: String,
        pub quantity: f64,
        pub unit_price_cents: i64,
        pub total_price_cents: i64,
    }

    /// Create/update payload. Updates replace items and tag links
    /// wholesale with what is sent here.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub vendor: String,
        #[serde(default)]
        pub description: Option<String>,
        pub amount_cents: i64,
        #[serde(default)]
        pub subtotal_cents: Option<i64>,
        #[serde(default)]
        pub tax_cents: Option<i64>,
        #[serde(default)]
        pub tip_cents: Option<i64>,
        #[serde(default)]
        pub date: Option<NaiveDate>,
        #[serde(default)]
        pub category_id: Option<Uuid>,
        #[serde(default)]
        pub is_verified: bool,
        #[serde(default)]
        pub items: Vec<ExpenseItemNew>,
        #[serde(default)]
        pub tag_ids: Vec<Uuid>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct Expense {
        pub id: Uuid,
        pub vendor: String,
        pub description: Option<String>,
        pub amount_cents: i64,
        pub subtotal_cents: Option<i64>,
        pub tax_cents: Option<i64>,
        pub tip_cents: Option<i64>,
        pub date: NaiveDate,
        pub category_id: Option<Uuid>,
        pub receipt_id: Option<Uuid>,
        pub is_verified: bool,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ExpenseItem {
        pub id: Uuid,
        pub name: String,
        pub quantity: f64,
        pub unit_price_cents: i64,
        pub total_price_cents: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseDetail {
        #[serde(flatten)]
        pub expense: Expense,
        pub category: Option<category::Category>,
        pub items: Vec<ExpenseItem>,
        pub tags: Vec<tag::Tag>,
    }

    /// One list row: the expense plus its joined category and tags.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseListEntry {
        #[serde(flatten)]
        pub expense: Expense,
        pub category: Option<category::Category>,
        pub tags: Vec<tag::Tag>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseListQuery {
        #[serde(default)]
        pub page: Option<u64>,
        #[serde(default)]
        pub per_page: Option<u64>,
        #[serde(default)]
        pub category_id: Option<Uuid>,
        #[serde(default)]
        pub search: Option<String>,
        #[serde(default)]
        pub date_from: Option<NaiveDate>,
        #[serde(default)]
        pub date_to: Option<NaiveDate>,
        #[serde(default)]
        pub sort_by: Option<String>,
        #[serde(default)]
        pub sort_order: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpensePage {
        pub expenses: Vec<ExpenseListEntry>,
        pub total: u64,
        pub page: u64,
        pub per_page: u64,
    }
}

pub mod budget {
    use super::*;

    /// Upsert payload: the (user, category scope) pair identifies the
    /// budget, so sending the same scope twice updates the amount.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetPut {
        #[serde(default)]
        pub category_id: Option<Uuid>,
        pub amount_cents: i64,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct Budget {
        pub id: Uuid,
        pub category_id: Option<Uuid>,
        pub amount_cents: i64,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetWindowQuery {
        #[serde(default)]
        pub date_from: Option<NaiveDate>,
        #[serde(default)]
        pub date_to: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetStatus {
        #[serde(flatten)]
        pub budget: Budget,
        pub spent_cents: i64,
        pub remaining_cents: i64,
        pub percentage: f64,
        /// `ok`, `warning` or `exceeded`.
        pub health: String,
    }
}

pub mod receipt {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReceiptRegister {
        pub content_type: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct Receipt {
        pub id: Uuid,
        /// `pending`, `processing`, `review`, `completed` or `failed`.
        pub status: String,
        pub image_path: String,
        pub raw_ocr_text: Option<String>,
        pub confidence: Option<f64>,
        pub error_message: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RegisteredReceipt {
        pub receipt: Receipt,
        /// Where the client must upload the image bytes.
        pub write_destination: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExtractedItem {
        pub name: String,
        pub quantity: f64,
        pub unit_price_cents: i64,
        pub total_price_cents: i64,
    }

    /// Parsed extraction result, returned for review before commit.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Extraction {
        pub vendor: String,
        pub date: NaiveDate,
        pub subtotal_cents: Option<i64>,
        pub tax_cents: Option<i64>,
        pub tip_cents: Option<i64>,
        pub total_cents: i64,
        pub items: Vec<ExtractedItem>,
        pub suggested_category: String,
        pub confidence: f64,
    }
}

pub mod report {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ReportQuery {
        #[serde(default)]
        pub date_from: Option<NaiveDate>,
        #[serde(default)]
        pub date_to: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReportStats {
        pub total_spent_cents: i64,
        pub total_expenses: usize,
        pub avg_expense_cents: i64,
        pub top_category: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryBreakdown {
        pub name: String,
        pub color: String,
        pub total_cents: i64,
        pub count: usize,
        pub percentage: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthBreakdown {
        pub month: String,
        pub total_cents: i64,
        pub count: usize,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VendorBreakdown {
        pub vendor: String,
        pub total_cents: i64,
        pub count: usize,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecentExpense {
        pub id: Uuid,
        pub vendor: String,
        pub amount_cents: i64,
        pub date: NaiveDate,
        pub category: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Report {
        pub stats: ReportStats,
        pub by_category: Vec<CategoryBreakdown>,
        pub by_month: Vec<MonthBreakdown>,
        pub top_vendors: Vec<VendorBreakdown>,
        pub recent: Vec<RecentExpense>,
    }
}
