//! Core engine for the expense tracker: persistence, aggregation,
//! budget evaluation, CSV export and the receipt ingestion pipeline.
//!
//! The HTTP layer stays thin; everything with semantics lives here so
//! it can be tested against an in-memory database.

pub use blob::{BlobStore, FsBlobStore};
pub use budgets::{Budget, BudgetHealth, BudgetStatus};
pub use categories::Category;
pub use error::EngineError;
pub use expense_items::ExpenseItem;
pub use expenses::Expense;
pub use ingest::{ReceiptPipeline, RegisteredReceipt};
pub use money::MoneyCents;
pub use ocr::{OcrExtraction, OcrItem};
pub use ops::{
    Engine, EngineBuilder, ExpenseDetail, ExpenseDraft, ExpenseListFilter, ExpenseListRow,
    ExpensePage, ExpenseSort, ItemDraft, SortOrder,
};
pub use receipts::{Receipt, ReceiptStatus};
pub use reports::{
    CategoryBreakdown, MonthBreakdown, Report, ReportRow, ReportStats, VendorBreakdown,
};
pub use tags::Tag;
pub use vision::{HttpVisionClient, VisionClient};

mod blob;
pub mod budgets;
pub mod categories;
mod error;
pub mod expense_items;
pub mod expense_tags;
pub mod expenses;
pub mod export;
pub mod imaging;
mod ingest;
mod money;
pub mod ocr;
mod ops;
pub mod receipts;
pub mod reports;
pub mod tags;
mod vision;

type ResultEngine<T> = Result<T, EngineError>;
