//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for Scontrino:
//!
//! - `users`: authentication
//! - `categories`: system defaults plus user-defined categories
//! - `tags`: free-form labels attached to expenses
//! - `expenses`: the ledger itself
//! - `expense_items`: receipt line items owned by an expense
//! - `expense_tags`: expense/tag join table
//! - `budgets`: monthly spending limits per scope
//! - `receipts`: uploaded receipt images and their extraction state
//!
//! It also seeds the ten default categories every user sees.

use sea_orm::{ConnectionTrait, DbBackend, Statement, Value};
use sea_orm_migration::{SchemaManagerConnection, prelude::*};
use uuid::Uuid;

#[derive(DeriveMigrationName)]
pub struct Migration;

const DEFAULT_CATEGORIES: [(&str, &str, &str); 10] = [
    ("Groceries", "shopping-cart", "#22c55e"),
    ("Dining", "utensils", "#f97316"),
    ("Transportation", "car", "#3b82f6"),
    ("Shopping", "shopping-bag", "#a855f7"),
    ("Utilities", "zap", "#eab308"),
    ("Healthcare", "heart-pulse", "#ef4444"),
    ("Entertainment", "tv", "#ec4899"),
    ("Travel", "plane", "#06b6d4"),
    ("Education", "graduation-cap", "#8b5cf6"),
    ("Other", "circle-dot", "#6b7280"),
];

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    UserId,
    Name,
    Icon,
    Color,
    SortOrder,
    IsDefault,
    CreatedAt,
}

#[derive(Iden)]
enum Tags {
    Table,
    Id,
    UserId,
    Name,
    Color,
    CreatedAt,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    UserId,
    CategoryId,
    ReceiptId,
    Vendor,
    Description,
    AmountCents,
    SubtotalCents,
    TaxCents,
    TipCents,
    Date,
    IsVerified,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ExpenseItems {
    Table,
    Id,
    ExpenseId,
    Name,
    Quantity,
    UnitPriceCents,
    TotalPriceCents,
}

#[derive(Iden)]
enum ExpenseTags {
    Table,
    ExpenseId,
    TagId,
}

#[derive(Iden)]
enum Budgets {
    Table,
    Id,
    UserId,
    CategoryId,
    AmountCents,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Receipts {
    Table,
    Id,
    UserId,
    ImagePath,
    Status,
    RawOcrText,
    Confidence,
    ErrorMessage,
    CreatedAt,
    UpdatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    // NULL user_id marks a system default visible to everyone.
                    .col(ColumnDef::new(Categories::UserId).string())
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::Icon).string().not_null())
                    .col(ColumnDef::new(Categories::Color).string().not_null())
                    .col(
                        ColumnDef::new(Categories::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Categories::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Categories::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-categories-user_id")
                            .from(Categories::Table, Categories::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-user_id")
                    .table(Categories::Table)
                    .col(Categories::UserId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Tags
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Tags::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tags::Id).blob().not_null().primary_key())
                    .col(ColumnDef::new(Tags::UserId).string().not_null())
                    .col(ColumnDef::new(Tags::Name).string().not_null())
                    .col(ColumnDef::new(Tags::Color).string().not_null())
                    .col(ColumnDef::new(Tags::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-tags-user_id")
                            .from(Tags::Table, Tags::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-tags-user_id-name-unique")
                    .table(Tags::Table)
                    .col(Tags::UserId)
                    .col(Tags::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Receipts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Receipts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Receipts::Id).blob().not_null().primary_key())
                    .col(ColumnDef::new(Receipts::UserId).string().not_null())
                    .col(ColumnDef::new(Receipts::ImagePath).string().not_null())
                    .col(
                        ColumnDef::new(Receipts::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Receipts::RawOcrText).text())
                    .col(ColumnDef::new(Receipts::Confidence).double())
                    .col(ColumnDef::new(Receipts::ErrorMessage).string())
                    .col(ColumnDef::new(Receipts::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Receipts::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-receipts-user_id")
                            .from(Receipts::Table, Receipts::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-receipts-user_id-created_at")
                    .table(Receipts::Table)
                    .col(Receipts::UserId)
                    .col(Receipts::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Expenses::Id).blob().not_null().primary_key())
                    .col(ColumnDef::new(Expenses::UserId).string().not_null())
                    .col(ColumnDef::new(Expenses::CategoryId).blob())
                    .col(ColumnDef::new(Expenses::ReceiptId).blob())
                    .col(ColumnDef::new(Expenses::Vendor).string().not_null())
                    .col(ColumnDef::new(Expenses::Description).string())
                    .col(
                        ColumnDef::new(Expenses::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::SubtotalCents).big_integer())
                    .col(ColumnDef::new(Expenses::TaxCents).big_integer())
                    .col(ColumnDef::new(Expenses::TipCents).big_integer())
                    .col(ColumnDef::new(Expenses::Date).date().not_null())
                    .col(
                        ColumnDef::new(Expenses::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Expenses::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Expenses::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-user_id")
                            .from(Expenses::Table, Expenses::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-category_id")
                            .from(Expenses::Table, Expenses::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-receipt_id")
                            .from(Expenses::Table, Expenses::ReceiptId)
                            .to(Receipts::Table, Receipts::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-user_id-date")
                    .table(Expenses::Table)
                    .col(Expenses::UserId)
                    .col(Expenses::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-category_id")
                    .table(Expenses::Table)
                    .col(Expenses::CategoryId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Expense items
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ExpenseItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseItems::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExpenseItems::ExpenseId).blob().not_null())
                    .col(ColumnDef::new(ExpenseItems::Name).string().not_null())
                    .col(
                        ColumnDef::new(ExpenseItems::Quantity)
                            .double()
                            .not_null()
                            .default(1.0),
                    )
                    .col(
                        ColumnDef::new(ExpenseItems::UnitPriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseItems::TotalPriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_items-expense_id")
                            .from(ExpenseItems::Table, ExpenseItems::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_items-expense_id")
                    .table(ExpenseItems::Table)
                    .col(ExpenseItems::ExpenseId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Expense tags
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ExpenseTags::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ExpenseTags::ExpenseId).blob().not_null())
                    .col(ColumnDef::new(ExpenseTags::TagId).blob().not_null())
                    .primary_key(
                        Index::create()
                            .col(ExpenseTags::ExpenseId)
                            .col(ExpenseTags::TagId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_tags-expense_id")
                            .from(ExpenseTags::Table, ExpenseTags::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_tags-tag_id")
                            .from(ExpenseTags::Table, ExpenseTags::TagId)
                            .to(Tags::Table, Tags::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_tags-tag_id")
                    .table(ExpenseTags::Table)
                    .col(ExpenseTags::TagId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Budgets
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Budgets::Id).blob().not_null().primary_key())
                    .col(ColumnDef::new(Budgets::UserId).string().not_null())
                    // NULL category_id means the overall budget.
                    .col(ColumnDef::new(Budgets::CategoryId).blob())
                    .col(ColumnDef::new(Budgets::AmountCents).big_integer().not_null())
                    .col(ColumnDef::new(Budgets::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Budgets::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budgets-user_id")
                            .from(Budgets::Table, Budgets::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budgets-category_id")
                            .from(Budgets::Table, Budgets::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budgets-user_id")
                    .table(Budgets::Table)
                    .col(Budgets::UserId)
                    .to_owned(),
            )
            .await?;

        seed_default_categories(manager).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpenseTags::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpenseItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Receipts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tags::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

async fn seed_default_categories(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    let db = manager.get_connection();
    let backend = db.get_database_backend();

    for (position, (name, icon, color)) in DEFAULT_CATEGORIES.iter().enumerate() {
        insert_default_category(db, backend, Uuid::new_v4(), name, icon, color, position as i32)
            .await?;
    }
    Ok(())
}

async fn insert_default_category(
    db: &SchemaManagerConnection<'_>,
    backend: DbBackend,
    id: Uuid,
    name: &str,
    icon: &str,
    color: &str,
    sort_order: i32,
) -> Result<(), DbErr> {
    let values = vec![
        id.as_bytes().to_vec().into(),
        name.to_string().into(),
        icon.to_string().into(),
        color.to_string().into(),
        sort_order.into(),
        Value::Bool(Some(true)),
    ];
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO categories (id, user_id, name, icon, color, sort_order, is_default, created_at) \
         VALUES (?, NULL, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP);",
        values,
    ))
    .await?;
    Ok(())
}
