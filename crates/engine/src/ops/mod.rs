use sea_orm::DatabaseConnection;

use crate::{EngineError, ResultEngine};

mod budgets;
mod categories;
mod expenses;
mod receipts;
mod reports;
mod tags;

pub use expenses::{
    ExpenseDetail, ExpenseDraft, ExpenseListFilter, ExpenseListRow, ExpensePage, ExpenseSort,
    ItemDraft, SortOrder,
};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

fn normalize_required_text(value: &str, label: &str, max_len: usize) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} must not be empty"
        )));
    }
    if trimmed.chars().count() > max_len {
        return Err(EngineError::Validation(format!(
            "{label} must be at most {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Accepts `#RRGGBB` only.
fn validate_hex_color(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    let valid = trimmed.len() == 7
        && trimmed.starts_with('#')
        && trimmed[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(EngineError::Validation(format!(
            "color must be #RRGGBB, got \"{trimmed}\""
        )));
    }
    Ok(trimmed.to_string())
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_color_validation() {
        assert_eq!(validate_hex_color("#1a2B3c").unwrap(), "#1a2B3c");
        assert!(validate_hex_color("1a2B3c").is_err());
        assert!(validate_hex_color("#1a2B3").is_err());
        assert!(validate_hex_color("#1a2B3g").is_err());
        assert!(validate_hex_color("#1a2B3c4d").is_err());
    }

    #[test]
    fn required_text_is_trimmed_and_bounded() {
        assert_eq!(
            normalize_required_text("  Coffee ", "name", 50).unwrap(),
            "Coffee"
        );
        assert!(normalize_required_text("   ", "name", 50).is_err());
        assert!(normalize_required_text(&"x".repeat(51), "name", 50).is_err());
    }
}
