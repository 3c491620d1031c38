//! CSV export of a filtered expense set.
//!
//! The whole document is produced in memory: either every row encodes
//! or the caller gets an error, never a truncated file.

use csv::WriterBuilder;
use serde::Serialize;

use crate::{EngineError, MoneyCents, categories::UNCATEGORIZED_NAME, expenses::Expense};

const HEADER: [&str; 9] = [
    "Date",
    "Vendor",
    "Description",
    "Category",
    "Amount",
    "Subtotal",
    "Tax",
    "Tip",
    "Verified",
];

/// One expense together with its resolved category name, ready for
/// encoding. Rows are expected in date-descending order.
#[derive(Clone, Debug, Serialize)]
pub struct ExportRow {
    pub expense: Expense,
    pub category_name: Option<String>,
}

fn optional_amount(value: Option<MoneyCents>) -> String {
    // Missing breakdown fields render as empty, not "0".
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Encodes the rows into a CSV document.
///
/// Fields containing the delimiter or a quote are quoted and internal
/// quotes doubled (the csv crate's default quoting rules).
pub fn expenses_csv(rows: &[ExportRow]) -> Result<Vec<u8>, EngineError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    let encode = |err: csv::Error| EngineError::Validation(format!("csv encoding failed: {err}"));

    writer.write_record(HEADER).map_err(encode)?;
    for row in rows {
        let expense = &row.expense;
        writer
            .write_record([
                expense.date.format("%Y-%m-%d").to_string(),
                expense.vendor.clone(),
                expense.description.clone().unwrap_or_default(),
                row.category_name
                    .clone()
                    .unwrap_or_else(|| UNCATEGORIZED_NAME.to_string()),
                expense.amount.to_string(),
                optional_amount(expense.subtotal),
                optional_amount(expense.tax),
                optional_amount(expense.tip),
                if expense.is_verified { "Yes" } else { "No" }.to_string(),
            ])
            .map_err(encode)?;
    }

    writer
        .into_inner()
        .map_err(|err| EngineError::Validation(format!("csv encoding failed: {err}")))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    use super::*;

    fn expense(vendor: &str, description: Option<&str>) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            category_id: None,
            receipt_id: None,
            vendor: vendor.to_string(),
            description: description.map(str::to_string),
            amount: MoneyCents::new(2000),
            subtotal: None,
            tax: None,
            tip: None,
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            is_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn header_row_is_fixed() {
        let bytes = expenses_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "Date,Vendor,Description,Category,Amount,Subtotal,Tax,Tip,Verified"
        );
    }

    #[test]
    fn quotes_and_commas_round_trip() {
        let rows = vec![ExportRow {
            expense: expense("Tom's, Diner \"Best\"", None),
            category_name: None,
        }];
        let bytes = expenses_csv(&rows).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[1], "Tom's, Diner \"Best\"");
        assert_eq!(&record[3], "Uncategorized");
    }

    #[test]
    fn missing_numerics_render_empty_not_zero() {
        let rows = vec![ExportRow {
            expense: expense("Acme", Some("supplies")),
            category_name: Some("Shopping".to_string()),
        }];
        let bytes = expenses_csv(&rows).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "2024-01-05");
        assert_eq!(&record[3], "Shopping");
        assert_eq!(&record[4], "20.00");
        assert_eq!(&record[5], "");
        assert_eq!(&record[6], "");
        assert_eq!(&record[7], "");
        assert_eq!(&record[8], "No");
    }

    #[test]
    fn breakdown_fields_render_when_present() {
        let mut row = expense("Acme", None);
        row.subtotal = Some(MoneyCents::new(1800));
        row.tax = Some(MoneyCents::new(150));
        row.tip = Some(MoneyCents::new(50));
        row.is_verified = true;

        let bytes = expenses_csv(&[ExportRow {
            expense: row,
            category_name: None,
        }])
        .unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[5], "18.00");
        assert_eq!(&record[6], "1.50");
        assert_eq!(&record[7], "0.50");
        assert_eq!(&record[8], "Yes");
    }
}
