//! The expense report read model and its text rendering.

use rusqlite::{Connection, Row, types::Type};
use time::{PrimitiveDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::category::Category;

/// One row of the expense report: the running Debit total for a category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    /// The spending category.
    pub category: Category,
    /// The sum of every Debit amount saved against the category, rounded to
    /// two decimal places by the report query.
    pub total_amount: f64,
    /// The processing time of the most recent contributing transaction.
    pub last_updated: PrimitiveDateTime,
}

const TIMESTAMP_FORMAT: &[BorrowedFormatItem] =
    format_description!("[day]-[month]-[year] [hour]:[minute]:[second]");

pub(crate) fn create_expense_reports_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS expense_reports (
            category TEXT PRIMARY KEY,
            total_amount REAL NOT NULL,
            last_updated DATETIME
        );",
    )?;

    Ok(())
}

pub(crate) fn map_category_total_row(row: &Row) -> Result<CategoryTotal, rusqlite::Error> {
    let raw_category: String = row.get(0)?;
    let category = Category::from_name(&raw_category).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            Type::Text,
            format!("unknown category {raw_category:?}").into(),
        )
    })?;

    Ok(CategoryTotal {
        category,
        total_amount: row.get(1)?,
        last_updated: row.get(2)?,
    })
}

/// Render report rows as a fixed-width text table.
///
/// Expects rows already sorted by total descending, as returned by
/// [Store::report](crate::Store::report).
pub fn render_report(rows: &[CategoryTotal]) -> String {
    let mut output = String::from("=== Expense Report ===\n");
    output.push_str(&format!(
        "{:<15} {:<12} {}\n",
        "Category", "Amount", "Last Updated"
    ));

    for row in rows {
        let last_updated = row
            .last_updated
            .format(TIMESTAMP_FORMAT)
            .unwrap_or_else(|_| row.last_updated.to_string());

        output.push_str(&format!(
            "{:<15} ₹{:<11.2} {}\n",
            row.category.as_str(),
            row.total_amount,
            last_updated
        ));
    }

    output
}
