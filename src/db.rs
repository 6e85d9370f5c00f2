//! Schema initialisation for the pipeline's SQLite database.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{Error, report::create_expense_reports_table, transaction::create_transactions_table};

/// Idempotently create the tables used by the pipeline.
///
/// Safe to call on every startup: tables that already exist are left
/// untouched. Both tables are created within a single SQL transaction.
///
/// # Errors
/// Returns [Error::SqlError] if table creation fails.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_transactions_table(&transaction)?;
    create_expense_reports_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
