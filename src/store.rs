//! Implements the SQLite backed store that owns both pipeline tables.

use std::path::Path;

use rusqlite::Connection;

use crate::{
    Error, clock, db,
    report::{CategoryTotal, map_category_total_row},
    transaction::{NewTransaction, Transaction, TransactionType, map_transaction_row},
};

/// The column to sort a transaction listing by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    /// Sort by when the transaction happened.
    TransactionDate,
    /// Sort by merchant name.
    Merchant,
    /// Sort by category name.
    Category,
    /// Sort by amount.
    Amount,
    /// Sort by transaction type.
    TransactionType,
}

impl SortColumn {
    /// The column name to splice into the ORDER BY clause. Sort columns are
    /// restricted to this fixed set so caller input never reaches the SQL
    /// text.
    fn as_sql(&self) -> &'static str {
        match self {
            SortColumn::TransactionDate => "transaction_date",
            SortColumn::Merchant => "merchant",
            SortColumn::Category => "category",
            SortColumn::Amount => "amount",
            SortColumn::TransactionType => "transaction_type",
        }
    }
}

/// The order to sort transactions in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Sort in order of increasing value.
    Ascending,
    /// Sort in order of decreasing value.
    #[default]
    Descending,
}

impl SortOrder {
    fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

impl From<&str> for SortOrder {
    /// Parse an order string from the read-side viewer. Anything other than
    /// `ASC` (in any casing) silently falls back to descending.
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case("ASC") {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        }
    }
}

/// Query parameters for the read-side viewer's transaction listing.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionQuery {
    /// The maximum number of rows to return.
    pub limit: u32,
    /// The number of rows to skip before the first returned row.
    pub offset: u32,
    /// The column to sort by.
    pub sort_column: SortColumn,
    /// The sort direction.
    pub order: SortOrder,
}

impl Default for TransactionQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            sort_column: SortColumn::TransactionDate,
            order: SortOrder::Descending,
        }
    }
}

/// Owns the SQLite connection that both pipeline tables live behind.
///
/// The store is the only component that writes persisted state. It assumes a
/// single writer per run; pointing two processes at the same database file
/// at once is unsupported.
#[derive(Debug)]
pub struct Store {
    connection: Connection,
}

impl Store {
    /// Open the database at `path`, creating the file and the schema as
    /// needed.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if the file cannot be opened or the schema
    /// cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let connection = Connection::open(path)?;
        db::initialize(&connection)?;

        Ok(Self { connection })
    }

    /// Open an isolated in-memory store.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, Error> {
        let connection = Connection::open_in_memory()?;
        db::initialize(&connection)?;

        Ok(Self { connection })
    }

    /// Persist a parsed transaction and maintain the category totals.
    ///
    /// The transaction row is inserted and, for Debit transactions only, the
    /// matching `expense_reports` row is created or added to. Both writes
    /// happen inside one SQL transaction, so the running totals cannot drift
    /// from the transaction log: either both land or neither does. Credit
    /// and Unknown transactions never touch the totals.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if either write fails. Nothing is committed
    /// in that case.
    pub fn save(&mut self, candidate: NewTransaction) -> Result<Transaction, Error> {
        let tx = self.connection.transaction()?;

        let transaction = tx
            .prepare(
                "INSERT INTO transactions
                    (amount, merchant, category, transaction_date, transaction_type, source)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 RETURNING id, amount, merchant, category, transaction_date, transaction_type, source",
            )?
            .query_row(
                (
                    candidate.amount,
                    &candidate.merchant,
                    candidate.category.as_str(),
                    candidate.transaction_date,
                    candidate.transaction_type.as_str(),
                    candidate.source.as_str(),
                ),
                map_transaction_row,
            )?;

        if transaction.transaction_type == TransactionType::Debit {
            tx.execute(
                "INSERT INTO expense_reports (category, total_amount, last_updated)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(category) DO UPDATE SET
                 total_amount = total_amount + excluded.total_amount,
                 last_updated = excluded.last_updated",
                (
                    transaction.category.as_str(),
                    transaction.amount,
                    clock::now(),
                ),
            )?;
        }

        tx.commit()?;

        Ok(transaction)
    }

    /// The running Debit total per category, largest first.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if the query fails.
    pub fn report(&self) -> Result<Vec<CategoryTotal>, Error> {
        self.connection
            .prepare(
                "SELECT category, ROUND(total_amount, 2), last_updated
                 FROM expense_reports
                 ORDER BY total_amount DESC",
            )?
            .query_map([], map_category_total_row)?
            .map(|maybe_row| maybe_row.map_err(|error| error.into()))
            .collect()
    }

    /// List stored transactions for the read-side viewer.
    ///
    /// Sorting is restricted to the fixed [SortColumn] set. A secondary sort
    /// on id keeps the listing stable across pages when the sort column has
    /// ties.
    ///
    /// # Errors
    /// Returns [Error::SqlError] if the query fails.
    pub fn list_transactions(&self, query: &TransactionQuery) -> Result<Vec<Transaction>, Error> {
        let statement = format!(
            "SELECT id, amount, merchant, category, transaction_date, transaction_type, source
             FROM transactions
             ORDER BY {} {}, id ASC
             LIMIT ?1 OFFSET ?2",
            query.sort_column.as_sql(),
            query.order.as_sql(),
        );

        self.connection
            .prepare(&statement)?
            .query_map((query.limit, query.offset), map_transaction_row)?
            .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
            .collect()
    }
}


#[cfg(test)]
mod report_tests {
    use time::macros::datetime;

    use crate::{
        category::Category,
        transaction::{NewTransaction, Source, TransactionType},
    };

    use super::Store;

    #[test]
    fn report_is_sorted_by_total_descending() {
        let mut store = Store::open_in_memory().unwrap();

        let saves = [
            (250.0, Category::Entertainment),
            (1400.0, Category::Other),
            (600.0, Category::Food),
        ];
        for (amount, category) in saves {
            store
                .save(NewTransaction {
                    amount,
                    merchant: "Merchant".to_owned(),
                    category,
                    transaction_date: datetime!(2025-02-08 21:43:50),
                    transaction_type: TransactionType::Debit,
                    source: Source::Sms,
                })
                .expect("Could not save transaction");
        }

        let report = store.report().expect("Could not query report");

        let totals: Vec<f64> = report.iter().map(|row| row.total_amount).collect();
        assert_eq!(totals, vec![1400.0, 600.0, 250.0]);
    }

    #[test]
    fn report_rounds_to_two_decimals() {
        let mut store = Store::open_in_memory().unwrap();

        for amount in [10.111, 20.222] {
            store
                .save(NewTransaction {
                    amount,
                    merchant: "Merchant".to_owned(),
                    category: Category::Bills,
                    transaction_date: datetime!(2025-02-08 21:43:50),
                    transaction_type: TransactionType::Debit,
                    source: Source::Email,
                })
                .expect("Could not save transaction");
        }

        let report = store.report().expect("Could not query report");
        assert_eq!(report[0].total_amount, 30.33);
    }
}
