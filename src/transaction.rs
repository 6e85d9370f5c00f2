//! Defines the core data model for persisted transaction records.

use rusqlite::{Connection, Row, types::Type};
use serde::Serialize;
use time::PrimitiveDateTime;

use crate::category::Category;

/// The ID of a transaction row, assigned by the store on insert.
pub type TransactionId = i64;

/// Whether money left or entered the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransactionType {
    /// Money left the account. Only debits contribute to category totals.
    Debit,
    /// Money entered the account.
    Credit,
    /// The message did not say which way the money moved.
    Unknown,
}

impl TransactionType {
    /// The transaction type as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Debit => "Debit",
            TransactionType::Credit => "Credit",
            TransactionType::Unknown => "Unknown",
        }
    }

    /// Parse a transaction type from its stored name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Debit" => Some(TransactionType::Debit),
            "Credit" => Some(TransactionType::Credit),
            "Unknown" => Some(TransactionType::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Which kind of message source a transaction was ingested from.
///
/// This is a provenance tag on the record, distinct from the
/// [MessageSource](crate::MessageSource) component that produced the raw
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Source {
    /// The message came from the SMS batch.
    #[serde(rename = "SMS")]
    Sms,
    /// The message came from the mailbox.
    Email,
}

impl Source {
    /// The source tag as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Sms => "SMS",
            Source::Email => "Email",
        }
    }

    /// Parse a source tag from its stored name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SMS" => Some(Source::Sms),
            "Email" => Some(Source::Email),
            _ => None,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One parsed, classified and persisted movement of money.
///
/// Created exactly once by [Store::save](crate::Store::save) and immutable
/// thereafter; the pipeline never updates or deletes transaction rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The amount of money that moved, always positive.
    pub amount: f64,
    /// The merchant the money moved to or from, or `"Unknown"` when the
    /// message did not name one.
    pub merchant: String,
    /// The spending category the merchant was classified into.
    pub category: Category,
    /// When the transaction happened, per the message, or the processing
    /// time when the message carried no usable timestamp.
    pub transaction_date: PrimitiveDateTime,
    /// Whether the amount was debited or credited.
    pub transaction_type: TransactionType,
    /// Which kind of message source the record was ingested from.
    pub source: Source,
}

/// A parsed and classified transaction that has not been persisted yet.
///
/// Produced by the pipeline from a [ParsedMessage](crate::ParsedMessage)
/// plus its classification, and consumed by
/// [Store::save](crate::Store::save), which assigns the ID.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// The amount of money that moved.
    pub amount: f64,
    /// The merchant name, or `"Unknown"`.
    pub merchant: String,
    /// The spending category.
    pub category: Category,
    /// When the transaction happened.
    pub transaction_date: PrimitiveDateTime,
    /// Whether the amount was debited or credited.
    pub transaction_type: TransactionType,
    /// Which kind of message source the message came from.
    pub source: Source,
}

pub(crate) fn create_transactions_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            amount REAL NOT NULL,
            merchant TEXT,
            category TEXT,
            transaction_date DATETIME,
            transaction_type TEXT,
            source TEXT
        );",
    )?;

    Ok(())
}

pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let raw_category: String = row.get(3)?;
    let category = Category::from_name(&raw_category).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown category {raw_category:?}").into(),
        )
    })?;

    let raw_type: String = row.get(5)?;
    let transaction_type = TransactionType::from_name(&raw_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            Type::Text,
            format!("unknown transaction type {raw_type:?}").into(),
        )
    })?;

    let raw_source: String = row.get(6)?;
    let source = Source::from_name(&raw_source).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            Type::Text,
            format!("unknown source {raw_source:?}").into(),
        )
    })?;

    Ok(Transaction {
        id: row.get(0)?,
        amount: row.get(1)?,
        merchant: row.get(2)?,
        category,
        transaction_date: row.get(4)?,
        transaction_type,
        source,
    })
}
