//! Turns unstructured bank transaction alerts into a queryable expense ledger.
//!
//! Raw notification text arrives from two kinds of message source: an
//! in-memory batch of SMS strings and unread "Transaction Alert" emails
//! fetched from an IMAP mailbox. Each message is run through pattern
//! extraction ([parse_message]), the merchant is mapped to a spending
//! category ([classify]), and the result is persisted by the [Store], which
//! keeps a running Debit total per category alongside the individual
//! transaction rows. A fixed-width expense report can be rendered from the
//! stored totals at any time ([render_report]).
//!
//! Fault isolation is the guiding policy: an unreachable mailbox, an
//! unparsable message or a failed write is logged and skipped, and the run
//! carries on with whatever work remains.
//!
//! The store assumes a single writer per run. Pointing two concurrent
//! processes at the same database file is unsupported; no locking is done
//! beyond what SQLite itself provides.

#![warn(missing_docs)]

mod category;
mod clock;
mod db;
mod error;
mod parse;
mod pipeline;
mod report;
mod source;
mod store;
mod transaction;

pub use category::{Category, classify};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use parse::{ParsedMessage, parse_message};
pub use pipeline::{RunStats, run as run_pipeline};
pub use report::{CategoryTotal, render_report};
pub use source::{BatchSource, MailboxConfig, MailboxSource, MessageSource, RawMessage};
pub use store::{SortColumn, SortOrder, Store, TransactionQuery};
pub use transaction::{NewTransaction, Source, Transaction, TransactionId, TransactionType};
