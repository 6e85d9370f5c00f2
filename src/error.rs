//! Defines the crate level error type shared by the parser, the store and
//! the message sources.

/// The errors that may occur while ingesting and persisting transactions.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The message did not contain an extractable amount.
    ///
    /// The amount is the one mandatory field, so a message without one can
    /// never become a transaction. Callers should skip the message and move
    /// on to the next.
    #[error("no amount could be extracted from the message")]
    NoAmount,

    /// Extraction failed part way through an otherwise matching message.
    ///
    /// Carries the underlying error text for logging. Callers should skip
    /// the message and move on to the next.
    #[error("could not parse message: {0}")]
    ParseFailure(String),

    /// A message source could not be reached, authenticated with or read
    /// from. The pipeline treats the source as having no messages for this
    /// run.
    #[error("message source unavailable: {0}")]
    SourceUnavailable(String),

    /// A query returned no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
