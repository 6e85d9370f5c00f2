//! Extracts transaction candidates from raw alert message text.

use std::sync::LazyLock;

use regex::Regex;
use time::{PrimitiveDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::{Error, clock, transaction::TransactionType};

static AMOUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"INR\s?([\d,]+\.?\d{2})").expect("hardcoded regex should be valid")
});

static MERCHANT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"at PUR/([^/]+)/\d+").expect("hardcoded regex should be valid"));

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"on (\d{2}-\d{2}-\d{4} \d{2}:\d{2}:\d{2})").expect("hardcoded regex should be valid")
});

const DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[day]-[month]-[year] [hour]:[minute]:[second]");

/// A transaction candidate extracted from one raw message, before
/// classification and persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    /// The extracted amount, with thousands separators stripped.
    pub amount: f64,
    /// The merchant named in the purchase reference, or `"Unknown"`.
    pub merchant: String,
    /// The timestamp named in the message, or the processing time.
    pub transaction_date: PrimitiveDateTime,
    /// Debit, Credit, or Unknown when the message says neither.
    pub transaction_type: TransactionType,
}

/// Extract a transaction candidate from a raw alert message.
///
/// The fields are extracted independently:
/// - The amount is the first `INR` currency amount in the message. It is the
///   one mandatory field; a message without one is rejected with
///   [Error::NoAmount].
/// - The merchant is the text between the `PUR/` purchase-reference marker
///   and the following slash, trimmed. Defaults to `"Unknown"`.
/// - The date is the `on DD-MM-YYYY HH:MM:SS` timestamp. Defaults to the
///   current processing time when absent or unparsable.
/// - The direction is a case-insensitive search for "debited" or "credited".
///
/// # Errors
/// Returns [Error::NoAmount] when no amount can be extracted, or
/// [Error::ParseFailure] when the matched amount text cannot be read as a
/// number. Callers should log, skip the message and continue.
pub fn parse_message(message: &str) -> Result<ParsedMessage, Error> {
    let amount_text = AMOUNT_PATTERN
        .captures(message)
        .and_then(|captures| captures.get(1))
        .ok_or(Error::NoAmount)?
        .as_str();

    let amount: f64 = amount_text.replace(',', "").parse().map_err(|error| {
        Error::ParseFailure(format!("invalid amount {amount_text:?}: {error}"))
    })?;

    let merchant = MERCHANT_PATTERN
        .captures(message)
        .and_then(|captures| captures.get(1))
        .map(|merchant| merchant.as_str().trim().to_owned())
        .unwrap_or_else(|| "Unknown".to_owned());

    let transaction_date = DATE_PATTERN
        .captures(message)
        .and_then(|captures| captures.get(1))
        .and_then(|date_text| {
            PrimitiveDateTime::parse(date_text.as_str(), DATE_FORMAT)
                .map_err(|error| {
                    tracing::debug!(
                        "could not parse date {:?}, using processing time: {error}",
                        date_text.as_str()
                    );
                })
                .ok()
        })
        .unwrap_or_else(clock::now);

    let lowercase = message.to_lowercase();
    let transaction_type = if lowercase.contains("debited") {
        TransactionType::Debit
    } else if lowercase.contains("credited") {
        TransactionType::Credit
    } else {
        TransactionType::Unknown
    };

    Ok(ParsedMessage {
        amount,
        merchant,
        transaction_date,
        transaction_type,
    })
}

#[cfg(test)]
mod parse_message_tests {
    use time::macros::datetime;

    use crate::{Error, transaction::TransactionType};

    use super::parse_message;

    const DEBIT_MESSAGE: &str = "INR 1400.00 has been debited from your A/c no. XX172263 \
        on 08-02-2025 21:43:50 at PUR/M S GLOBAL MART/100000000089018/503921456192.";

    #[test]
    fn extracts_all_fields_from_debit_message() {
        let parsed = parse_message(DEBIT_MESSAGE).expect("Could not parse message");

        assert_eq!(parsed.amount, 1400.00);
        assert_eq!(parsed.merchant, "M S GLOBAL MART");
        assert_eq!(parsed.transaction_date, datetime!(2025-02-08 21:43:50));
        assert_eq!(parsed.transaction_type, TransactionType::Debit);
    }

    #[test]
    fn extracts_credit_direction() {
        let message = "INR 5000.00 has been credited to your A/c no. XX172263 \
            on 09-02-2025 10:15:30 from Amazon Seller Payments.";

        let parsed = parse_message(message).expect("Could not parse message");

        assert_eq!(parsed.amount, 5000.00);
        assert_eq!(parsed.transaction_type, TransactionType::Credit);
    }

    #[test]
    fn strips_thousands_separators_from_amount() {
        let message = "INR 1,40,000.00 has been debited from your A/c no. XX172263.";

        let parsed = parse_message(message).expect("Could not parse message");

        assert_eq!(parsed.amount, 140_000.00);
    }

    #[test]
    fn message_without_amount_is_rejected() {
        let message = "Your OTP for netbanking login is 482910. Do not share it.";

        let got = parse_message(message);

        assert_eq!(got, Err(Error::NoAmount));
    }

    #[test]
    fn missing_merchant_defaults_to_unknown() {
        let message = "INR 250.00 has been debited from your A/c no. XX172263 \
            on 07-02-2025 19:30:20.";

        let parsed = parse_message(message).expect("Could not parse message");

        assert_eq!(parsed.merchant, "Unknown");
    }

    #[test]
    fn merchant_is_trimmed() {
        let message =
            "INR 250.00 has been debited at PUR/ Netflix Subscription /1029384756.";

        let parsed = parse_message(message).expect("Could not parse message");

        assert_eq!(parsed.merchant, "Netflix Subscription");
    }

    #[test]
    fn missing_date_defaults_to_processing_time() {
        let before = crate::clock::now();
        let message = "INR 99.00 has been debited at PUR/Spotify/12345.";

        let parsed = parse_message(message).expect("Could not parse message");

        assert!(
            parsed.transaction_date >= before,
            "transaction date {} is before the test started",
            parsed.transaction_date
        );
    }

    #[test]
    fn unparsable_date_defaults_to_processing_time() {
        // Matches the date pattern but names a month that does not exist.
        let before = crate::clock::now();
        let message = "INR 99.00 has been debited on 08-13-2025 21:43:50 at PUR/Spotify/12345.";

        let parsed = parse_message(message).expect("Could not parse message");

        assert!(
            parsed.transaction_date >= before,
            "transaction date {} is before the test started",
            parsed.transaction_date
        );
    }

    #[test]
    fn message_with_neither_direction_keyword_is_unknown() {
        let message = "INR 150.00 payment attempt at PUR/Some Shop/123 was declined.";

        let parsed = parse_message(message).expect("Could not parse message");

        assert_eq!(parsed.transaction_type, TransactionType::Unknown);
    }

    #[test]
    fn direction_search_is_case_insensitive() {
        let message = "INR 150.00 has been DEBITED from your account.";

        let parsed = parse_message(message).expect("Could not parse message");

        assert_eq!(parsed.transaction_type, TransactionType::Debit);
    }
}
