//! Wires the message sources, parser, classifier and store together.

use crate::{
    category::classify,
    parse::parse_message,
    source::MessageSource,
    store::Store,
    transaction::NewTransaction,
};

/// Counters for one pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Messages pulled from all sources.
    pub fetched: usize,
    /// Messages the parser rejected.
    pub skipped: usize,
    /// Transactions written to the store.
    pub saved: usize,
    /// Save attempts that failed at the store boundary.
    pub failed: usize,
}

/// Drain every source through parse, classify and save.
///
/// Each unit of work is fault isolated: an unavailable source, an unparsable
/// message or a failed save is logged and the run continues with the next
/// unit. A message is acknowledged to its source only after its transaction
/// has been stored, so an unsaved mailbox message stays unread and is
/// fetched again on the next run.
pub fn run(store: &mut Store, sources: &mut [Box<dyn MessageSource>]) -> RunStats {
    let mut stats = RunStats::default();

    for source in sources.iter_mut() {
        let messages = match source.fetch() {
            Ok(messages) => messages,
            Err(error) => {
                tracing::error!(
                    "source {} unavailable, continuing without it: {error}",
                    source.name()
                );
                continue;
            }
        };

        tracing::info!("fetched {} messages from {}", messages.len(), source.name());
        stats.fetched += messages.len();

        for message in messages {
            let parsed = match parse_message(&message.body) {
                Ok(parsed) => parsed,
                Err(error) => {
                    tracing::warn!("skipping message {:?}: {error}", message.body);
                    stats.skipped += 1;
                    continue;
                }
            };

            let category = classify(&parsed.merchant);
            let candidate = NewTransaction {
                amount: parsed.amount,
                merchant: parsed.merchant,
                category,
                transaction_date: parsed.transaction_date,
                transaction_type: parsed.transaction_type,
                source: message.provenance,
            };

            match store.save(candidate) {
                Ok(transaction) => {
                    stats.saved += 1;
                    tracing::info!(
                        "saved transaction: {} - ₹{} on {} [{}]",
                        transaction.merchant,
                        transaction.amount,
                        transaction.transaction_date,
                        transaction.transaction_type
                    );

                    if let Err(error) = source.acknowledge(&message) {
                        tracing::error!(
                            "could not acknowledge message to {}: {error}",
                            source.name()
                        );
                    }
                }
                Err(error) => {
                    stats.failed += 1;
                    tracing::error!("could not save transaction for {:?}: {error}", message.body);
                }
            }
        }

        source.close();
    }

    stats
}

#[cfg(test)]
mod run_tests {
    use std::{cell::RefCell, rc::Rc};

    use crate::{
        Error,
        category::Category,
        source::{BatchSource, MessageSource, RawMessage},
        store::{Store, TransactionQuery},
        transaction::{Source, TransactionType},
    };

    use super::run;

    /// A scripted source that records which messages were acknowledged.
    struct ScriptedSource {
        messages: Vec<String>,
        acknowledged: Rc<RefCell<Vec<String>>>,
    }

    impl MessageSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        fn fetch(&mut self) -> Result<Vec<RawMessage>, Error> {
            Ok(self
                .messages
                .iter()
                .enumerate()
                .map(|(index, message)| RawMessage {
                    body: message.clone(),
                    provenance: Source::Email,
                    sequence: Some(index as u32 + 1),
                })
                .collect())
        }

        fn acknowledge(&mut self, message: &RawMessage) -> Result<(), Error> {
            self.acknowledged.borrow_mut().push(message.body.clone());
            Ok(())
        }
    }

    /// A source that is never reachable.
    struct DeadSource;

    impl MessageSource for DeadSource {
        fn name(&self) -> &str {
            "dead"
        }

        fn fetch(&mut self) -> Result<Vec<RawMessage>, Error> {
            Err(Error::SourceUnavailable("connection refused".to_owned()))
        }

        fn acknowledge(&mut self, _message: &RawMessage) -> Result<(), Error> {
            unreachable!("nothing fetched from a dead source can be acknowledged")
        }
    }

    #[test]
    fn processes_the_sample_batch_end_to_end() {
        let mut store = Store::open_in_memory().unwrap();
        let mut sources: Vec<Box<dyn MessageSource>> = vec![Box::new(BatchSource::samples())];

        let stats = run(&mut store, &mut sources);

        assert_eq!(stats.fetched, 3);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.saved, 3);
        assert_eq!(stats.failed, 0);

        // The two debits land in their categories; the credit is persisted
        // but contributes to no total.
        let report = store.report().expect("Could not query report");
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].category, Category::Other);
        assert_eq!(report[0].total_amount, 1400.0);
        assert_eq!(report[1].category, Category::Entertainment);
        assert_eq!(report[1].total_amount, 250.0);

        let transactions = store
            .list_transactions(&TransactionQuery::default())
            .expect("Could not list transactions");
        assert_eq!(transactions.len(), 3);

        let credit = transactions
            .iter()
            .find(|transaction| transaction.transaction_type == TransactionType::Credit)
            .expect("The credited message should persist");
        assert_eq!(credit.amount, 5000.0);
        assert_eq!(credit.merchant, "Unknown");
    }

    #[test]
    fn unparsable_messages_are_skipped_without_aborting_the_batch() {
        let mut store = Store::open_in_memory().unwrap();
        let acknowledged = Rc::new(RefCell::new(Vec::new()));
        let mut sources: Vec<Box<dyn MessageSource>> = vec![Box::new(ScriptedSource {
            messages: vec![
                "Your OTP is 482910. Do not share it.".to_owned(),
                "INR 250.00 has been debited at PUR/Netflix Subscription/1029384756.".to_owned(),
            ],
            acknowledged: acknowledged.clone(),
        })];

        let stats = run(&mut store, &mut sources);

        assert_eq!(stats.fetched, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.saved, 1);

        let report = store.report().expect("Could not query report");
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].category, Category::Entertainment);
    }

    #[test]
    fn only_saved_messages_are_acknowledged() {
        let mut store = Store::open_in_memory().unwrap();
        let acknowledged = Rc::new(RefCell::new(Vec::new()));
        let saveable = "INR 250.00 has been debited at PUR/Netflix Subscription/1029384756.";
        let mut sources: Vec<Box<dyn MessageSource>> = vec![Box::new(ScriptedSource {
            messages: vec!["no amount here".to_owned(), saveable.to_owned()],
            acknowledged: acknowledged.clone(),
        })];

        run(&mut store, &mut sources);

        assert_eq!(*acknowledged.borrow(), vec![saveable.to_owned()]);
    }

    #[test]
    fn an_unavailable_source_does_not_stop_later_sources() {
        let mut store = Store::open_in_memory().unwrap();
        let mut sources: Vec<Box<dyn MessageSource>> = vec![
            Box::new(DeadSource),
            Box::new(BatchSource::samples()),
        ];

        let stats = run(&mut store, &mut sources);

        assert_eq!(stats.fetched, 3);
        assert_eq!(stats.saved, 3);
    }

    #[test]
    fn email_provenance_is_recorded_on_saved_transactions() {
        let mut store = Store::open_in_memory().unwrap();
        let acknowledged = Rc::new(RefCell::new(Vec::new()));
        let mut sources: Vec<Box<dyn MessageSource>> = vec![Box::new(ScriptedSource {
            messages: vec![
                "INR 1400.00 has been debited at PUR/M S GLOBAL MART/100/500.".to_owned(),
            ],
            acknowledged,
        })];

        run(&mut store, &mut sources);

        let transactions = store
            .list_transactions(&TransactionQuery::default())
            .expect("Could not list transactions");
        assert_eq!(transactions[0].source, Source::Email);
    }
}
