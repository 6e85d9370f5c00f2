//! Message sources that feed the pipeline: an in-memory SMS batch and a
//! remote IMAP mailbox.

use std::{
    fs,
    net::{TcpStream, ToSocketAddrs},
    path::Path,
    time::Duration,
};

use mailparse::ParsedMail;
use native_tls::{TlsConnector, TlsStream};

use crate::{Error, transaction::Source};

/// A raw notification message pulled from a source, before parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    /// The message text handed to the parser.
    pub body: String,
    /// Which kind of source produced the message.
    pub provenance: Source,
    /// The mailbox sequence number, for sources that acknowledge messages.
    pub sequence: Option<u32>,
}

/// A source of raw transaction notification messages.
///
/// `fetch` returning an error means the source is unavailable for this run;
/// the pipeline treats that as an empty message set rather than a failure.
/// Acknowledgement is called once per message, only after the message has
/// been successfully stored.
pub trait MessageSource {
    /// A short label for logs.
    fn name(&self) -> &str;

    /// Pull all pending messages from the source.
    ///
    /// # Errors
    /// Returns [Error::SourceUnavailable] when the source cannot be reached
    /// or read.
    fn fetch(&mut self) -> Result<Vec<RawMessage>, Error>;

    /// Mark `message` as processed, for sources that track delivery.
    ///
    /// # Errors
    /// Returns [Error::SourceUnavailable] when the acknowledgement cannot be
    /// delivered. The message will then be fetched again on the next run.
    fn acknowledge(&mut self, message: &RawMessage) -> Result<(), Error>;

    /// Release any connection held by the source. Called once the pipeline
    /// has drained the source.
    fn close(&mut self) {}
}

/// A fixed, in-memory batch of SMS messages. Acknowledgement is a no-op.
#[derive(Debug, Clone)]
pub struct BatchSource {
    messages: Vec<String>,
}

impl BatchSource {
    /// Create a batch source over `messages`.
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    /// Read one message per non-empty line of the file at `path`.
    ///
    /// # Errors
    /// Returns [Error::SourceUnavailable] when the file cannot be read.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let text = fs::read_to_string(path).map_err(|error| {
            Error::SourceUnavailable(format!("could not read message file: {error}"))
        })?;

        let messages = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();

        Ok(Self { messages })
    }

    /// A small batch of simulated bank SMS alerts, for exercising the
    /// pipeline without a mailbox or a real SMS export.
    pub fn samples() -> Self {
        Self::new(vec![
            "INR 1400.00 has been debited from your A/c no. XX172263 on 08-02-2025 21:43:50 \
             at PUR/M S GLOBAL MART/100000000089018/503921456192."
                .to_owned(),
            "INR 250.00 has been debited from your A/c no. XX172263 on 07-02-2025 19:30:20 \
             at PUR/Netflix Subscription/1029384756."
                .to_owned(),
            "INR 5000.00 has been credited to your A/c no. XX172263 on 09-02-2025 10:15:30 \
             from Amazon Seller Payments."
                .to_owned(),
        ])
    }
}

impl MessageSource for BatchSource {
    fn name(&self) -> &str {
        "sms batch"
    }

    fn fetch(&mut self) -> Result<Vec<RawMessage>, Error> {
        Ok(self
            .messages
            .iter()
            .map(|message| RawMessage {
                body: message.clone(),
                provenance: Source::Sms,
                sequence: None,
            })
            .collect())
    }

    fn acknowledge(&mut self, _message: &RawMessage) -> Result<(), Error> {
        Ok(())
    }
}

/// Connection details and credentials for the mailbox source.
#[derive(Debug, Clone)]
pub struct MailboxConfig {
    /// The IMAP server host name.
    pub host: String,
    /// The IMAPS port, normally 993.
    pub port: u16,
    /// The account to log in as.
    pub user: String,
    /// The account password or app password.
    pub password: String,
}

const NETWORK_TIMEOUT: Duration = Duration::from_secs(30);
const SUBJECT_FILTER: &str = "Transaction Alert";

/// Fetches unread transaction alert emails over IMAP.
///
/// Connection, authentication and fetch errors all surface as
/// [Error::SourceUnavailable], so an unreachable mailbox degrades to an
/// empty message set at the pipeline level instead of aborting the run.
/// Messages are fetched with `BODY.PEEK` and stay unread until
/// [acknowledged](MessageSource::acknowledge).
pub struct MailboxSource {
    config: MailboxConfig,
    session: Option<imap::Session<TlsStream<TcpStream>>>,
}

impl MailboxSource {
    /// Create a mailbox source. No connection is made until the first
    /// [fetch](MessageSource::fetch).
    pub fn new(config: MailboxConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    fn connect(&self) -> Result<imap::Session<TlsStream<TcpStream>>, Error> {
        let address = format!("{}:{}", self.config.host, self.config.port);
        let socket_address = address
            .to_socket_addrs()
            .map_err(|error| {
                Error::SourceUnavailable(format!("could not resolve {address}: {error}"))
            })?
            .next()
            .ok_or_else(|| Error::SourceUnavailable(format!("no addresses for {address}")))?;

        let stream = TcpStream::connect_timeout(&socket_address, NETWORK_TIMEOUT).map_err(
            |error| Error::SourceUnavailable(format!("could not connect to {address}: {error}")),
        )?;
        stream
            .set_read_timeout(Some(NETWORK_TIMEOUT))
            .and_then(|_| stream.set_write_timeout(Some(NETWORK_TIMEOUT)))
            .map_err(|error| {
                Error::SourceUnavailable(format!("could not set socket timeouts: {error}"))
            })?;

        let connector = TlsConnector::new().map_err(|error| {
            Error::SourceUnavailable(format!("could not build TLS connector: {error}"))
        })?;
        let stream = connector.connect(&self.config.host, stream).map_err(|error| {
            Error::SourceUnavailable(format!("TLS handshake with {address} failed: {error}"))
        })?;

        let mut client = imap::Client::new(stream);
        client.read_greeting().map_err(|error| {
            Error::SourceUnavailable(format!("bad IMAP greeting from {address}: {error}"))
        })?;

        client
            .login(&self.config.user, &self.config.password)
            .map_err(|(error, _)| Error::SourceUnavailable(format!("login failed: {error}")))
    }
}

impl MessageSource for MailboxSource {
    fn name(&self) -> &str {
        "mailbox"
    }

    fn fetch(&mut self) -> Result<Vec<RawMessage>, Error> {
        let mut session = self.connect()?;

        session.select("INBOX").map_err(|error| {
            Error::SourceUnavailable(format!("could not select inbox: {error}"))
        })?;

        let mut unread: Vec<u32> = session
            .search(format!("SUBJECT \"{SUBJECT_FILTER}\" UNSEEN"))
            .map_err(|error| Error::SourceUnavailable(format!("search failed: {error}")))?
            .into_iter()
            .collect();
        unread.sort_unstable();

        let mut messages = Vec::new();

        for sequence in unread {
            // BODY.PEEK keeps the message unread until the pipeline has
            // stored it and calls acknowledge.
            let fetched = match session.fetch(sequence.to_string(), "BODY.PEEK[]") {
                Ok(fetched) => fetched,
                Err(error) => {
                    tracing::error!("could not fetch message {sequence}: {error}");
                    continue;
                }
            };

            let Some(fetch) = fetched.iter().next() else {
                continue;
            };
            let Some(raw) = fetch.body() else {
                tracing::debug!("message {sequence} has no body");
                continue;
            };

            match extract_plain_text(raw) {
                Some(body) => messages.push(RawMessage {
                    body,
                    provenance: Source::Email,
                    sequence: Some(sequence),
                }),
                None => tracing::warn!("message {sequence} has no readable text part"),
            }
        }

        self.session = Some(session);

        Ok(messages)
    }

    fn acknowledge(&mut self, message: &RawMessage) -> Result<(), Error> {
        let Some(sequence) = message.sequence else {
            return Ok(());
        };

        let session = self.session.as_mut().ok_or_else(|| {
            Error::SourceUnavailable("no open mailbox session to acknowledge on".to_owned())
        })?;

        session
            .store(sequence.to_string(), "+FLAGS (\\Seen)")
            .map_err(|error| {
                Error::SourceUnavailable(format!("could not mark message {sequence} read: {error}"))
            })?;

        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(error) = session.logout() {
                tracing::debug!("mailbox logout failed: {error}");
            }
        }
    }
}

/// Extract the first `text/plain` part of a MIME message, falling back to
/// the top-level body when the message has no explicit plain text part.
pub(crate) fn extract_plain_text(raw: &[u8]) -> Option<String> {
    let parsed = match mailparse::parse_mail(raw) {
        Ok(parsed) => parsed,
        Err(error) => {
            tracing::debug!("could not parse MIME message: {error}");
            return None;
        }
    };

    find_plain_text(&parsed).or_else(|| parsed.get_body().ok())
}

fn find_plain_text(part: &ParsedMail<'_>) -> Option<String> {
    if part.ctype.mimetype.eq_ignore_ascii_case("text/plain") {
        return part.get_body().ok();
    }

    part.subparts.iter().find_map(find_plain_text)
}
