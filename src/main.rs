use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use upi_ledger::{
    BatchSource, MailboxConfig, MailboxSource, MessageSource, Store, render_report, run_pipeline,
};

/// Ingests UPI transaction alerts, classifies the spend and prints a running
/// expense report.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the SQLite database; created on the first run.
    #[arg(long, default_value = "transactions.db")]
    db_path: PathBuf,

    /// File with one SMS alert per line. The built-in sample batch is used
    /// when omitted.
    #[arg(long)]
    sms_file: Option<PathBuf>,

    /// The IMAP server to fetch transaction alert emails from.
    #[arg(long, default_value = "imap.gmail.com")]
    imap_host: String,

    /// The IMAPS port.
    #[arg(long, default_value_t = 993)]
    imap_port: u16,

    /// Mailbox account to log in as. The mailbox source is skipped when this
    /// or the password is not set.
    #[arg(long, env = "EMAIL_USER")]
    email_user: Option<String>,

    /// Mailbox password or app password.
    #[arg(long, env = "EMAIL_PASS", hide_env_values = true)]
    email_pass: Option<String>,
}

fn main() -> ExitCode {
    setup_logging();

    let args = Args::parse();

    let mut store = match Store::open(&args.db_path) {
        Ok(store) => store,
        Err(error) => {
            tracing::error!("could not open database {:?}: {error}", args.db_path);
            return ExitCode::FAILURE;
        }
    };

    let mut sources: Vec<Box<dyn MessageSource>> = Vec::new();

    match &args.sms_file {
        Some(path) => match BatchSource::from_file(path) {
            Ok(batch) => sources.push(Box::new(batch)),
            Err(error) => tracing::error!("skipping the SMS batch: {error}"),
        },
        None => sources.push(Box::new(BatchSource::samples())),
    }

    match (&args.email_user, &args.email_pass) {
        (Some(user), Some(password)) => sources.push(Box::new(MailboxSource::new(MailboxConfig {
            host: args.imap_host.clone(),
            port: args.imap_port,
            user: user.clone(),
            password: password.clone(),
        }))),
        _ => tracing::info!("EMAIL_USER or EMAIL_PASS not set, skipping the mailbox source"),
    }

    let stats = run_pipeline(&mut store, &mut sources);
    tracing::info!(
        "run complete: {} fetched, {} skipped, {} saved, {} failed",
        stats.fetched,
        stats.skipped,
        stats.saved,
        stats.failed
    );

    match store.report() {
        Ok(rows) => print!("\n{}", render_report(&rows)),
        Err(error) => tracing::error!("could not generate the expense report: {error}"),
    }

    ExitCode::SUCCESS
}

fn setup_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter::LevelFilter::INFO.to_string()));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();
}
