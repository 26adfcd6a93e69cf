//! Strongbox command-line client.
//!
//! Each command opens the stores under `--data-dir`, signs in (except
//! `add-user`), does its work, and tears the session down. The master key is
//! derived at most once per command.
//!
//! # Usage
//!
//! ```bash
//! strongbox add-user --name "Alice" --email alice@example.com
//! strongbox employees
//! strongbox send --email alice@example.com --file report.pdf
//! strongbox send --email alice@example.com --file report.pdf --to 3f2a... --to 9c41...
//! strongbox list --email bob@example.com
//! strongbox download --email bob@example.com --id 1234 --out report.pdf
//! ```
//!
//! Passwords come from `STRONGBOX_PASSWORD` and the company passphrase from
//! `STRONGBOX_PASSPHRASE` when set; otherwise both are prompted for.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use strongbox_core::EncryptedFileRecord;
use strongbox_service::{
    Identity, LocalSession, Recipients, ServiceConfig, ServiceError, Storage, TerminalPassphrase,
    read_secret,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

/// Strongbox encrypted file sharing
#[derive(Parser, Debug)]
#[command(name = "strongbox")]
#[command(about = "Share client-side encrypted files between employees")]
#[command(version)]
struct Args {
    /// Directory holding the metadata database and encrypted blobs
    #[arg(long, global = true, default_value = "strongbox-data")]
    data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register an employee
    AddUser {
        /// Display name
        #[arg(long)]
        name: String,
        /// Login email
        #[arg(long)]
        email: String,
    },
    /// List registered employees and their ids
    Employees,
    /// Check credentials
    Login {
        /// Login email
        #[arg(long)]
        email: String,
    },
    /// Encrypt and share a file
    Send {
        /// Sender's login email
        #[arg(long)]
        email: String,
        /// File to share
        #[arg(long)]
        file: PathBuf,
        /// Recipient employee id (repeatable); omit to send to everyone
        #[arg(long = "to")]
        to: Vec<String>,
    },
    /// List received and sent files
    List {
        /// Login email
        #[arg(long)]
        email: String,
    },
    /// Download and decrypt a received or sent file
    Download {
        /// Login email
        #[arg(long)]
        email: String,
        /// Record id as shown by `list`
        #[arg(long)]
        id: u64,
        /// Output path (defaults to the original file name)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let config = ServiceConfig::with_data_dir(&args.data_dir);
    let session =
        LocalSession::open_local(&config, TerminalPassphrase::new(&config.passphrase_env)).await?;

    let result = run(&session, &config, args.command).await;
    session.close();

    if let Err(e) = &result {
        tracing::error!("{e}");
    }
    result
}

async fn run(
    session: &LocalSession<TerminalPassphrase>,
    config: &ServiceConfig,
    command: Command,
) -> Result<(), ServiceError> {
    let mut out = io::stdout();

    match command {
        Command::AddUser { name, email } => {
            let password = password(config).await?;
            let employee = session.identity().register(&name, &email, &password)?;
            writeln!(
                out,
                "Registered {} <{}> with id {}",
                employee.name, employee.email, employee.id
            )?;
        },
        Command::Employees => {
            for employee in session.identity().storage().list_employees()? {
                writeln!(out, "{}  {} <{}>", employee.id, employee.name, employee.email)?;
            }
        },
        Command::Login { email } => {
            let user = sign_in(session, config, &email).await?;
            writeln!(out, "Signed in as {} ({})", user.email, user.id)?;
            session.login().logout().await?;
        },
        Command::Send { email, file, to } => {
            sign_in(session, config, &email).await?;

            let contents = tokio::fs::read(&file).await?;
            let file_name = file_name(&file)?;
            let recipients = if to.is_empty() { Recipients::All } else { Recipients::Selected(to) };

            let count = session.sharing().send_file(&file_name, &contents, &recipients).await?;
            writeln!(out, "Shared {file_name} with {count} recipient(s)")?;
            session.login().logout().await?;
        },
        Command::List { email } => {
            sign_in(session, config, &email).await?;

            let listing = session.sharing().list_files().await?;
            writeln!(out, "Received:")?;
            for record in &listing.received {
                let (id, name, from) = (record.id, &record.file_name, &record.sender_name);
                writeln!(out, "  {id}  {name}  from {from}")?;
            }
            writeln!(out, "Sent:")?;
            for record in &listing.sent {
                let (id, name, to) = (record.id, &record.file_name, &record.recipient_name);
                writeln!(out, "  {id}  {name}  to {to}")?;
            }
            session.login().logout().await?;
        },
        Command::Download { email, id, out: target } => {
            sign_in(session, config, &email).await?;

            let record = find_record(session, id).await?;
            let target = match target {
                Some(target) => target,
                None => PathBuf::from(file_name(Path::new(&record.file_name))?),
            };
            let plaintext = session.sharing().download_file(record.id).await?;
            tokio::fs::write(&target, &plaintext).await?;

            writeln!(out, "Saved {} ({} bytes)", target.display(), plaintext.len())?;
            session.login().logout().await?;
        },
    }

    Ok(())
}

async fn password(config: &ServiceConfig) -> Result<Zeroizing<String>, ServiceError> {
    read_secret(&config.password_env, "Password: ")
        .await
        .ok_or_else(|| ServiceError::Config("no password entered".to_string()))
}

async fn sign_in(
    session: &LocalSession<TerminalPassphrase>,
    config: &ServiceConfig,
    email: &str,
) -> Result<Identity, ServiceError> {
    let password = password(config).await?;
    Ok(session.login().login(email, &password).await?)
}

async fn find_record(
    session: &LocalSession<TerminalPassphrase>,
    id: u64,
) -> Result<EncryptedFileRecord, ServiceError> {
    let listing = session.sharing().list_files().await?;

    listing
        .received
        .into_iter()
        .chain(listing.sent)
        .find(|record| record.id == id)
        .ok_or_else(|| ServiceError::Config(format!("no file with id {id} for this user")))
}

fn file_name(path: &Path) -> Result<String, ServiceError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| ServiceError::Config(format!("{} is not a file path", path.display())))
}
