//! Command-line front-end for the note service.
//!
//! # Responsibility
//! - Resolve config, open the store, and drive `NoteService` for one user.
//! - Print results as JSON so output stays machine-readable.

use clap::{Parser, Subcommand};
use crnotes_core::{AppConfig, IdAllocator, NoteDirectory, NoteService, NoteUpdate};
use log::{error, info};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_STORE_PATH: &str = "crnotes.sqlite3";

#[derive(Debug, Parser)]
#[command(name = "crnotes", version, about = "Personal notes over a key-value store")]
struct Cli {
    /// TOML config file naming the store and log directory.
    #[arg(long, global = true, conflicts_with = "db")]
    config: Option<PathBuf>,

    /// Store file path, or `:memory:`.
    #[arg(long, global = true)]
    db: Option<String>,

    /// External identity owning the notes, e.g. an email address.
    #[arg(long, short, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the user's notes ordered by name.
    List,
    /// Create an empty note.
    Create { name: String },
    /// Show one note.
    Show { id: String },
    /// Rename a note and/or replace its text.
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        text: Option<String>,
    },
    /// Delete one note.
    Delete { id: String },
    /// List known usernames.
    Users,
    /// Change the user's name, keeping its notes.
    RenameUser { new_username: String },
    /// Delete the user and every note it owns.
    DeleteUser,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = match (&cli.config, &cli.db) {
        (Some(path), _) => AppConfig::load(path)?,
        (None, Some(db)) => AppConfig::for_store_path(db.as_str())?,
        (None, None) => AppConfig::for_store_path(DEFAULT_STORE_PATH)?,
    };
    config.logging.init()?;

    let store = config.store.open()?;
    let directory = NoteDirectory::open(IdAllocator::new(store))?;
    let mut service = NoteService::new(directory);
    info!(
        "event=cli_run module=cli status=start store={}",
        config.store.path
    );

    let output = match cli.command {
        Command::Users => {
            let usernames: Vec<&String> = service.directory().users().keys().collect();
            serde_json::to_string_pretty(&usernames)?
        }
        Command::RenameUser { new_username } => {
            let username = require_user(&cli.user)?;
            let renamed = service
                .directory_mut()
                .rename_user(username, &new_username)?;
            serde_json::to_string_pretty(&renamed)?
        }
        Command::DeleteUser => {
            let username = require_user(&cli.user)?;
            let deleted = service.directory_mut().delete_user(username)?;
            serde_json::to_string_pretty(&deleted)?
        }
        Command::List => {
            let username = require_user(&cli.user)?;
            serde_json::to_string_pretty(&service.list(username)?)?
        }
        Command::Create { name } => {
            let username = require_user(&cli.user)?;
            serde_json::to_string_pretty(&service.create(username, &name)?)?
        }
        Command::Show { id } => {
            let username = require_user(&cli.user)?;
            serde_json::to_string_pretty(&service.read(username, &id)?)?
        }
        Command::Update { id, name, text } => {
            let username = require_user(&cli.user)?;
            let update = NoteUpdate { name, text };
            serde_json::to_string_pretty(&service.update(username, &id, &update)?)?
        }
        Command::Delete { id } => {
            let username = require_user(&cli.user)?;
            serde_json::to_string_pretty(&service.delete(username, &id)?)?
        }
    };

    println!("{output}");
    Ok(())
}

fn require_user(user: &Option<String>) -> Result<&str, String> {
    user.as_deref()
        .ok_or_else(|| "--user is required for this command".to_string())
}
