//! Terminal surface for Jotpad.
//!
//! # Responsibility
//! - Expose add/list/remove and an interactive live session over the core.
//! - Keep presentation here; all list and store rules live in `jotpad_core`.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use jotpad_core::db::open_db;
use jotpad_core::{
    init_logging_from_config, ClientConfig, DeletePolicy, EntryKey, ListEntry, NoteId,
    NoteRepository, NotesSession, Notification, NotificationLevel, OrderSpec, RepoError,
    SessionOptions, SqliteNoteStore, StoreNoteRepository,
};
use log::info;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "jotpad", version, about = "Minimal personal notes")]
struct Cli {
    /// JSON config file; environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Note database path.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Owner id to scope notes to.
    #[arg(long, global = true)]
    owner: Option<String>,
    /// Delete strategy for the interactive shell.
    #[arg(long, global = true)]
    policy: Option<DeletePolicy>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the core library is linked.
    Ping,
    /// Save one note.
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Print all notes, newest first.
    List,
    /// Delete one note by id.
    Rm { id: String },
    /// Live session: type a line to save it, `:rm N` to delete, `:q` to quit.
    Shell,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Command::Ping = cli.command {
        print_ping();
        return Ok(());
    }

    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(owner) = cli.owner {
        config.owner_id = Some(owner);
    }
    if let Some(policy) = cli.policy {
        config.delete_policy = policy;
    }
    init_logging_from_config(&config)?;

    let conn = open_db(&config.db_path)
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    let store = SqliteNoteStore::try_new(&conn)?;
    let repo = match config.owner() {
        Some(owner) => StoreNoteRepository::scoped(&store, owner),
        None => StoreNoteRepository::new(&store),
    };
    info!(
        "event=cli_start module=cli status=ok scoped={}",
        repo.owner().is_some()
    );

    match cli.command {
        Command::Ping => print_ping(),
        Command::Add { text } => {
            let id = repo.create(&text.join(" "))?;
            println!("{id}");
        }
        Command::List => {
            let snapshot = repo.query(&repo.scope(), OrderSpec::CreatedAtDesc)?;
            if snapshot.is_empty() {
                println!("No notes yet.");
            }
            for note in &snapshot.notes {
                println!("{}  {}", note.id, note.text.replace('\n', " / "));
            }
        }
        Command::Rm { id } => println!("{}", remove_note(&repo, id)?),
        Command::Shell => run_shell(&repo, SessionOptions::from(&config))?,
    }
    Ok(())
}

fn print_ping() {
    println!("jotpad_core ping={}", jotpad_core::ping());
    println!("jotpad_core version={}", jotpad_core::core_version());
}

/// Deletes one note; a note that is already gone is not an error.
fn remove_note<R: NoteRepository + ?Sized>(repo: &R, id: String) -> Result<&'static str> {
    match repo.delete_by_id(&NoteId::new(id)) {
        Ok(()) => Ok("deleted"),
        Err(RepoError::NotFound(_)) => Ok("already deleted"),
        Err(err) => Err(err.into()),
    }
}

fn run_shell<R: NoteRepository + ?Sized>(repo: &R, options: SessionOptions) -> Result<()> {
    let mut session = NotesSession::open(repo, options)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    render(&session, &mut stdout)?;

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed == ":q" {
            break;
        }

        if let Some(arg) = trimmed.strip_prefix(":rm") {
            let key = match entry_key_at(session.entries(), arg.trim()) {
                Ok(key) => key,
                Err(err) => {
                    writeln!(stdout, "! {err}")?;
                    continue;
                }
            };
            session.delete(&key);
        } else if trimmed != ":ls" {
            session.edit(line.replace("\\n", "\n"));
            session.save();
        }

        session.pump();
        for notification in session.drain_notifications() {
            print_notification(&notification, &mut stdout)?;
        }
        render(&session, &mut stdout)?;
    }

    session.close();
    Ok(())
}

fn entry_key_at(entries: &[ListEntry], arg: &str) -> Result<EntryKey> {
    let position: usize = arg
        .parse()
        .with_context(|| format!("`{arg}` is not an entry number"))?;
    if position == 0 || position > entries.len() {
        bail!("no entry #{position}");
    }
    Ok(entries[position - 1].key())
}

fn render<R: NoteRepository + ?Sized>(
    session: &NotesSession<'_, R>,
    out: &mut impl Write,
) -> io::Result<()> {
    let now = Utc::now();
    writeln!(out, "---")?;
    for (idx, entry) in session.entries().iter().enumerate() {
        writeln!(out, "[{}] {}", idx + 1, entry.date_label(now))?;
        for line in entry.text().lines() {
            writeln!(out, "    {line}")?;
        }
    }
    let counter = session.counter();
    writeln!(out, "({})", counter.label())?;
    out.flush()
}

fn print_notification(notification: &Notification, out: &mut impl Write) -> io::Result<()> {
    let marker = match notification.level {
        NotificationLevel::Success => "+",
        NotificationLevel::Info => "i",
        NotificationLevel::Error => "!",
    };
    writeln!(out, "{marker} {}", notification.message)
}
