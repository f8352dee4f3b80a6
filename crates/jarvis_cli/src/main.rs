//! `jarvis` command-line client.
//!
//! Every subcommand maps to one server call and prints JSON to stdout.

use clap::{Args, Parser, Subcommand};
use flexi_logger::{Logger, LoggerHandle};
use jarvis_cli::{join_tags, NoteClient, DEFAULT_SERVER_URL};
use jarvis_core::{NoteDraft, NoteFilterParams, NoteId, NotePatch, NoteType};
use serde::Serialize;
use serde_json::json;
use std::error::Error;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(version, about = "Talk to a Jarvis notes server")]
struct Cli {
    /// Server base URL.
    #[arg(long, global = true, default_value = DEFAULT_SERVER_URL)]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the server answers.
    Ping,
    /// Create a note.
    Create(CreateArgs),
    /// Show one note.
    Get { kind: NoteType, id: NoteId },
    /// List every note.
    List,
    /// List notes of one type matching filters.
    Filter(FilterArgs),
    /// Change some fields of a note.
    Update(UpdateArgs),
    /// Delete one note.
    Delete { kind: NoteType, id: NoteId },
    /// Delete every note, or every note of one type.
    DeleteAll {
        #[arg(long = "type")]
        kind: Option<NoteType>,
    },
}

#[derive(Debug, Args)]
struct CreateArgs {
    #[arg(long = "type")]
    kind: NoteType,
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    content: String,
    /// Repeat for several tags.
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    due_date: Option<String>,
    #[arg(long)]
    done: bool,
}

#[derive(Debug, Args)]
struct FilterArgs {
    kind: NoteType,
    #[arg(long)]
    created_start: Option<String>,
    #[arg(long)]
    created_end: Option<String>,
    #[arg(long)]
    updated_start: Option<String>,
    #[arg(long)]
    updated_end: Option<String>,
    /// Required tags; the note must carry all of them.
    #[arg(long = "tag")]
    tags: Vec<String>,
}

#[derive(Debug, Args)]
struct UpdateArgs {
    id: NoteId,
    #[arg(long = "type")]
    kind: NoteType,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    content: Option<String>,
    /// Replaces the tag list. Repeat for several tags.
    #[arg(long = "tag", conflicts_with = "clear_tags")]
    tags: Vec<String>,
    #[arg(long)]
    clear_tags: bool,
    #[arg(long)]
    date: Option<String>,
    #[arg(long, conflicts_with = "clear_due_date")]
    due_date: Option<String>,
    /// Removes the task's deadline.
    #[arg(long)]
    clear_due_date: bool,
    #[arg(long)]
    done: Option<bool>,
}

impl CreateArgs {
    fn into_draft(self) -> NoteDraft {
        NoteDraft {
            date: self.date,
            due_date: self.due_date,
            done: self.done.then_some(true),
            ..NoteDraft::new(self.kind, self.name, self.content)
        }
        .with_tags(self.tags)
    }
}

impl FilterArgs {
    fn params(&self) -> NoteFilterParams {
        NoteFilterParams {
            created_start: self.created_start.clone(),
            created_end: self.created_end.clone(),
            updated_start: self.updated_start.clone(),
            updated_end: self.updated_end.clone(),
            tags: join_tags(&self.tags),
        }
    }
}

impl UpdateArgs {
    fn into_patch(self) -> NotePatch {
        let tags = if self.clear_tags {
            Some(Vec::new())
        } else if self.tags.is_empty() {
            None
        } else {
            Some(self.tags)
        };
        NotePatch {
            name: self.name,
            content: self.content,
            tags,
            date: self.date,
            due_date: if self.clear_due_date {
                Some(None)
            } else {
                self.due_date.map(Some)
            },
            done: self.done,
            ..NotePatch::for_type(self.kind)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _logger = start_logging();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("jarvis: {err}");
            ExitCode::FAILURE
        }
    }
}

fn start_logging() -> Option<LoggerHandle> {
    Logger::try_with_env_or_str("warn")
        .and_then(|logger| logger.log_to_stderr().start())
        .map_err(|err| eprintln!("jarvis: logging disabled: {err}"))
        .ok()
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let client = NoteClient::new(&cli.server)?;

    match cli.command {
        Command::Ping => print_json(&json!({ "message": client.ping()? })),
        Command::Create(args) => {
            let id = client.create(&args.into_draft())?;
            print_json(&json!({ "id": id }))
        }
        Command::Get { kind, id } => match client.get(kind, id)? {
            Some(note) => print_json(&note),
            None => Err(format!("{kind} {id} not found").into()),
        },
        Command::List => print_json(&client.list_all()?),
        Command::Filter(args) => print_json(&client.filter(args.kind, &args.params())?),
        Command::Update(args) => {
            let id = args.id;
            print_json(&client.update(id, &args.into_patch())?)
        }
        Command::Delete { kind, id } => {
            client.delete(kind, id)?;
            print_json(&json!({ "deleted": { "type": kind, "id": id } }))
        }
        Command::DeleteAll { kind } => {
            client.delete_all(kind)?;
            print_json(&json!({ "deleted": kind.map_or("all", NoteType::as_str) }))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;
    use jarvis_core::NoteType;

    #[test]
    fn create_builds_typed_draft() {
        let cli = Cli::parse_from([
            "jarvis", "create", "--type", "event", "--name", "standup", "--date",
            "2024-06-01T09:00:00", "--tag", "work",
        ]);
        let Command::Create(args) = cli.command else {
            panic!("expected create");
        };
        let draft = args.into_draft();
        assert_eq!(draft.note_type().unwrap(), NoteType::Event);
        assert_eq!(draft.tags, vec!["work"]);
        assert_eq!(draft.done, None);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn update_clear_tags_sends_empty_list() {
        let cli = Cli::parse_from(["jarvis", "update", "3", "--type", "memo", "--clear-tags"]);
        let Command::Update(args) = cli.command else {
            panic!("expected update");
        };
        let patch = args.into_patch();
        assert_eq!(patch.tags, Some(Vec::new()));
        assert_eq!(patch.note_type().unwrap(), NoteType::Memo);
    }

    #[test]
    fn update_clear_due_date_sends_null() {
        let cli = Cli::parse_from(["jarvis", "update", "3", "--type", "task", "--clear-due-date"]);
        let Command::Update(args) = cli.command else {
            panic!("expected update");
        };
        let patch = args.into_patch();
        assert_eq!(patch.due_date, Some(None));
        assert!(serde_json::to_value(&patch).unwrap()["due_date"].is_null());

        let cli = Cli::parse_from(["jarvis", "update", "3", "--type", "task", "--due-date", "2024-05-01"]);
        let Command::Update(args) = cli.command else {
            panic!("expected update");
        };
        assert_eq!(args.into_patch().due_date, Some(Some("2024-05-01".to_string())));

        assert!(Cli::try_parse_from([
            "jarvis", "update", "3", "--type", "task", "--due-date", "2024-05-01",
            "--clear-due-date",
        ])
        .is_err());
    }

    #[test]
    fn filter_joins_repeated_tags_and_server_flag_is_global() {
        let cli = Cli::parse_from([
            "jarvis", "filter", "task", "--tag", "a", "--tag", "b", "--server",
            "http://notes.local:8080",
        ]);
        assert_eq!(cli.server, "http://notes.local:8080");
        let Command::Filter(args) = cli.command else {
            panic!("expected filter");
        };
        assert_eq!(args.params().tags.as_deref(), Some("a,b"));
    }

    #[test]
    fn unknown_type_is_rejected_at_parse_time() {
        assert!(Cli::try_parse_from(["jarvis", "get", "journal", "1"]).is_err());
    }
}
