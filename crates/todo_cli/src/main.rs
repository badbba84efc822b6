//! Command-line front end for the todo store.
//!
//! # Responsibility
//! - Map subcommands onto the store's create/get/list/update/delete calls.
//! - Print results as JSON on stdout and failures on stderr.
//!
//! Exit codes: 0 success, 1 storage or setup failure, 2 validation failure,
//! 3 unknown todo id.

use clap::{Parser, Subcommand, ValueEnum};
use log::debug;
use serde_json::json;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::process::ExitCode;
use todo_core::db::{open_db, DbError};
use todo_core::{
    core_version, default_log_level, init_logging, logging_status, LoggingError, NewTodo, TodoId,
    TodoListQuery, TodoPatch, TodoServiceError, TodoSort, TodoStatus, TodoStore,
};

#[derive(Parser, Debug)]
#[command(name = "todo", version, about = "Track todos in a local SQLite store")]
struct Cli {
    /// SQLite database file; created on first use.
    #[arg(long, env = "TODO_DB_PATH", default_value = "todo.sqlite3", global = true)]
    db: PathBuf,

    /// trace|debug|info|warn|error
    #[arg(long, env = "TODO_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, env = "TODO_LOG_DIR", global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Create a todo.
    Add {
        title: String,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, short, value_parser = parse_status)]
        status: Option<TodoStatus>,
    },
    /// Show one todo.
    Get { id: TodoId },
    /// List todos.
    List {
        #[arg(long, short, value_parser = parse_status)]
        status: Option<TodoStatus>,
        /// Case-insensitive title substring.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = SortArg::CreatedAt)]
        sort: SortArg,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Change title, description or status of a todo.
    Update {
        id: TodoId,
        #[arg(long, short)]
        title: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, short, value_parser = parse_status)]
        status: Option<TodoStatus>,
    },
    /// Apply a JSON patch such as `{"status": "done"}`.
    UpdateJson { id: TodoId, patch: String },
    /// Delete a todo permanently.
    Delete { id: TodoId },
    /// Print the allowed status values.
    Statuses,
    /// Print the core version and active logging setup.
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
enum SortArg {
    CreatedAt,
    CreatedAtDesc,
    Id,
    Title,
    Status,
}

impl From<SortArg> for TodoSort {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::CreatedAt => Self::CreatedAt,
            SortArg::CreatedAtDesc => Self::CreatedAtDesc,
            SortArg::Id => Self::Id,
            SortArg::Title => Self::Title,
            SortArg::Status => Self::Status,
        }
    }
}

#[derive(Debug)]
enum CliError {
    Logging(LoggingError),
    Db(DbError),
    Store(TodoServiceError),
    Output(serde_json::Error),
}

impl CliError {
    fn exit_status(&self) -> u8 {
        match self {
            Self::Store(TodoServiceError::Validation(_)) => 2,
            Self::Store(TodoServiceError::NotFound(_)) => 3,
            _ => 1,
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(err) => write!(f, "logging setup failed: {err}"),
            Self::Db(err) => write!(f, "cannot open database: {err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Output(err) => write!(f, "cannot render output: {err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Logging(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Output(err) => Some(err),
        }
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<TodoServiceError> for CliError {
    fn from(value: TodoServiceError) -> Self {
        Self::Store(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_status())
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    match cli.command {
        Command::Statuses => {
            let statuses: Vec<_> = TodoStatus::ALL
                .iter()
                .map(|status| json!({ "value": status.as_str(), "label": status.label() }))
                .collect();
            return print_json(&statuses);
        }
        Command::Version => {
            let logging = logging_status()
                .map(|(level, log_dir)| json!({ "level": level, "log_dir": log_dir }));
            return print_json(&json!({ "version": core_version(), "logging": logging }));
        }
        _ => {}
    }

    debug!("event=cli_start module=cli db_path={}", cli.db.display());
    let conn = open_db(&cli.db)?;
    let store = TodoStore::from_connection(&conn)?;

    match cli.command {
        Command::Add {
            title,
            description,
            status,
        } => {
            let todo = store.create(NewTodo {
                title,
                description,
                status,
            })?;
            print_json(&todo)
        }
        Command::Get { id } => print_json(&store.get(id)?),
        Command::List {
            status,
            search,
            sort,
            limit,
            offset,
        } => {
            let query = TodoListQuery {
                status,
                search,
                sort: sort.into(),
                limit,
                offset,
            };
            print_json(&store.list(&query)?)
        }
        Command::Update {
            id,
            title,
            description,
            status,
        } => {
            let patch = TodoPatch {
                title,
                description,
                status,
            };
            print_json(&store.update(id, &patch)?)
        }
        Command::UpdateJson { id, patch } => print_json(&store.update_from_json(id, &patch)?),
        Command::Delete { id } => {
            store.delete(id)?;
            print_json(&json!({ "deleted": id }))
        }
        Command::Statuses | Command::Version => Ok(()),
    }
}

fn parse_status(value: &str) -> Result<TodoStatus, todo_core::TodoValidationError> {
    value.parse()
}

fn print_json(value: &impl serde::Serialize) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, CliError, Command, SortArg};
    use clap::Parser;
    use todo_core::db::DbError;
    use todo_core::{LoggingError, TodoId, TodoServiceError, TodoStatus, TodoValidationError};

    #[test]
    fn validation_errors_exit_with_two() {
        let err = CliError::Store(TodoServiceError::Validation(TodoValidationError::EmptyTitle));
        assert_eq!(err.exit_status(), 2);
    }

    #[test]
    fn unknown_ids_exit_with_three() {
        let err = CliError::Store(TodoServiceError::NotFound(TodoId::new_v4()));
        assert_eq!(err.exit_status(), 3);
    }

    #[test]
    fn setup_failures_exit_with_one() {
        let db = CliError::Db(DbError::UnsupportedSchemaVersion {
            db_version: 9,
            latest_supported: 1,
        });
        assert_eq!(db.exit_status(), 1);

        let logging = CliError::Logging(LoggingError::InvalidLogDir("relative".to_string()));
        assert_eq!(logging.exit_status(), 1);
    }

    #[test]
    fn add_parses_optional_fields() {
        let cli =
            Cli::try_parse_from(["todo", "add", "Buy milk", "--status", "in_progress"]).unwrap();
        match cli.command {
            Command::Add {
                title,
                description,
                status,
            } => {
                assert_eq!(title, "Buy milk");
                assert_eq!(description, None);
                assert_eq!(status, Some(TodoStatus::InProgress));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn add_rejects_unknown_status() {
        let err = Cli::try_parse_from(["todo", "add", "Task", "--status", "archived"]).unwrap_err();
        assert!(err.to_string().contains("archived"));
    }

    #[test]
    fn list_defaults_to_creation_order() {
        let cli = Cli::try_parse_from(["todo", "list"]).unwrap();
        match cli.command {
            Command::List { sort, offset, .. } => {
                assert_eq!(sort, SortArg::CreatedAt);
                assert_eq!(offset, 0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn list_sort_uses_snake_case_names() {
        let cli = Cli::try_parse_from(["todo", "list", "--sort", "created_at_desc"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::List {
                sort: SortArg::CreatedAtDesc,
                ..
            }
        ));
    }

    #[test]
    fn get_rejects_malformed_id() {
        assert!(Cli::try_parse_from(["todo", "get", "42"]).is_err());
    }

    #[test]
    fn db_flag_is_global() {
        let cli = Cli::try_parse_from(["todo", "statuses", "--db", "/tmp/other.sqlite3"]).unwrap();
        assert_eq!(cli.db.to_str(), Some("/tmp/other.sqlite3"));
    }
}
