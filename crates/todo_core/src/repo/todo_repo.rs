//! Todo repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the canonical `todos` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths validate input before any SQL mutation.
//! - Read paths reject invalid persisted state instead of masking it.
//! - `update_todo` never writes `id` or `created_at`.

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::todo::{Todo, TodoId, TodoPatch, TodoStatus, TodoValidationError};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TODO_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    status,
    created_at
FROM todos";

const REQUIRED_TODO_COLUMNS: &[&str] = &["id", "title", "description", "status", "created_at"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for todo persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(TodoValidationError),
    Db(DbError),
    NotFound(TodoId),
    InvalidData(String),
    /// Connection was not migrated to the schema this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} is behind required {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TodoValidationError> for RepoError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Ordering applied by `list_todos`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TodoSort {
    /// Oldest first; ties broken by id.
    #[default]
    CreatedAt,
    /// Newest first; ties broken by id.
    CreatedAtDesc,
    Id,
    /// Case-insensitive title order.
    Title,
    /// Workflow order: open, in_progress, done.
    Status,
}

impl TodoSort {
    fn order_by_sql(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at ASC, id ASC",
            Self::CreatedAtDesc => "created_at DESC, id ASC",
            Self::Id => "id ASC",
            Self::Title => "title COLLATE NOCASE ASC, created_at ASC, id ASC",
            Self::Status => {
                "CASE status WHEN 'open' THEN 0 WHEN 'in_progress' THEN 1 ELSE 2 END ASC, \
                 created_at ASC, id ASC"
            }
        }
    }
}

/// Query options for listing todos.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoListQuery {
    pub status: Option<TodoStatus>,
    /// Title substring match, ASCII case-insensitive.
    pub search: Option<String>,
    pub sort: TodoSort,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for todo CRUD operations.
pub trait TodoRepository {
    fn create_todo(&self, todo: &Todo) -> RepoResult<TodoId>;
    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>>;
    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<Vec<Todo>>;
    fn count_todos(&self, query: &TodoListQuery) -> RepoResult<u64>;
    fn update_todo(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<Todo>;
    fn delete_todo(&self, id: TodoId) -> RepoResult<()>;
}

/// SQLite-backed todo repository.
pub struct SqliteTodoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTodoRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   does not match what this repository reads and writes.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TodoRepository for SqliteTodoRepository<'_> {
    fn create_todo(&self, todo: &Todo) -> RepoResult<TodoId> {
        todo.validate()?;

        self.conn.execute(
            "INSERT INTO todos (
                id,
                title,
                description,
                status,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                todo.id.to_string(),
                todo.title.as_str(),
                todo.description.as_str(),
                todo.status.as_str(),
                todo.created_at,
            ],
        )?;

        Ok(todo.id)
    }

    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>> {
        select_todo(self.conn, id)
    }

    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<Vec<Todo>> {
        let (filter_sql, mut bind_values) = filter_clause(query);
        let mut sql = format!(
            "{TODO_SELECT_SQL}{filter_sql} ORDER BY {}",
            query.sort.order_by_sql()
        );

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut todos = Vec::new();

        while let Some(row) = rows.next()? {
            todos.push(parse_todo_row(row)?);
        }

        Ok(todos)
    }

    fn count_todos(&self, query: &TodoListQuery) -> RepoResult<u64> {
        let (filter_sql, bind_values) = filter_clause(query);
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM todos{filter_sql};"),
            params_from_iter(bind_values),
            |row| row.get(0),
        )?;

        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative todo count `{count}`")))
    }

    fn update_todo(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<Todo> {
        patch.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let mut todo = select_todo(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        if patch.is_empty() {
            return Ok(todo);
        }

        todo.apply(patch)?;
        tx.execute(
            "UPDATE todos
             SET
                title = ?1,
                description = ?2,
                status = ?3
             WHERE id = ?4;",
            params![
                todo.title.as_str(),
                todo.description.as_str(),
                todo.status.as_str(),
                id.to_string(),
            ],
        )?;
        tx.commit()?;

        Ok(todo)
    }

    fn delete_todo(&self, id: TodoId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM todos WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn select_todo(conn: &Connection, id: TodoId) -> RepoResult<Option<Todo>> {
    let mut stmt = conn.prepare(&format!("{TODO_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_todo_row(row)?));
    }

    Ok(None)
}

fn filter_clause(query: &TodoListQuery) -> (String, Vec<Value>) {
    let mut sql = String::from(" WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(status) = query.status {
        sql.push_str(" AND status = ?");
        bind_values.push(Value::Text(status.as_str().to_string()));
    }

    if let Some(search) = query.search.as_deref().map(str::trim) {
        if !search.is_empty() {
            sql.push_str(" AND instr(lower(title), lower(?)) > 0");
            bind_values.push(Value::Text(search.to_string()));
        }
    }

    (sql, bind_values)
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<Todo> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in todos.id"))
    })?;

    let status_text: String = row.get("status")?;
    let status = status_text.parse::<TodoStatus>().map_err(|_| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in todos.status"))
    })?;

    let todo = Todo {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        status,
        created_at: row.get("created_at")?,
    };
    todo.validate().map_err(|err| {
        RepoError::InvalidData(format!("todo {id} violates field constraints: {err}"))
    })?;
    Ok(todo)
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'todos';",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some();
    if !table_exists {
        return Err(RepoError::MissingRequiredTable("todos"));
    }

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('todos');")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    for &column in REQUIRED_TODO_COLUMNS {
        if !columns.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: "todos",
                column,
            });
        }
    }

    Ok(())
}
