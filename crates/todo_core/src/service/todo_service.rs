//! Todo store use-case service.
//!
//! # Responsibility
//! - Provide the create/get/list/update/delete entry points of the store.
//! - Assign `id` and `created_at` on creation; callers never supply them.
//! - Map repository errors into the store taxonomy (validation, not-found,
//!   storage).
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Logged events carry metadata only; titles and descriptions stay out of
//!   the log files.

use crate::model::todo::{NewTodo, Todo, TodoId, TodoPatch, TodoValidationError};
use crate::repo::todo_repo::{RepoError, SqliteTodoRepository, TodoListQuery, TodoRepository};
use log::{info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Todo store backed by the SQLite repository.
pub type TodoStore<'conn> = TodoService<SqliteTodoRepository<'conn>>;

pub type ServiceResult<T> = Result<T, TodoServiceError>;

/// Error surfaced by store operations.
#[derive(Debug)]
pub enum TodoServiceError {
    /// Input violates field constraints. Nothing was written.
    Validation(TodoValidationError),
    /// Referenced todo does not exist.
    NotFound(TodoId),
    /// Storage failure, propagated unchanged.
    Repo(RepoError),
}

impl TodoServiceError {
    /// Stable short code used in log events and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Repo(_) => "storage_error",
        }
    }
}

impl Display for TodoServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TodoServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for TodoServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<TodoValidationError> for TodoServiceError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Use-case service wrapper over a todo repository.
pub struct TodoService<R: TodoRepository> {
    repo: R,
}

impl<'conn> TodoService<SqliteTodoRepository<'conn>> {
    /// Builds a store over a migrated SQLite connection.
    pub fn from_connection(conn: &'conn Connection) -> ServiceResult<Self> {
        Ok(Self::new(SqliteTodoRepository::try_new(conn)?))
    }
}

impl<R: TodoRepository> TodoService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates and persists a new todo.
    ///
    /// # Contract
    /// - `description` defaults to `""`, `status` to `open`.
    /// - `id` and `created_at` are generated here.
    /// - On validation failure nothing is persisted.
    pub fn create(&self, new: NewTodo) -> ServiceResult<Todo> {
        let started_at = Instant::now();
        let result = Todo::from_new(new)
            .map_err(TodoServiceError::from)
            .and_then(|todo| {
                self.repo.create_todo(&todo)?;
                Ok(todo)
            });
        log_outcome("todo_create", started_at, &result, |todo| {
            format!("todo_id={} status={}", todo.id, todo.status)
        });
        result
    }

    /// Creates a todo from a JSON object payload.
    pub fn create_from_json(&self, payload: &str) -> ServiceResult<Todo> {
        let new = NewTodo::from_json(payload).inspect_err(|err| {
            warn!("event=todo_create module=service status=error error_code=validation_error error={err}");
        })?;
        self.create(new)
    }

    /// Returns one todo by id.
    pub fn get(&self, id: TodoId) -> ServiceResult<Todo> {
        self.repo
            .get_todo(id)?
            .ok_or(TodoServiceError::NotFound(id))
    }

    /// Lists todos matching `query`, evaluated fresh on each call.
    pub fn list(&self, query: &TodoListQuery) -> ServiceResult<Vec<Todo>> {
        let started_at = Instant::now();
        let result = self.repo.list_todos(query).map_err(TodoServiceError::from);
        log_outcome("todo_list", started_at, &result, |todos| {
            format!("count={}", todos.len())
        });
        result
    }

    /// Counts todos matching the filters of `query`.
    ///
    /// Sorting and pagination fields are ignored.
    pub fn count(&self, query: &TodoListQuery) -> ServiceResult<u64> {
        Ok(self.repo.count_todos(query)?)
    }

    /// Applies a partial update to title/description/status.
    ///
    /// Returns the record as persisted after the update.
    pub fn update(&self, id: TodoId, patch: &TodoPatch) -> ServiceResult<Todo> {
        let started_at = Instant::now();
        let result = self
            .repo
            .update_todo(id, patch)
            .map_err(TodoServiceError::from);
        log_outcome("todo_update", started_at, &result, |todo| {
            format!("todo_id={} status={}", todo.id, todo.status)
        });
        result
    }

    /// Applies an update from a JSON object payload.
    ///
    /// Payloads naming `id` or `created_at` are rejected.
    pub fn update_from_json(&self, id: TodoId, payload: &str) -> ServiceResult<Todo> {
        let patch = TodoPatch::from_json(payload).inspect_err(|err| {
            warn!("event=todo_update module=service status=error todo_id={id} error_code=validation_error error={err}");
        })?;
        self.update(id, &patch)
    }

    /// Permanently removes a todo. A second delete of the same id fails
    /// with `NotFound`.
    pub fn delete(&self, id: TodoId) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.repo.delete_todo(id).map_err(TodoServiceError::from);
        log_outcome("todo_delete", started_at, &result, |_| format!("todo_id={id}"));
        result
    }
}

fn log_outcome<T>(
    event: &str,
    started_at: Instant,
    result: &ServiceResult<T>,
    describe: impl FnOnce(&T) -> String,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(value) => info!(
            "event={event} module=service status=ok duration_ms={duration_ms} {}",
            describe(value)
        ),
        Err(err) => warn!(
            "event={event} module=service status=error duration_ms={duration_ms} error_code={} error={err}",
            err.code()
        ),
    }
}
