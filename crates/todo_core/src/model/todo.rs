//! Todo domain model.
//!
//! # Responsibility
//! - Define the canonical Todo record and its closed status enumeration.
//! - Validate caller input (`NewTodo`, `TodoPatch`) before it reaches storage.
//! - Parse structured text payloads into typed inputs at the boundary.
//!
//! # Invariants
//! - `id` and `created_at` are assigned by the store, never by callers.
//! - `status` is always one of `open`, `in_progress`, `done`.
//! - `title` is non-empty and at most `TITLE_MAX_CHARS` characters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Maximum title length, counted in characters (not bytes).
pub const TITLE_MAX_CHARS: usize = 200;

/// Stable identifier of a Todo. Never reused after deletion.
pub type TodoId = Uuid;

/// Workflow state of a Todo. Any status may move to any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    /// Not started yet.
    #[default]
    Open,
    /// Work is in progress.
    InProgress,
    /// Completed.
    Done,
}

impl TodoStatus {
    /// All statuses in their canonical display order.
    pub const ALL: [TodoStatus; 3] = [Self::Open, Self::InProgress, Self::Done];

    /// Storage and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Human-readable label shown by the task list UI.
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "Offen",
            Self::InProgress => "In Bearbeitung",
            Self::Done => "Erledigt",
        }
    }
}

impl Display for TodoStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TodoStatus {
    type Err = TodoValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(TodoValidationError::InvalidStatus(other.to_string())),
        }
    }
}

/// Field-level validation failure for Todo input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    /// Title is missing or blank.
    EmptyTitle,
    /// Title exceeds `max` characters.
    TitleTooLong { max: usize, actual: usize },
    /// Title contains a NUL character, which SQLite text functions truncate at.
    TitleContainsNul,
    /// Status value outside the allowed set.
    InvalidStatus(String),
    /// Caller attempted to write a store-owned field.
    ImmutableField(&'static str),
    /// Payload carries a field the Todo does not have.
    UnknownField(String),
    /// Payload is not a well-formed JSON object of the expected shape.
    MalformedPayload(String),
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::TitleContainsNul => write!(f, "title must not contain NUL characters"),
            Self::TitleTooLong { max, actual } => {
                write!(f, "title must be at most {max} characters, got {actual}")
            }
            Self::InvalidStatus(value) => write!(
                f,
                "invalid status `{value}`; expected open|in_progress|done"
            ),
            Self::ImmutableField(field) => write!(f, "field `{field}` cannot be modified"),
            Self::UnknownField(field) => write!(f, "unknown field `{field}`"),
            Self::MalformedPayload(message) => write!(f, "malformed payload: {message}"),
        }
    }
}

impl Error for TodoValidationError {}

/// Canonical Todo record as owned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub status: TodoStatus,
    /// Unix epoch milliseconds, set once at creation.
    pub created_at: i64,
}

impl Todo {
    /// Builds a record from validated input, assigning a fresh id and
    /// creation timestamp.
    pub fn from_new(new: NewTodo) -> Result<Self, TodoValidationError> {
        Self::from_new_at(new, Uuid::new_v4(), now_epoch_ms())
    }

    /// Same as [`Todo::from_new`] with caller-chosen identity and time.
    ///
    /// Lets tests pin both values to get deterministic ordering.
    pub fn from_new_at(
        new: NewTodo,
        id: TodoId,
        created_at: i64,
    ) -> Result<Self, TodoValidationError> {
        let title = normalize_title(&new.title)?;
        Ok(Self {
            id,
            title,
            description: new.description.unwrap_or_default(),
            status: new.status.unwrap_or_default(),
            created_at,
        })
    }

    /// Re-checks field constraints on a full record.
    pub fn validate(&self) -> Result<(), TodoValidationError> {
        validate_title(&self.title)
    }

    /// Applies a validated patch in place. `id` and `created_at` are
    /// untouched.
    pub fn apply(&mut self, patch: &TodoPatch) -> Result<(), TodoValidationError> {
        if let Some(title) = patch.title.as_deref() {
            self.title = normalize_title(title)?;
        }
        if let Some(description) = patch.description.as_ref() {
            self.description = description.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        Ok(())
    }
}

/// Input for creating a Todo. Only `title` is required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
}

impl NewTodo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: TodoStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Parses a create payload such as
    /// `{"title": "Buy milk", "status": "open"}`.
    ///
    /// # Errors
    /// - `ImmutableField` when `id` or `created_at` is present.
    /// - `UnknownField` for any other unexpected key.
    /// - `InvalidStatus` when `status` is outside the allowed set.
    /// - `EmptyTitle` / `TitleTooLong` / `TitleContainsNul` from title
    ///   validation.
    pub fn from_json(payload: &str) -> Result<Self, TodoValidationError> {
        let fields = parse_object(payload)?;
        reject_foreign_fields(&fields)?;

        let new = Self {
            title: string_field(&fields, "title")?.unwrap_or_default(),
            description: string_field(&fields, "description")?,
            status: status_field(&fields)?,
        };
        new.validate()?;
        Ok(new)
    }

    pub fn validate(&self) -> Result<(), TodoValidationError> {
        validate_title(self.title.trim())
    }
}

/// Partial update of the mutable Todo fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
}

impl TodoPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    pub fn status(status: TodoStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Returns whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.status.is_none()
    }

    /// Parses an update payload such as `{"status": "done"}`.
    ///
    /// Absent and `null` fields are left unchanged. `id` and `created_at`
    /// are rejected with `ImmutableField`.
    pub fn from_json(payload: &str) -> Result<Self, TodoValidationError> {
        let fields = parse_object(payload)?;
        reject_foreign_fields(&fields)?;

        let patch = Self {
            title: string_field(&fields, "title")?,
            description: string_field(&fields, "description")?,
            status: status_field(&fields)?,
        };
        patch.validate()?;
        Ok(patch)
    }

    pub fn validate(&self) -> Result<(), TodoValidationError> {
        match self.title.as_deref() {
            Some(title) => validate_title(title.trim()),
            None => Ok(()),
        }
    }
}

/// Checks the title constraints: non-blank, no NUL, at most
/// `TITLE_MAX_CHARS`.
pub fn validate_title(title: &str) -> Result<(), TodoValidationError> {
    if title.contains('\0') {
        return Err(TodoValidationError::TitleContainsNul);
    }
    if title.trim().is_empty() {
        return Err(TodoValidationError::EmptyTitle);
    }
    let actual = title.chars().count();
    if actual > TITLE_MAX_CHARS {
        return Err(TodoValidationError::TitleTooLong {
            max: TITLE_MAX_CHARS,
            actual,
        });
    }
    Ok(())
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn normalize_title(title: &str) -> Result<String, TodoValidationError> {
    let trimmed = title.trim();
    validate_title(trimmed)?;
    Ok(trimmed.to_string())
}

fn parse_object(payload: &str) -> Result<Map<String, Value>, TodoValidationError> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(TodoValidationError::MalformedPayload(
            "expected a JSON object".to_string(),
        )),
        Err(err) => Err(TodoValidationError::MalformedPayload(err.to_string())),
    }
}

fn reject_foreign_fields(fields: &Map<String, Value>) -> Result<(), TodoValidationError> {
    for key in fields.keys() {
        match key.as_str() {
            "title" | "description" | "status" => {}
            "id" => return Err(TodoValidationError::ImmutableField("id")),
            "created_at" => return Err(TodoValidationError::ImmutableField("created_at")),
            other => return Err(TodoValidationError::UnknownField(other.to_string())),
        }
    }
    Ok(())
}

fn string_field(
    fields: &Map<String, Value>,
    name: &str,
) -> Result<Option<String>, TodoValidationError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(TodoValidationError::MalformedPayload(format!(
            "field `{name}` must be a string"
        ))),
    }
}

fn status_field(fields: &Map<String, Value>) -> Result<Option<TodoStatus>, TodoValidationError> {
    string_field(fields, "status")?
        .map(|value| value.parse())
        .transpose()
}
