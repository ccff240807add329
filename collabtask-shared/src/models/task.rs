/// Task model and database operations
///
/// A task is created by one user and assigned to another (possibly the
/// same) user. The creator may edit every field; the assignee may only move
/// the status.
///
/// # Status
///
/// ```text
/// TODO → IN_PROGRESS → REVIEW → COMPLETED
/// ```
///
/// Any status may be set from any other; the workflow above is a convention
/// of the UI, not an enforced state machine.
///
/// # Revision
///
/// Every successful write bumps `revision`. Writers send back the revision
/// they read and the store refuses the write if someone else got there
/// first, closing the read-modify-write race between concurrent updates of
/// the same task.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(100) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     due_date TIMESTAMPTZ NOT NULL,
///     priority task_priority NOT NULL,
///     status task_status NOT NULL DEFAULT 'TODO',
///     creator_id UUID NOT NULL REFERENCES users(id),
///     assigned_to_id UUID NOT NULL REFERENCES users(id),
///     revision BIGINT NOT NULL DEFAULT 1,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::user::UserSummary;

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
            TaskPriority::Urgent => "URGENT",
        }
    }
}

/// Task workflow status
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Review => "REVIEW",
            TaskStatus::Completed => "COMPLETED",
        }
    }
}

/// Persisted task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Title, at most 100 characters
    pub title: String,

    /// Free-form description
    pub description: String,

    /// When the task is due
    pub due_date: DateTime<Utc>,

    pub priority: TaskPriority,

    pub status: TaskStatus,

    /// User who created the task (immutable)
    pub creator_id: Uuid,

    /// User the task is assigned to (changed only by the creator)
    pub assigned_to_id: Uuid,

    /// Optimistic concurrency version, bumped on every write
    pub revision: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether `user_id` created this task
    pub fn is_creator(&self, user_id: Uuid) -> bool {
        self.creator_id == user_id
    }

    /// Whether `user_id` is the current assignee
    pub fn is_assignee(&self, user_id: Uuid) -> bool {
        self.assigned_to_id == user_id
    }
}

/// Fully resolved row handed to the store on creation
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub priority: TaskPriority,
    pub creator_id: Uuid,
    pub assigned_to_id: Uuid,
}

/// Task creation request
///
/// `status` is accepted for wire compatibility but always ignored: new
/// tasks start in `TODO`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskInput {
    #[validate(length(min = 1, max = 100))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub due_date: DateTime<Utc>,

    pub priority: TaskPriority,

    /// Assignee, resolved to a user ID at write time
    #[validate(email)]
    pub assigned_to_email: String,

    #[serde(default)]
    pub status: Option<TaskStatus>,
}

/// Partial task update
///
/// Field presence, not value, decides which authorization rule applies:
/// every field except `status` is reserved for the creator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub assigned_to_email: Option<String>,
}

impl TaskPatch {
    /// A patch that only moves the status
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Whether the patch carries any field only the creator may change
    pub fn touches_creator_fields(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.priority.is_some()
            || self.due_date.is_some()
            || self.assigned_to_email.is_some()
    }

    /// Shallow-merges the provided scalar fields onto `task`
    ///
    /// `assigned_to_email` is not applied here; it has to be resolved to a
    /// user ID first.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
    }
}

/// Task with creator and assignee identities attached, as listed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetails {
    #[serde(flatten)]
    pub task: Task,

    /// `None` only if the user record could not be resolved
    pub creator: Option<UserSummary>,

    pub assigned_to: Option<UserSummary>,
}

const TASK_COLUMNS: &str = "id, title, description, due_date, priority, status, creator_id, \
                            assigned_to_id, revision, created_at, updated_at";

impl Task {
    /// Inserts a new task in `TODO` state
    pub async fn create(pool: &PgPool, data: NewTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (title, description, due_date, priority, status, creator_id, assigned_to_id) \
             VALUES ($1, $2, $3, $4, 'TODO', $5, $6) \
             RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(data.title)
            .bind(data.description)
            .bind(data.due_date)
            .bind(data.priority)
            .bind(data.creator_id)
            .bind(data.assigned_to_id)
            .fetch_one(pool)
            .await
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Writes every mutable field of `task` if the stored revision still
    /// equals `task.revision`
    ///
    /// Returns `None` when the row is missing or the revision moved on.
    pub async fn update_if_revision(pool: &PgPool, task: &Task) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks \
             SET title = $3, description = $4, due_date = $5, priority = $6, status = $7, \
                 assigned_to_id = $8, revision = revision + 1, updated_at = NOW() \
             WHERE id = $1 AND revision = $2 \
             RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(task.id)
            .bind(task.revision)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.due_date)
            .bind(task.priority)
            .bind(task.status)
            .bind(task.assigned_to_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists every task in creation order
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at ASC, id ASC");

        sqlx::query_as::<_, Task>(&query).fetch_all(pool).await
    }

    /// Deletes a task, returning whether a row was removed
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
