/// Durable store abstraction
///
/// Every record the task pipeline reads or writes goes through [`Store`].
/// Two implementations ship with the crate:
///
/// - [`PgStore`]: PostgreSQL via sqlx, the production backend
/// - [`MemoryStore`]: process-lifetime maps behind a `tokio` lock, used when
///   no database is configured and throughout the test suites
///
/// Each call is atomic for the single record it touches. Nothing here spans
/// several records; callers that write a task plus its side-effect records
/// do so as separate calls.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use collabtask_shared::store::{MemoryStore, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// let tasks = store.list_tasks().await?;
/// assert!(tasks.is_empty());
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    AuditLog, CreateUser, NewAuditLog, NewNotification, NewTask, Notification, Task, User,
    UserSummary,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Record to update does not exist
    #[error("Record not found")]
    NotFound,

    /// Uniqueness or revision check failed
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend refused the call (also used for injected failures)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Store operations, used to target failure injection in [`MemoryStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    CreateUser,
    FindUser,
    UpdateUser,
    CreateTask,
    FindTask,
    UpdateTask,
    DeleteTask,
    ListTasks,
    CreateNotification,
    ListNotifications,
    MarkNotificationRead,
    CreateAuditLog,
    ListAuditLogs,
}

/// Abstract durable store for users, tasks, notifications and audit entries
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name reported by the health endpoint
    fn backend(&self) -> &'static str;

    /// Creates a user; a taken email is a [`StoreError::Conflict`]
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Renames a user; a missing user is [`StoreError::NotFound`]
    async fn update_user_name(&self, id: Uuid, name: &str) -> StoreResult<User>;

    /// Name and email of each existing user in `ids`; unknown IDs are skipped
    async fn find_user_summaries(&self, ids: &[Uuid]) -> StoreResult<Vec<UserSummary>>;

    async fn create_task(&self, data: NewTask) -> StoreResult<Task>;

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Persists `task` if the stored revision still equals `task.revision`
    ///
    /// The returned task carries the bumped revision. A missing task is
    /// [`StoreError::NotFound`]; a moved revision is [`StoreError::Conflict`].
    async fn update_task(&self, task: &Task) -> StoreResult<Task>;

    /// Deletes a task, returning whether it existed
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;

    /// All tasks in insertion order
    async fn list_tasks(&self) -> StoreResult<Vec<Task>>;

    async fn create_notification(&self, data: NewNotification) -> StoreResult<Notification>;

    /// A user's notifications, newest first
    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>>;

    /// Marks a notification read; `None` if it does not belong to `user_id`
    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Notification>>;

    async fn create_audit_log(&self, data: NewAuditLog) -> StoreResult<AuditLog>;

    /// A task's audit entries, oldest first
    async fn list_audit_logs(&self, task_id: Uuid) -> StoreResult<Vec<AuditLog>>;
}
