/// Database models
///
/// Each model carries its own SQL as associated functions taking a
/// `&PgPool`. The [`crate::store`] layer wraps them behind a trait so the
/// services can also run against an in-memory store.

pub mod audit_log;
pub mod notification;
pub mod task;
pub mod user;

pub use audit_log::{AuditLog, NewAuditLog, ACTION_TASK_UPDATED};
pub use notification::{NewNotification, Notification, NOTIFICATION_LIST_LIMIT};
pub use task::{
    CreateTaskInput, NewTask, Task, TaskDetails, TaskPatch, TaskPriority, TaskStatus,
};
pub use user::{normalize_email, CreateUser, User, UserSummary};
