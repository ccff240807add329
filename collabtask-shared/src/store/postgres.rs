/// PostgreSQL-backed store
///
/// Thin adapter from [`Store`] onto the SQL carried by the model types.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    AuditLog, CreateUser, NewAuditLog, NewNotification, NewTask, Notification, Task, User,
    UserSummary, NOTIFICATION_LIST_LIMIT,
};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for health checks and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_unique_violation(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("{} already exists", what))
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        User::create(&self.pool, data)
            .await
            .map_err(|e| map_unique_violation(e, "email"))
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn update_user_name(&self, id: Uuid, name: &str) -> StoreResult<User> {
        User::update_name(&self.pool, id, name)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn find_user_summaries(&self, ids: &[Uuid]) -> StoreResult<Vec<UserSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(User::summaries(&self.pool, ids).await?)
    }

    async fn create_task(&self, data: NewTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Task> {
        if let Some(updated) = Task::update_if_revision(&self.pool, task).await? {
            return Ok(updated);
        }

        // Zero rows: tell a vanished task apart from a stale revision
        match Task::find_by_id(&self.pool, task.id).await? {
            None => Err(StoreError::NotFound),
            Some(current) => Err(StoreError::Conflict(format!(
                "task {} is at revision {}, update was based on {}",
                task.id, current.revision, task.revision
            ))),
        }
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        Ok(Task::list_all(&self.pool).await?)
    }

    async fn create_notification(&self, data: NewNotification) -> StoreResult<Notification> {
        Ok(Notification::create(&self.pool, data).await?)
    }

    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        Ok(Notification::list_for_user(&self.pool, user_id, NOTIFICATION_LIST_LIMIT as i64).await?)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Notification>> {
        Ok(Notification::mark_read(&self.pool, id, user_id).await?)
    }

    async fn create_audit_log(&self, data: NewAuditLog) -> StoreResult<AuditLog> {
        Ok(AuditLog::create(&self.pool, data).await?)
    }

    async fn list_audit_logs(&self, task_id: Uuid) -> StoreResult<Vec<AuditLog>> {
        Ok(AuditLog::list_for_task(&self.pool, task_id).await?)
    }
}
