/// In-memory store
///
/// Process-lifetime storage used when no database URL is configured and by
/// the test suites. Records live in insertion-ordered vectors behind a single
/// `tokio` read-write lock, so every call is atomic with respect to the
/// others.
///
/// Individual operations can be made to fail with
/// [`MemoryStore::inject_failure`], which is how the tests exercise the
/// best-effort side-effect path.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreOp, StoreResult};
use crate::models::{
    AuditLog, CreateUser, NewAuditLog, NewNotification, NewTask, Notification, Task, TaskStatus,
    User, UserSummary, NOTIFICATION_LIST_LIMIT,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    tasks: Vec<Task>,
    notifications: Vec<Notification>,
    audit_logs: Vec<AuditLog>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failures: RwLock<HashSet<StoreOp>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call of `op` fail with [`StoreError::Unavailable`]
    pub async fn inject_failure(&self, op: StoreOp) {
        self.failures.write().await.insert(op);
    }

    /// Removes every injected failure
    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
    }

    async fn check(&self, op: StoreOp) -> StoreResult<()> {
        if self.failures.read().await.contains(&op) {
            return Err(StoreError::Unavailable(format!("injected failure in {:?}", op)));
        }
        Ok(())
    }

    /// Number of audit entries across all tasks
    pub async fn audit_log_count(&self) -> usize {
        self.tables.read().await.audit_logs.len()
    }

    /// Number of notifications across all users
    pub async fn notification_count(&self) -> usize {
        self.tables.read().await.notifications.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        self.check(StoreOp::CreateUser).await?;
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.email == data.email) {
            return Err(StoreError::Conflict("email already exists".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.check(StoreOp::FindUser).await?;
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.check(StoreOp::FindUser).await?;
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_user_name(&self, id: Uuid, name: &str) -> StoreResult<User> {
        self.check(StoreOp::UpdateUser).await?;
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;

        user.name = name.to_string();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn find_user_summaries(&self, ids: &[Uuid]) -> StoreResult<Vec<UserSummary>> {
        self.check(StoreOp::FindUser).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .map(User::summary)
            .collect())
    }

    async fn create_task(&self, data: NewTask) -> StoreResult<Task> {
        self.check(StoreOp::CreateTask).await?;
        let mut tables = self.tables.write().await;

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            due_date: data.due_date,
            priority: data.priority,
            status: TaskStatus::Todo,
            creator_id: data.creator_id,
            assigned_to_id: data.assigned_to_id,
            revision: 1,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.push(task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        self.check(StoreOp::FindTask).await?;
        let tables = self.tables.read().await;
        Ok(tables.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Task> {
        self.check(StoreOp::UpdateTask).await?;
        let mut tables = self.tables.write().await;
        let stored = tables
            .tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or(StoreError::NotFound)?;

        if stored.revision != task.revision {
            return Err(StoreError::Conflict(format!(
                "task {} is at revision {}, update was based on {}",
                task.id, stored.revision, task.revision
            )));
        }

        stored.title = task.title.clone();
        stored.description = task.description.clone();
        stored.due_date = task.due_date;
        stored.priority = task.priority;
        stored.status = task.status;
        stored.assigned_to_id = task.assigned_to_id;
        stored.revision += 1;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        self.check(StoreOp::DeleteTask).await?;
        let mut tables = self.tables.write().await;
        let before = tables.tasks.len();
        tables.tasks.retain(|t| t.id != id);
        Ok(tables.tasks.len() < before)
    }

    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        self.check(StoreOp::ListTasks).await?;
        Ok(self.tables.read().await.tasks.clone())
    }

    async fn create_notification(&self, data: NewNotification) -> StoreResult<Notification> {
        self.check(StoreOp::CreateNotification).await?;
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            message: data.message,
            read: false,
            created_at: Utc::now(),
        };
        self.tables.write().await.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        self.check(StoreOp::ListNotifications).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .take(NOTIFICATION_LIST_LIMIT)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Notification>> {
        self.check(StoreOp::MarkNotificationRead).await?;
        let mut tables = self.tables.write().await;
        Ok(tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .map(|n| {
                n.read = true;
                n.clone()
            }))
    }

    async fn create_audit_log(&self, data: NewAuditLog) -> StoreResult<AuditLog> {
        self.check(StoreOp::CreateAuditLog).await?;
        let entry = AuditLog {
            id: Uuid::new_v4(),
            task_id: data.task_id,
            user_id: data.user_id,
            action: data.action,
            created_at: Utc::now(),
        };
        self.tables.write().await.audit_logs.push(entry.clone());
        Ok(entry)
    }

    async fn list_audit_logs(&self, task_id: Uuid) -> StoreResult<Vec<AuditLog>> {
        self.check(StoreOp::ListAuditLogs).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .audit_logs
            .iter()
            .filter(|a| a.task_id == task_id)
            .cloned()
            .collect())
    }
}
