/// Task mutation service
///
/// Every mutation follows the same sequence:
///
/// 1. authorization and field rules, against the stored task
/// 2. the primary task write
/// 3. side-effect writes (notifications, audit entry)
/// 4. fan-out of the resulting domain event
///
/// Steps 1 and 2 decide the outcome. A failure there returns an error and
/// nothing is broadcast. Step 3 is best-effort: each side-effect write is
/// attempted once, a failure is logged and skipped, and the mutation still
/// succeeds. Step 4 runs only after step 2 succeeded.
///
/// Updates are guarded by the task revision. Two writers that read the same
/// revision cannot both commit: the second gets [`ServiceError::Conflict`]
/// and the task keeps the first writer's values. Conflicts are not retried.
///
/// Audit entries are written for updates only, not for creation or
/// deletion.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::events::{DomainEvent, TaskNotice};
use crate::models::{
    normalize_email, AuditLog, CreateTaskInput, NewAuditLog, NewNotification, NewTask,
    Notification, Task, TaskDetails, TaskPatch, UserSummary, ACTION_TASK_UPDATED,
};
use crate::realtime::EventDispatcher;
use crate::store::{Store, StoreError};

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
    dispatcher: EventDispatcher,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>, dispatcher: EventDispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Creates a task assigned by email
    ///
    /// Any status in `input` is ignored; new tasks start in `TODO`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no user has the assignee email, or the creator is gone
    pub async fn create_task(&self, input: CreateTaskInput, creator_id: Uuid) -> ServiceResult<Task> {
        let assignee = self
            .store
            .find_user_by_email(&normalize_email(&input.assigned_to_email))
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        if self.store.find_user_by_id(creator_id).await?.is_none() {
            return Err(ServiceError::NotFound("User not found".to_string()));
        }

        let task = self
            .store
            .create_task(NewTask {
                title: input.title,
                description: input.description,
                due_date: input.due_date,
                priority: input.priority,
                creator_id,
                assigned_to_id: assignee.id,
            })
            .await?;

        info!(
            task_id = %task.id,
            creator_id = %creator_id,
            assignee_id = %assignee.id,
            "task created"
        );

        let assignee_notice = TaskNotice::assigned(assignee.id, &task.title);
        let creator_notice = TaskNotice::created(creator_id, &task.title);
        self.record_notification(&assignee_notice, task.id).await;
        self.record_notification(&creator_notice, task.id).await;

        self.dispatcher
            .dispatch(&DomainEvent::TaskCreated {
                task: task.clone(),
                assignee_notice,
                creator_notice,
            })
            .await;

        Ok(task)
    }

    /// Applies a partial update on behalf of `actor_id`
    ///
    /// The creator may change every field. The assignee may change `status`
    /// only; a patch from the assignee carrying any other field is rejected
    /// as a whole. Anyone else is rejected outright.
    ///
    /// A present `assigned_to_email` counts as a reassignment, even when it
    /// names the current assignee.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the task or the new assignee does not exist
    /// - `Forbidden` if the actor or the touched fields are not allowed
    /// - `Conflict` if the task changed since it was read
    pub async fn update_task(
        &self,
        task_id: Uuid,
        patch: TaskPatch,
        actor_id: Uuid,
    ) -> ServiceResult<Task> {
        let task = self.find_task(task_id).await?;

        let is_creator = task.is_creator(actor_id);
        if !is_creator && !task.is_assignee(actor_id) {
            return Err(ServiceError::Forbidden(
                "You do not have permission to update this task".to_string(),
            ));
        }
        if !is_creator && patch.touches_creator_fields() {
            return Err(ServiceError::Forbidden(
                "Only the task creator can edit task details".to_string(),
            ));
        }

        let mut updated = task.clone();
        let mut new_assignee = None;
        if let Some(email) = &patch.assigned_to_email {
            let user = self
                .store
                .find_user_by_email(&normalize_email(email))
                .await?
                .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
            updated.assigned_to_id = user.id;
            new_assignee = Some(user.id);
        }
        patch.apply_to(&mut updated);

        let saved = self.store.update_task(&updated).await.map_err(|e| {
            warn!(task_id = %task_id, error = %e, "task update rejected by store");
            match e {
                StoreError::NotFound => ServiceError::NotFound("Task not found".to_string()),
                other => other.into(),
            }
        })?;

        info!(
            task_id = %saved.id,
            actor_id = %actor_id,
            revision = saved.revision,
            reassigned = new_assignee.is_some(),
            "task updated"
        );

        self.record_audit(saved.id, actor_id, ACTION_TASK_UPDATED).await;

        let reassignment = new_assignee.map(|user_id| TaskNotice::reassigned(user_id, &saved.title));
        if let Some(notice) = &reassignment {
            self.record_notification(notice, saved.id).await;
        }

        self.dispatcher
            .dispatch(&DomainEvent::TaskUpdated {
                task: saved.clone(),
                reassignment,
            })
            .await;

        Ok(saved)
    }

    /// Deletes a task; only its creator may
    ///
    /// # Errors
    ///
    /// - `NotFound` if the task does not exist (or vanished concurrently)
    /// - `Forbidden` if `actor_id` is not the creator
    pub async fn delete_task(&self, task_id: Uuid, actor_id: Uuid) -> ServiceResult<()> {
        let task = self.find_task(task_id).await?;

        if !task.is_creator(actor_id) {
            return Err(ServiceError::Forbidden(
                "Only the task creator can delete this task".to_string(),
            ));
        }

        if !self.store.delete_task(task_id).await? {
            return Err(ServiceError::NotFound("Task not found".to_string()));
        }

        info!(task_id = %task_id, actor_id = %actor_id, "task deleted");

        self.dispatcher
            .dispatch(&DomainEvent::TaskDeleted { task_id })
            .await;

        Ok(())
    }

    /// Every task with its creator and assignee identities
    ///
    /// No filtering or ordering beyond the store's insertion order.
    pub async fn list_tasks(&self) -> ServiceResult<Vec<TaskDetails>> {
        let tasks = self.store.list_tasks().await?;

        let mut ids: Vec<Uuid> = tasks
            .iter()
            .flat_map(|t| [t.creator_id, t.assigned_to_id])
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let people: HashMap<Uuid, UserSummary> = self
            .store
            .find_user_summaries(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(tasks
            .into_iter()
            .map(|task| TaskDetails {
                creator: people.get(&task.creator_id).cloned(),
                assigned_to: people.get(&task.assigned_to_id).cloned(),
                task,
            })
            .collect())
    }

    /// Audit entries of a task, oldest first; kept after the task is deleted
    pub async fn task_audit_trail(&self, task_id: Uuid) -> ServiceResult<Vec<AuditLog>> {
        Ok(self.store.list_audit_logs(task_id).await?)
    }

    /// Persisted notifications of a user, newest first
    pub async fn notifications_for(&self, user_id: Uuid) -> ServiceResult<Vec<Notification>> {
        Ok(self.store.list_notifications(user_id).await?)
    }

    pub async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<Notification> {
        self.store
            .mark_notification_read(notification_id, user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Notification not found".to_string()))
    }

    async fn find_task(&self, task_id: Uuid) -> ServiceResult<Task> {
        self.store
            .find_task(task_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Task not found".to_string()))
    }

    async fn record_notification(&self, notice: &TaskNotice, task_id: Uuid) {
        let result = self
            .store
            .create_notification(NewNotification {
                user_id: notice.user_id,
                message: notice.message.clone(),
            })
            .await;

        if let Err(e) = result {
            warn!(
                task_id = %task_id,
                user_id = %notice.user_id,
                error = %e,
                "failed to persist notification, continuing"
            );
        }
    }

    async fn record_audit(&self, task_id: Uuid, user_id: Uuid, action: &str) {
        let result = self
            .store
            .create_audit_log(NewAuditLog {
                task_id,
                user_id,
                action: action.to_string(),
            })
            .await;

        if let Err(e) = result {
            warn!(
                task_id = %task_id,
                user_id = %user_id,
                error = %e,
                "failed to write audit entry, continuing"
            );
        }
    }
}
