/// Domain events emitted by the task service
///
/// An event is produced only after the primary task write succeeded. It
/// carries everything the fan-out needs, so dispatching never reads the
/// store again.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Task;

/// Per-user notice pushed alongside a persisted notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNotice {
    /// Recipient
    pub user_id: Uuid,
    pub message: String,
}

impl TaskNotice {
    /// Notice to the assignee of a newly created task
    pub fn assigned(user_id: Uuid, title: &str) -> Self {
        Self {
            user_id,
            message: format!("You have been assigned a new task: {}", title),
        }
    }

    /// Notice to the creator of a newly created task
    pub fn created(user_id: Uuid, title: &str) -> Self {
        Self {
            user_id,
            message: format!("You created a task: {}", title),
        }
    }

    /// Notice to the new assignee after a reassignment
    pub fn reassigned(user_id: Uuid, title: &str) -> Self {
        Self {
            user_id,
            message: format!("You have been reassigned to a task: {}", title),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    TaskCreated {
        task: Task,
        assignee_notice: TaskNotice,
        creator_notice: TaskNotice,
    },

    /// `reassignment` is set when the patch carried an assignee
    TaskUpdated {
        task: Task,
        reassignment: Option<TaskNotice>,
    },

    TaskDeleted { task_id: Uuid },
}

impl DomainEvent {
    /// ID of the task the event is about
    pub fn task_id(&self) -> Uuid {
        match self {
            DomainEvent::TaskCreated { task, .. } | DomainEvent::TaskUpdated { task, .. } => task.id,
            DomainEvent::TaskDeleted { task_id } => *task_id,
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::TaskCreated { .. } => "task_created",
            DomainEvent::TaskUpdated { .. } => "task_updated",
            DomainEvent::TaskDeleted { .. } => "task_deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_messages() {
        let id = Uuid::new_v4();
        assert_eq!(
            TaskNotice::assigned(id, "Fix login").message,
            "You have been assigned a new task: Fix login"
        );
        assert_eq!(
            TaskNotice::created(id, "Fix login").message,
            "You created a task: Fix login"
        );
        assert_eq!(
            TaskNotice::reassigned(id, "Fix login").message,
            "You have been reassigned to a task: Fix login"
        );
    }

    #[test]
    fn test_notice_wire_shape() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(TaskNotice::created(id, "x")).unwrap();
        assert_eq!(json["userId"], id.to_string());
        assert_eq!(json["message"], "You created a task: x");
    }
}
