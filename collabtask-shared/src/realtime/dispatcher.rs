/// Event fan-out
///
/// Maps each domain event to a delivery plan and runs it against the
/// registry:
///
/// | Event | Deliveries, in order |
/// |---|---|
/// | task created | `task:assigned` → assignee, `task:created` (notice) → creator, `task:created` (task) → everyone |
/// | task updated | [`task:assigned` → new assignee], `task:updated` (task) → everyone |
/// | task deleted | `task:deleted` (id) → everyone |
///
/// There is no retry and no acknowledgement. Ordering holds only for
/// deliveries of one event on one connection.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::registry::ConnectionRegistry;
use crate::events::{DomainEvent, ServerEvent};

/// One step of a delivery plan
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    ToUser { user_id: Uuid, event: ServerEvent },
    Broadcast { event: ServerEvent },
}

impl Delivery {
    pub fn event(&self) -> &ServerEvent {
        match self {
            Delivery::ToUser { event, .. } | Delivery::Broadcast { event } => event,
        }
    }
}

/// Outcome of one executed delivery
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReport {
    pub delivery: Delivery,

    /// Connections that accepted the frame (0 for an offline user)
    pub recipients: usize,
}

/// Delivery plan for `event`
pub fn plan(event: &DomainEvent) -> Vec<Delivery> {
    match event {
        DomainEvent::TaskCreated {
            task,
            assignee_notice,
            creator_notice,
        } => vec![
            Delivery::ToUser {
                user_id: assignee_notice.user_id,
                event: ServerEvent::TaskAssigned(assignee_notice.clone()),
            },
            Delivery::ToUser {
                user_id: creator_notice.user_id,
                event: ServerEvent::CreatorNotice(creator_notice.clone()),
            },
            Delivery::Broadcast {
                event: ServerEvent::TaskCreated(task.clone()),
            },
        ],
        DomainEvent::TaskUpdated { task, reassignment } => {
            let mut deliveries = Vec::with_capacity(2);
            if let Some(notice) = reassignment {
                deliveries.push(Delivery::ToUser {
                    user_id: notice.user_id,
                    event: ServerEvent::TaskAssigned(notice.clone()),
                });
            }
            deliveries.push(Delivery::Broadcast {
                event: ServerEvent::TaskUpdated(task.clone()),
            });
            deliveries
        }
        DomainEvent::TaskDeleted { task_id } => vec![Delivery::Broadcast {
            event: ServerEvent::TaskDeleted(*task_id),
        }],
    }
}

/// Executes delivery plans against an injected registry
#[derive(Clone)]
pub struct EventDispatcher {
    registry: Arc<dyn ConnectionRegistry>,
}

impl EventDispatcher {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<dyn ConnectionRegistry> {
        &self.registry
    }

    /// Runs the plan for `event`, step by step, in plan order
    pub async fn dispatch(&self, event: &DomainEvent) -> Vec<DeliveryReport> {
        let deliveries = plan(event);
        let mut reports = Vec::with_capacity(deliveries.len());

        for delivery in deliveries {
            let recipients = match &delivery {
                Delivery::ToUser { user_id, event } => {
                    self.registry.send_to_user(*user_id, event).await
                }
                Delivery::Broadcast { event } => self.registry.broadcast(event).await,
            };
            reports.push(DeliveryReport {
                delivery,
                recipients,
            });
        }

        debug!(
            event = event.kind(),
            task_id = %event.task_id(),
            deliveries = reports.len(),
            recipients = reports.iter().map(|r| r.recipients).sum::<usize>(),
            "dispatched domain event"
        );
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TaskNotice;
    use crate::models::{Task, TaskPriority, TaskStatus};
    use crate::realtime::{Connection, InMemoryRegistry};
    use chrono::Utc;

    fn task(creator: Uuid, assignee: Uuid) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: "Plan sprint".to_string(),
            description: String::new(),
            due_date: now,
            priority: TaskPriority::Low,
            status: TaskStatus::Todo,
            creator_id: creator,
            assigned_to_id: assignee,
            revision: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_created_plan_order() {
        let (creator, assignee) = (Uuid::new_v4(), Uuid::new_v4());
        let task = task(creator, assignee);
        let event = DomainEvent::TaskCreated {
            task: task.clone(),
            assignee_notice: TaskNotice::assigned(assignee, &task.title),
            creator_notice: TaskNotice::created(creator, &task.title),
        };

        let steps = plan(&event);
        assert_eq!(steps.len(), 3);
        assert!(matches!(
            &steps[0],
            Delivery::ToUser { user_id, event: ServerEvent::TaskAssigned(_) } if *user_id == assignee
        ));
        assert!(matches!(
            &steps[1],
            Delivery::ToUser { user_id, event: ServerEvent::CreatorNotice(_) } if *user_id == creator
        ));
        assert_eq!(
            steps[2],
            Delivery::Broadcast { event: ServerEvent::TaskCreated(task) }
        );
    }

    #[test]
    fn test_updated_plan_with_and_without_reassignment() {
        let user = Uuid::new_v4();
        let task = task(user, user);

        let plain = plan(&DomainEvent::TaskUpdated {
            task: task.clone(),
            reassignment: None,
        });
        assert_eq!(
            plain,
            vec![Delivery::Broadcast { event: ServerEvent::TaskUpdated(task.clone()) }]
        );

        let target = Uuid::new_v4();
        let reassigned = plan(&DomainEvent::TaskUpdated {
            task: task.clone(),
            reassignment: Some(TaskNotice::reassigned(target, &task.title)),
        });
        assert_eq!(reassigned.len(), 2);
        assert!(matches!(&reassigned[0], Delivery::ToUser { user_id, .. } if *user_id == target));
        assert_eq!(reassigned[1].event().name(), "task:updated");
    }

    #[test]
    fn test_deleted_plan() {
        let id = Uuid::new_v4();
        assert_eq!(
            plan(&DomainEvent::TaskDeleted { task_id: id }),
            vec![Delivery::Broadcast { event: ServerEvent::TaskDeleted(id) }]
        );
    }

    #[tokio::test]
    async fn test_dispatch_reports_offline_user_as_zero() {
        let registry = Arc::new(InMemoryRegistry::new());
        let (watcher, mut rx) = Connection::channel();
        registry.connect(watcher).await;

        let dispatcher = EventDispatcher::new(registry);
        let (creator, assignee) = (Uuid::new_v4(), Uuid::new_v4());
        let task = task(creator, assignee);
        let reports = dispatcher
            .dispatch(&DomainEvent::TaskCreated {
                task: task.clone(),
                assignee_notice: TaskNotice::assigned(assignee, &task.title),
                creator_notice: TaskNotice::created(creator, &task.title),
            })
            .await;

        let counts: Vec<usize> = reports.iter().map(|r| r.recipients).collect();
        assert_eq!(counts, vec![0, 0, 1]);

        let frame = rx.try_recv().unwrap();
        assert_eq!(ServerEvent::decode(&frame).unwrap(), ServerEvent::TaskCreated(task));
        assert!(rx.try_recv().is_err());
    }
}
