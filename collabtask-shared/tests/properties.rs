/// Property tests for the task mutation rules
///
/// Arbitrary patches and actors are thrown at `TaskService` backed by the
/// in-memory store; the authorization rules and the create-time status
/// override must hold for every input.

use std::sync::Arc;

use chrono::{Duration, Utc};
use proptest::prelude::*;

use collabtask_shared::models::{
    CreateTaskInput, CreateUser, TaskPatch, TaskPriority, TaskStatus, User,
};
use collabtask_shared::realtime::{Connection, ConnectionRegistry, EventDispatcher, InMemoryRegistry};
use collabtask_shared::service::{ServiceError, TaskService};
use collabtask_shared::store::{MemoryStore, Store};

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(vec![
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Completed,
    ])
}

fn arb_priority() -> impl Strategy<Value = TaskPriority> {
    prop::sample::select(vec![
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Urgent,
    ])
}

fn arb_patch() -> impl Strategy<Value = TaskPatch> {
    (
        proptest::option::of("[a-zA-Z0-9 ]{1,100}"),
        proptest::option::of("[a-zA-Z0-9 ]{0,200}"),
        proptest::option::of(arb_priority()),
        proptest::option::of(arb_status()),
        proptest::option::of(-30i64..30),
        any::<bool>(),
    )
        .prop_map(|(title, description, priority, status, due_in, reassign)| TaskPatch {
            title,
            description,
            due_date: due_in.map(|days| Utc::now() + Duration::days(days)),
            priority,
            status,
            assigned_to_email: reassign.then(|| "alice@example.com".to_string()),
        })
}

/// Patch carrying at least one creator-only field
fn arb_detail_patch() -> impl Strategy<Value = TaskPatch> {
    (arb_patch(), "[a-zA-Z0-9 ]{1,100}").prop_map(|(mut patch, title)| {
        if !patch.touches_creator_fields() {
            patch.title = Some(title);
        }
        patch
    })
}

struct World {
    store: Arc<MemoryStore>,
    registry: Arc<InMemoryRegistry>,
    service: TaskService,
    alice: User,
    bob: User,
    mallory: User,
}

async fn world() -> World {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(InMemoryRegistry::new());
    let service = TaskService::new(store.clone(), EventDispatcher::new(registry.clone()));

    let mut users = Vec::new();
    for name in ["alice", "bob", "mallory"] {
        users.push(
            store
                .create_user(CreateUser {
                    name: name.to_string(),
                    email: format!("{}@example.com", name),
                    password_hash: "x".to_string(),
                })
                .await
                .unwrap(),
        );
    }
    let mallory = users.pop().unwrap();
    let bob = users.pop().unwrap();
    let alice = users.pop().unwrap();

    World {
        store,
        registry,
        service,
        alice,
        bob,
        mallory,
    }
}

fn input(title: String, status: Option<TaskStatus>, email: &str) -> CreateTaskInput {
    CreateTaskInput {
        title,
        description: String::new(),
        due_date: Utc::now() + Duration::days(1),
        priority: TaskPriority::Medium,
        assigned_to_email: email.to_string(),
        status,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whatever status the caller asks for, a new task starts in TODO
    #[test]
    fn prop_created_tasks_start_todo(
        title in "[a-zA-Z0-9 ]{1,100}",
        status in proptest::option::of(arb_status()),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let w = world().await;
            let task = w
                .service
                .create_task(input(title, status, &w.bob.email), w.alice.id)
                .await
                .unwrap();

            prop_assert_eq!(task.status, TaskStatus::Todo);
            prop_assert_eq!(task.revision, 1);
            Ok(())
        })?;
    }

    /// A user who is neither creator nor assignee never changes a task
    #[test]
    fn prop_outsider_updates_are_forbidden(patch in arb_patch()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let w = world().await;
            let task = w
                .service
                .create_task(input("Guarded".to_string(), None, &w.bob.email), w.alice.id)
                .await
                .unwrap();
            let (conn, mut rx) = Connection::channel();
            w.registry.connect(conn).await;

            let result = w.service.update_task(task.id, patch, w.mallory.id).await;

            prop_assert!(matches!(result, Err(ServiceError::Forbidden(_))));
            prop_assert_eq!(w.store.find_task(task.id).await.unwrap(), Some(task));
            prop_assert!(rx.try_recv().is_err());
            Ok(())
        })?;
    }

    /// The assignee is rejected as a whole once any creator-only field is present
    #[test]
    fn prop_assignee_detail_edits_are_forbidden(patch in arb_detail_patch()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let w = world().await;
            let task = w
                .service
                .create_task(input("Guarded".to_string(), None, &w.bob.email), w.alice.id)
                .await
                .unwrap();

            let result = w.service.update_task(task.id, patch, w.bob.id).await;

            prop_assert!(matches!(result, Err(ServiceError::Forbidden(_))));
            prop_assert_eq!(w.store.find_task(task.id).await.unwrap(), Some(task));
            prop_assert_eq!(w.store.audit_log_count().await, 0);
            Ok(())
        })?;
    }

    /// The assignee's status-only change lands and touches nothing else
    #[test]
    fn prop_assignee_status_changes_apply(status in arb_status()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let w = world().await;
            let task = w
                .service
                .create_task(input("Progress".to_string(), None, &w.bob.email), w.alice.id)
                .await
                .unwrap();

            let updated = w
                .service
                .update_task(task.id, TaskPatch::status(status), w.bob.id)
                .await
                .unwrap();

            prop_assert_eq!(updated.status, status);
            prop_assert_eq!(&updated.title, &task.title);
            prop_assert_eq!(updated.assigned_to_id, task.assigned_to_id);
            prop_assert_eq!(updated.revision, task.revision + 1);
            Ok(())
        })?;
    }

    /// Listing twice without a mutation in between yields the same result
    #[test]
    fn prop_list_is_idempotent(titles in prop::collection::vec("[a-zA-Z0-9 ]{1,40}", 0..8)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let w = world().await;
            for title in titles.iter() {
                w.service
                    .create_task(input(title.clone(), None, &w.bob.email), w.alice.id)
                    .await
                    .unwrap();
            }

            let first = w.service.list_tasks().await.unwrap();
            let second = w.service.list_tasks().await.unwrap();

            prop_assert_eq!(first.len(), titles.len());
            prop_assert_eq!(first, second);
            Ok(())
        })?;
    }
}
