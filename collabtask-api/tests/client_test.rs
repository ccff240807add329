/// End-to-end: the realtime client against a running server

mod common;

use std::sync::Arc;

use collabtask_client::{HttpTaskApi, RealtimeClient, Reconciler, TaskApi};
use collabtask_shared::models::{TaskPatch, TaskStatus};
use common::{wait_for, TestContext};

#[tokio::test]
async fn test_client_follows_assignment_and_updates() {
    let ctx = TestContext::new().await.unwrap();
    let addr = ctx.spawn_server().await.unwrap();
    let ada = ctx.user("Ada").await.unwrap();
    ctx.user("Bob").await.unwrap();

    let api = Arc::new(HttpTaskApi::new(format!("http://{}", addr)));
    let session = api.login("bob@example.com", "secret123").await.unwrap();
    let reconciler = Arc::new(Reconciler::new(api));
    let client = RealtimeClient::new(
        format!("ws://{}/ws?token={}", addr, session.token),
        session.user.id,
        reconciler.clone(),
    );
    let shutdown = client.shutdown_token();
    let running = tokio::spawn(async move { client.run().await });

    let registry = ctx.state.registry.clone();
    let bob_id = session.user.id;
    wait_for(
        || {
            let registry = registry.clone();
            async move { registry.room_size(bob_id).await == 1 }
        },
        5,
    )
    .await
    .unwrap();

    ctx.create_task(&ada, "Deploy", "bob@example.com").await.unwrap();

    wait_for(
        || {
            let reconciler = reconciler.clone();
            async move {
                reconciler.panel().await.len() == 1 && reconciler.tasks().await.len() == 1
            }
        },
        5,
    )
    .await
    .unwrap();

    let panel = reconciler.panel().await;
    assert_eq!(panel[0].message, "You have been assigned a new task: Deploy");
    let listed = reconciler.tasks().await.remove(0);
    assert_eq!(listed.assigned_to.unwrap().email, "bob@example.com");

    let updated = reconciler
        .update_task(listed.task.id, TaskPatch::status(TaskStatus::InProgress))
        .await
        .unwrap();
    assert_eq!(updated.status, TaskStatus::InProgress);
    assert_eq!(reconciler.tasks().await[0].task.status, TaskStatus::InProgress);

    // The assignee may not retitle the task; the optimistic edit is undone
    let denied = reconciler
        .update_task(
            listed.task.id,
            TaskPatch {
                title: Some("Mine now".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(denied.is_err());
    assert_eq!(reconciler.tasks().await[0].task.title, "Deploy");

    shutdown.cancel();
    running.await.unwrap().unwrap();
}
