/// Realtime client against a scripted WebSocket server
///
/// The server side is a bare tokio-tungstenite listener so each test
/// controls exactly which frames are sent and when connections drop.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use collabtask_client::{ClientError, RealtimeClient, Reconciler, ReconnectPolicy};
use collabtask_shared::events::{ClientEvent, ServerEvent, TaskNotice};
use collabtask_shared::models::{TaskPatch, TaskStatus};
use common::{task, user, wait_for, FakeApi};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use uuid::Uuid;

fn fast_policy(max_attempts: u32) -> ReconnectPolicy {
    ReconnectPolicy {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
        max_attempts,
        jitter: 0.0,
    }
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("client never connected")
        .unwrap();
    accept_async(stream).await.unwrap()
}

async fn next_text(socket: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .expect("transport error");
        if let Message::Text(text) = message {
            return text;
        }
    }
}

/// An address nothing listens on
async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

#[tokio::test]
async fn test_joins_once_per_connection_and_catches_up_after_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let ada = user("Ada");
    let details = task("Deploy", &ada, &ada);
    let api = Arc::new(FakeApi::with_tasks(vec![details.clone()]));
    let reconciler = Arc::new(Reconciler::new(api.clone()));
    let client = RealtimeClient::new(format!("ws://{}/ws?token=t", addr), ada.id, reconciler.clone())
        .with_policy(fast_policy(5));
    let shutdown = client.shutdown_token();
    let running = tokio::spawn(async move { client.run().await });

    let mut first = accept(&listener).await;
    let join = ClientEvent::decode(&next_text(&mut first).await).unwrap();
    assert_eq!(join, ClientEvent::UserJoined(ada.id));
    wait_for(|| async { api.fetch_count() == 1 }, 5).await.unwrap();
    first.close(None).await.unwrap();

    // The task changes while the client is away
    let stored = api.server_side_edit(details.task.id, &TaskPatch::status(TaskStatus::Review));

    let mut second = accept(&listener).await;
    let join = ClientEvent::decode(&next_text(&mut second).await).unwrap();
    assert_eq!(join, ClientEvent::UserJoined(ada.id));
    wait_for(
        || async { reconciler.tasks().await.first().map(|d| d.task.clone()) == Some(stored.clone()) },
        5,
    )
    .await
    .unwrap();
    assert_eq!(api.fetch_count(), 2);

    second.send(Message::Text("not an event".to_string())).await.unwrap();
    let notice = TaskNotice::reassigned(ada.id, "Deploy");
    second
        .send(Message::Text(ServerEvent::TaskAssigned(notice).encode().unwrap()))
        .await
        .unwrap();
    wait_for(|| async { reconciler.panel().await.len() == 1 }, 5)
        .await
        .unwrap();

    // Nothing else is sent on an established connection
    let extra = tokio::time::timeout(Duration::from_millis(100), second.next()).await;
    assert!(extra.is_err());

    shutdown.cancel();
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_frames_are_read_while_a_refetch_is_in_flight() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let ada = user("Ada");
    let details = task("Deploy", &ada, &ada);
    let api = Arc::new(FakeApi::with_tasks(vec![details.clone()]));
    api.gate_fetches();
    let reconciler = Arc::new(Reconciler::new(api.clone()));
    let client = RealtimeClient::new(format!("ws://{}/ws?token=t", addr), ada.id, reconciler.clone())
        .with_policy(fast_policy(5));
    let shutdown = client.shutdown_token();
    let running = tokio::spawn(async move { client.run().await });

    let mut socket = accept(&listener).await;
    next_text(&mut socket).await;
    api.wait_for_fetch().await;

    for _ in 0..20 {
        socket
            .send(Message::Text(ServerEvent::TaskUpdated(details.task.clone()).encode().unwrap()))
            .await
            .unwrap();
    }
    let notice = TaskNotice::assigned(ada.id, "Deploy");
    socket
        .send(Message::Text(ServerEvent::TaskAssigned(notice).encode().unwrap()))
        .await
        .unwrap();

    // The catch-up fetch is still held, yet the notice got through
    wait_for(|| async { reconciler.toasts().await.len() == 1 }, 5)
        .await
        .unwrap();
    assert_eq!(api.fetch_count(), 1);

    let stored = api.server_side_edit(details.task.id, &TaskPatch::status(TaskStatus::Review));
    api.release_fetch();
    wait_for(
        || async { reconciler.tasks().await.first().map(|d| d.task.clone()) == Some(stored.clone()) },
        5,
    )
    .await
    .unwrap();

    // One fetch for the whole burst, on top of the superseded one
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(api.fetch_count(), 2);
    assert!(!reconciler.is_stale().await);

    shutdown.cancel();
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let addr = dead_address().await;
    let api = Arc::new(FakeApi::default());
    let client = RealtimeClient::new(
        format!("ws://{}/ws", addr),
        Uuid::new_v4(),
        Arc::new(Reconciler::new(api.clone())),
    )
    .with_policy(fast_policy(3));

    let result = tokio::time::timeout(Duration::from_secs(10), client.run())
        .await
        .unwrap();

    assert!(matches!(result, Err(ClientError::ReconnectExhausted { attempts: 3 })));
    assert_eq!(api.fetch_count(), 0);
}

#[tokio::test]
async fn test_shutdown_interrupts_backoff() {
    let addr = dead_address().await;
    let client = RealtimeClient::new(
        format!("ws://{}/ws", addr),
        Uuid::new_v4(),
        Arc::new(Reconciler::new(Arc::new(FakeApi::default()))),
    )
    .with_policy(ReconnectPolicy {
        initial_delay: Duration::from_secs(60),
        max_delay: Duration::from_secs(60),
        ..fast_policy(5)
    });
    let shutdown = client.shutdown_token();
    let running = tokio::spawn(async move { client.run().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}
