/// Realtime delivery
///
/// - [`connection`]: one live client connection and its outbound buffer
/// - [`registry`]: connections and per-user rooms
/// - [`dispatcher`]: domain event → delivery plan → registry
///
/// The registry is an explicit component owned by whoever runs the server
/// and injected into the dispatcher, so tests build a fresh one each time.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use collabtask_shared::events::DomainEvent;
/// use collabtask_shared::realtime::{Connection, ConnectionRegistry, EventDispatcher, InMemoryRegistry};
/// use uuid::Uuid;
///
/// # async fn example() {
/// let registry = Arc::new(InMemoryRegistry::new());
/// let (conn, mut rx) = Connection::channel();
/// registry.connect(conn).await;
///
/// let dispatcher = EventDispatcher::new(registry);
/// dispatcher.dispatch(&DomainEvent::TaskDeleted { task_id: Uuid::new_v4() }).await;
/// assert!(rx.recv().await.is_some());
/// # }
/// ```

pub mod connection;
pub mod dispatcher;
pub mod registry;

pub use connection::{Connection, ConnectionId};
pub use dispatcher::{plan, Delivery, DeliveryReport, EventDispatcher};
pub use registry::{ConnectionRegistry, InMemoryRegistry};
