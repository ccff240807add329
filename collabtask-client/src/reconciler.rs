/// Applies realtime events to local state
///
/// | Event | Reaction |
/// |---|---|
/// | `task:created` (task) | invalidate |
/// | `task:created` (creator notice) | notification, invalidate |
/// | `task:assigned` | notification |
/// | `task:updated` | invalidate |
/// | `task:deleted` | invalidate |
///
/// Pushed task payloads are never merged into the cache; the refetched
/// list is the only source of truth. Because nothing is replayed after a
/// disconnect, the socket calls [`Reconciler::on_connected`] on every
/// (re)connection to catch up.
///
/// # Refreshing
///
/// Handling an event never waits on HTTP. Invalidation marks the cache
/// stale and wakes [`Reconciler::run_refresher`], which fetches once for
/// however many invalidations piled up meanwhile.

use std::sync::Arc;

use collabtask_shared::events::ServerEvent;
use collabtask_shared::models::{Task, TaskDetails, TaskPatch};
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::TaskApi;
use crate::cache::TaskCache;
use crate::error::ClientResult;
use crate::notifications::{LocalNotification, NotificationCenter};

pub struct Reconciler {
    api: Arc<dyn TaskApi>,
    cache: Mutex<TaskCache>,
    notifications: Mutex<NotificationCenter>,
    refresh_requested: Notify,
}

impl Reconciler {
    pub fn new(api: Arc<dyn TaskApi>) -> Self {
        Self {
            api,
            cache: Mutex::new(TaskCache::new()),
            notifications: Mutex::new(NotificationCenter::new()),
            refresh_requested: Notify::new(),
        }
    }

    /// Reacts to one pushed event
    pub async fn handle_event(&self, event: &ServerEvent) {
        debug!(event = event.name(), "Realtime event received");

        if let ServerEvent::TaskAssigned(notice) | ServerEvent::CreatorNotice(notice) = event {
            let notification = self.notifications.lock().await.push(&notice.message);
            info!(message = %notification.message, "Notification received");
        }

        if event.invalidates_tasks() {
            self.invalidate().await;
        }
    }

    /// Catches up after a (re)connection
    pub async fn on_connected(&self) {
        self.invalidate().await;
    }

    /// Marks the cache stale and wakes the refresher
    pub async fn invalidate(&self) {
        let generation = self.cache.lock().await.invalidate();
        debug!(generation, "Task list invalidated");
        self.refresh_requested.notify_one();
    }

    /// Refetches until cancelled, whenever the cache is invalidated
    ///
    /// A failed fetch leaves the cache stale until the next invalidation.
    pub async fn run_refresher(&self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = self.refresh_requested.notified() => {}
            }

            if let Err(e) = self.refresh_stale().await {
                warn!(error = %e, "Task list refetch failed");
            }
        }
    }

    /// Fetches the task list if the cache is stale; returns whether a
    /// fetched list was stored
    ///
    /// A response overtaken by a later invalidation is dropped; that
    /// invalidation has already requested another fetch.
    pub async fn refresh_stale(&self) -> ClientResult<bool> {
        let generation = {
            let cache = self.cache.lock().await;
            if !cache.is_stale() {
                return Ok(false);
            }
            cache.generation()
        };

        self.fetch_into_cache(generation).await
    }

    /// Invalidates the cache and refetches right away
    pub async fn refresh(&self) -> ClientResult<()> {
        let generation = self.cache.lock().await.invalidate();
        self.fetch_into_cache(generation).await?;
        Ok(())
    }

    async fn fetch_into_cache(&self, generation: u64) -> ClientResult<bool> {
        let tasks = self.api.fetch_tasks().await?;
        let count = tasks.len();

        let stored = self.cache.lock().await.complete_fetch(generation, tasks);
        if stored {
            debug!(generation, tasks = count, "Task list refreshed");
        } else {
            debug!(generation, "Discarding superseded task list");
        }

        Ok(stored)
    }

    /// Sends a patch, showing it locally before the server confirms it
    ///
    /// The local change is rolled back if the request fails. Either way the
    /// list is refetched afterwards.
    pub async fn update_task(&self, task_id: Uuid, patch: TaskPatch) -> ClientResult<Task> {
        let snapshot = self.cache.lock().await.apply_optimistic(task_id, &patch);

        let result = self.api.update_task(task_id, &patch).await;
        if let Err(e) = &result {
            warn!(task_id = %task_id, error = %e, "Update failed, rolling back");
            self.cache.lock().await.rollback(snapshot);
        }

        if let Err(e) = self.refresh().await {
            warn!(task_id = %task_id, error = %e, "Refetch after update failed");
        }

        result
    }

    pub async fn tasks(&self) -> Vec<TaskDetails> {
        self.cache.lock().await.tasks().to_vec()
    }

    pub async fn is_stale(&self) -> bool {
        self.cache.lock().await.is_stale()
    }

    pub async fn panel(&self) -> Vec<LocalNotification> {
        self.notifications.lock().await.panel().to_vec()
    }

    pub async fn toasts(&self) -> Vec<LocalNotification> {
        self.notifications.lock().await.toasts().to_vec()
    }

    pub async fn clear_panel(&self) {
        self.notifications.lock().await.clear_panel();
    }
}
