#![allow(dead_code)]

/// Common test utilities for client tests
///
/// - `FakeApi`: in-memory `TaskApi` with call counters, failure switches
///   and optional gates holding updates or fetches in flight
/// - Task fixtures
/// - Polling helper

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use collabtask_client::{ClientError, ClientResult, Session, TaskApi};
use collabtask_shared::models::{Task, TaskDetails, TaskPatch, TaskPriority, TaskStatus, User};
use tokio::sync::Notify;
use uuid::Uuid;

pub fn user(name: &str) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        password_hash: String::new(),
        created_at: now,
        updated_at: now,
    }
}

pub fn task(title: &str, creator: &User, assignee: &User) -> TaskDetails {
    let now = Utc::now();
    TaskDetails {
        task: Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: String::new(),
            due_date: now + Duration::days(3),
            priority: TaskPriority::Medium,
            status: TaskStatus::Todo,
            creator_id: creator.id,
            assigned_to_id: assignee.id,
            revision: 1,
            created_at: now,
            updated_at: now,
        },
        creator: Some(creator.summary()),
        assigned_to: Some(assignee.summary()),
    }
}

#[derive(Default)]
pub struct FakeApi {
    pub tasks: Mutex<Vec<TaskDetails>>,
    pub fetches: AtomicUsize,
    pub fail_fetches: AtomicBool,
    pub fail_updates: AtomicBool,

    gated: AtomicBool,
    update_started: Notify,
    release_update: Notify,

    fetches_gated: AtomicBool,
    fetch_started: Notify,
    release_fetch: Notify,
}

impl FakeApi {
    pub fn with_tasks(tasks: Vec<TaskDetails>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            ..Default::default()
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Makes every following update wait for `release_update`
    pub fn gate_updates(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub async fn wait_for_update(&self) {
        self.update_started.notified().await;
    }

    pub fn release_update(&self) {
        self.release_update.notify_one();
    }

    /// Makes fetches wait for `release_fetch` until it is called
    pub fn gate_fetches(&self) {
        self.fetches_gated.store(true, Ordering::SeqCst);
    }

    pub async fn wait_for_fetch(&self) {
        self.fetch_started.notified().await;
    }

    /// Lets the held fetch finish and stops gating later ones
    pub fn release_fetch(&self) {
        self.fetches_gated.store(false, Ordering::SeqCst);
        self.release_fetch.notify_one();
    }

    /// Changes a task behind the client's back, as another user would
    pub fn server_side_edit(&self, task_id: Uuid, patch: &TaskPatch) -> Task {
        let mut tasks = self.tasks.lock().unwrap();
        let details = tasks
            .iter_mut()
            .find(|details| details.task.id == task_id)
            .unwrap();
        patch.apply_to(&mut details.task);
        details.task.revision += 1;
        details.task.clone()
    }
}

#[async_trait]
impl TaskApi for FakeApi {
    async fn login(&self, email: &str, _password: &str) -> ClientResult<Session> {
        let mut user = user("Someone");
        user.email = email.to_string();
        Ok(Session {
            user,
            token: "fake-token".to_string(),
        })
    }

    async fn fetch_tasks(&self) -> ClientResult<Vec<TaskDetails>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fetches_gated.load(Ordering::SeqCst) {
            self.fetch_started.notify_one();
            self.release_fetch.notified().await;
        }

        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 500,
                message: "Internal server error".to_string(),
            });
        }
        Ok(self.tasks.lock().unwrap().clone())
    }

    async fn update_task(&self, task_id: Uuid, patch: &TaskPatch) -> ClientResult<Task> {
        if self.gated.load(Ordering::SeqCst) {
            self.update_started.notify_one();
            self.release_update.notified().await;
        }

        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 409,
                message: "Task was modified concurrently".to_string(),
            });
        }

        Ok(self.server_side_edit(task_id, patch))
    }
}

/// Helper to wait for condition with timeout
pub async fn wait_for<F, Fut>(condition: F, timeout_secs: u64) -> anyhow::Result<()>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_secs(timeout_secs);

    loop {
        if condition().await {
            return Ok(());
        }

        if start.elapsed() > timeout {
            anyhow::bail!("Condition not met within {} seconds", timeout_secs);
        }

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
