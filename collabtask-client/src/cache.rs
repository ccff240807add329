/// Local task list cache
///
/// The cache holds the last full task list fetched from the API. Pushed
/// events never edit it; they only invalidate it, and the owner refetches.
///
/// # Generations
///
/// Every invalidation bumps a generation counter. A fetch records the
/// generation it started under and its result is only stored if no
/// invalidation happened meanwhile, so a slow response can never overwrite
/// the cache with data older than an event already seen.
///
/// # Optimistic updates
///
/// ```text
/// apply_optimistic ──► (request succeeds) ──► settle (invalidate + refetch)
///        │
///        └──────────► (request fails) ──► rollback ──► settle
/// ```
///
/// `apply_optimistic` shallow-merges the patch onto the cached task and
/// returns a snapshot of the list as it was; `rollback` puts that snapshot
/// back.

use collabtask_shared::models::{TaskDetails, TaskPatch};
use uuid::Uuid;

/// Task list as it was before an optimistic patch
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub task_id: Uuid,
    previous: Option<Vec<TaskDetails>>,
}

#[derive(Debug, Default)]
pub struct TaskCache {
    tasks: Option<Vec<TaskDetails>>,
    generation: u64,
    stale: bool,
}

impl TaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached tasks; empty before the first fetch lands
    pub fn tasks(&self) -> &[TaskDetails] {
        self.tasks.as_deref().unwrap_or(&[])
    }

    pub fn get(&self, task_id: Uuid) -> Option<&TaskDetails> {
        self.tasks().iter().find(|details| details.task.id == task_id)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loaded(&self) -> bool {
        self.tasks.is_some()
    }

    /// Whether the cached list must be refetched before it can be trusted
    pub fn is_stale(&self) -> bool {
        self.stale || self.tasks.is_none()
    }

    /// Marks the list stale and returns the new generation
    pub fn invalidate(&mut self) -> u64 {
        self.generation += 1;
        self.stale = true;
        self.generation
    }

    /// Stores a fetched list if it was requested under the current
    /// generation; returns whether it was stored
    pub fn complete_fetch(&mut self, generation: u64, tasks: Vec<TaskDetails>) -> bool {
        if generation != self.generation {
            return false;
        }

        self.tasks = Some(tasks);
        self.stale = false;
        true
    }

    /// Merges `patch` onto the cached task and returns the previous list
    ///
    /// The assignee is not touched locally: only the server can resolve an
    /// email to a user.
    pub fn apply_optimistic(&mut self, task_id: Uuid, patch: &TaskPatch) -> Snapshot {
        let previous = self.tasks.clone();

        if let Some(details) = self
            .tasks
            .as_mut()
            .and_then(|tasks| tasks.iter_mut().find(|details| details.task.id == task_id))
        {
            patch.apply_to(&mut details.task);
        }

        Snapshot { task_id, previous }
    }

    /// Restores the list captured by `apply_optimistic`
    pub fn rollback(&mut self, snapshot: Snapshot) {
        self.tasks = snapshot.previous;
    }
}
