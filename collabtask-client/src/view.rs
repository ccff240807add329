/// Dashboard view over the cached task list
///
/// Filtering and ordering happen client-side; the server returns tasks
/// unordered.

use chrono::{DateTime, Utc};
use collabtask_shared::models::{TaskDetails, TaskPriority, TaskStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

impl TaskFilter {
    pub fn matches(&self, details: &TaskDetails) -> bool {
        self.status.map_or(true, |status| details.task.status == status)
            && self
                .priority
                .map_or(true, |priority| details.task.priority == priority)
    }
}

/// Tasks passing `filter`, earliest due date first
pub fn visible_tasks<'a>(tasks: &'a [TaskDetails], filter: &TaskFilter) -> Vec<&'a TaskDetails> {
    let mut visible: Vec<_> = tasks.iter().filter(|details| filter.matches(details)).collect();
    visible.sort_by_key(|details| details.task.due_date);
    visible
}

/// Past due and not completed
pub fn is_overdue(details: &TaskDetails, now: DateTime<Utc>) -> bool {
    details.task.due_date < now && details.task.status != TaskStatus::Completed
}

pub fn overdue_tasks(tasks: &[TaskDetails], now: DateTime<Utc>) -> Vec<&TaskDetails> {
    tasks.iter().filter(|details| is_overdue(details, now)).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub review: usize,
    pub completed: usize,
}

impl StatusCounts {
    pub fn from_tasks(tasks: &[TaskDetails]) -> Self {
        tasks.iter().fold(Self::default(), |mut counts, details| {
            counts.total += 1;
            match details.task.status {
                TaskStatus::Todo => counts.todo += 1,
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Review => counts.review += 1,
                TaskStatus::Completed => counts.completed += 1,
            }
            counts
        })
    }
}
