/// Task audit trail
///
/// Entries reference tasks by ID only, so the trail survives task deletion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Action recorded for every successful task update
pub const ACTION_TASK_UPDATED: &str = "Task updated";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub task_id: Uuid,

    /// Acting user
    pub user_id: Uuid,

    pub action: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub action: String,
}

impl AuditLog {
    pub async fn create(pool: &PgPool, data: NewAuditLog) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (task_id, user_id, action)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, user_id, action, created_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.user_id)
        .bind(data.action)
        .fetch_one(pool)
        .await
    }

    /// Audit entries of one task, oldest first
    pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, task_id, user_id, action, created_at
            FROM audit_logs
            WHERE task_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }
}
