/// Notification endpoints
///
/// Persisted notifications are private to their owner; another user's
/// notification ID answers 404.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use collabtask_shared::auth::AuthContext;
use collabtask_shared::models::Notification;
use uuid::Uuid;

use crate::{app::AppState, error::ApiResult};

/// The caller's notifications, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(state.tasks.notifications_for(auth.user_id).await?))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(notification_id): Path<Uuid>,
) -> ApiResult<Json<Notification>> {
    let notification = state
        .tasks
        .mark_notification_read(notification_id, auth.user_id)
        .await?;
    Ok(Json(notification))
}
