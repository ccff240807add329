/// Health check endpoint
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "store": "postgres",
///   "connections": 3
/// }
/// ```
///
/// `status` is `degraded` when the database does not answer.

use axum::{extract::State, Json};
use collabtask_shared::db::pool;
use serde::{Deserialize, Serialize};

use crate::{app::AppState, error::ApiResult};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,

    pub version: String,

    /// Store backend in use
    pub store: String,

    /// Open realtime connections
    pub connections: usize,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let healthy = match &state.db {
        Some(db) => pool::health_check(db).await.is_ok(),
        None => true,
    };

    Ok(Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.store.backend().to_string(),
        connections: state.registry.connection_count().await,
    }))
}
