//! # collabtask client
//!
//! Logs in, follows the realtime channel and logs what a dashboard would
//! show.
//!
//! ## Usage
//!
//! ```bash
//! COLLABTASK_EMAIL=ada@example.com COLLABTASK_PASSWORD=secret123 \
//!     cargo run -p collabtask-client
//! ```

use std::sync::Arc;

use chrono::Utc;
use collabtask_client::config::ClientConfig;
use collabtask_client::view::{overdue_tasks, StatusCounts};
use collabtask_client::{HttpTaskApi, RealtimeClient, Reconciler, TaskApi};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collabtask_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("collabtask client v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env()?;
    let api = Arc::new(HttpTaskApi::new(config.base_url.clone()));
    let session = api.login(&config.email, &config.password).await?;

    let reconciler = Arc::new(Reconciler::new(api));
    let client = RealtimeClient::new(
        config.ws_url(&session.token),
        session.user.id,
        reconciler.clone(),
    );

    let shutdown = client.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    let result = client.run().await;

    let tasks = reconciler.tasks().await;
    let counts = StatusCounts::from_tasks(&tasks);
    tracing::info!(
        total = counts.total,
        todo = counts.todo,
        in_progress = counts.in_progress,
        completed = counts.completed,
        overdue = overdue_tasks(&tasks, Utc::now()).len(),
        notifications = reconciler.panel().await.len(),
        "Final task summary"
    );

    Ok(result?)
}
