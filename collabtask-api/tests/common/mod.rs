#![allow(dead_code)]

/// Common test utilities for integration tests
///
/// - In-memory application state and router
/// - User registration and login through the HTTP API
/// - JSON request helper driving the router with `tower::ServiceExt`
/// - A real listener for WebSocket tests

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use collabtask_api::app::{build_router, AppState};
use collabtask_api::config::Config;
use collabtask_shared::models::User;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Registered user with a session token
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub state: AppState,
    pub app: axum::Router,
    pub config: Config,
}

impl TestContext {
    /// Creates a context with an empty in-memory store
    pub async fn new() -> anyhow::Result<Self> {
        let config = test_config()?;
        let state = AppState::in_memory(config.clone());
        let app = build_router(state.clone());

        Ok(Self { state, app, config })
    }

    /// Sends a JSON request and returns the status and parsed body
    ///
    /// An empty body parses as `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let response = self.send(method, uri, token, body).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, json))
    }

    /// Sends a JSON request and returns the raw response
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> anyhow::Result<axum::response::Response> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        Ok(self.app.clone().oneshot(request).await?)
    }

    /// Registers `name` as `<name>@example.com` and logs in
    pub async fn user(&self, name: &str) -> anyhow::Result<TestUser> {
        let email = format!("{}@example.com", name.to_lowercase());

        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": "secret123" })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);

        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": "secret123" })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);

        Ok(TestUser {
            user: serde_json::from_value(body["user"].clone())?,
            token: body["token"]
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("login response has no token"))?
                .to_string(),
        })
    }

    /// Creates a task through the API and returns its JSON
    pub async fn create_task(
        &self,
        creator: &TestUser,
        title: &str,
        assignee_email: &str,
    ) -> anyhow::Result<Value> {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/tasks",
                Some(&creator.token),
                Some(json!({
                    "title": title,
                    "description": "integration test",
                    "dueDate": "2030-01-01T00:00:00Z",
                    "priority": "HIGH",
                    "assignedToEmail": assignee_email,
                })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create failed: {} {}", status, body);
        Ok(body)
    }

    /// Serves the router on an ephemeral local port
    pub async fn spawn_server(&self) -> anyhow::Result<SocketAddr> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = self.app.clone();

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("test server stopped: {}", e);
            }
        });

        Ok(addr)
    }
}

pub fn test_config() -> anyhow::Result<Config> {
    let vars = HashMap::from([
        ("JWT_SECRET".to_string(), TEST_SECRET.to_string()),
        ("API_HOST".to_string(), "127.0.0.1".to_string()),
        ("API_PORT".to_string(), "0".to_string()),
    ]);
    Config::from_vars(vars)
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

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}
