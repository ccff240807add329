/// REST access to the task API
///
/// [`TaskApi`] is the seam between the reconciler and the network: the
/// reconciler only ever logs in, refetches the full task list and sends
/// patches. [`HttpTaskApi`] implements it over `reqwest`, keeping the
/// session token from `login` and sending it as a bearer token.

use async_trait::async_trait;
use collabtask_shared::models::{Task, TaskDetails, TaskPatch, User};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};

/// Logged-in user and the token identifying their session
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub user: User,
    pub token: String,
}

#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Exchanges credentials for a session; later calls act as that user
    async fn login(&self, email: &str, password: &str) -> ClientResult<Session>;

    /// Full task list with creator and assignee attached
    async fn fetch_tasks(&self) -> ClientResult<Vec<TaskDetails>>;

    async fn update_task(&self, task_id: Uuid, patch: &TaskPatch) -> ClientResult<Task>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct HttpTaskApi {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpTaskApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn bearer(&self) -> ClientResult<String> {
        self.token
            .read()
            .await
            .clone()
            .ok_or(ClientError::NotAuthenticated)
    }

    /// Turns a non-success response into [`ClientError::Api`]
    async fn check(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn login(&self, email: &str, password: &str) -> ClientResult<Session> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let session: Session = Self::check(response).await?.json().await?;
        *self.token.write().await = Some(session.token.clone());

        tracing::info!(user_id = %session.user.id, "Logged in");
        Ok(session)
    }

    async fn fetch_tasks(&self) -> ClientResult<Vec<TaskDetails>> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(self.url("/api/tasks"))
            .bearer_auth(token)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn update_task(&self, task_id: Uuid, patch: &TaskPatch) -> ClientResult<Task> {
        let token = self.bearer().await?;
        let response = self
            .http
            .put(self.url(&format!("/api/tasks/{}", task_id)))
            .bearer_auth(token)
            .json(patch)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            tracing::debug!(task_id = %task_id, "Update lost a race with another writer");
        }

        Ok(Self::check(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_need_a_session() {
        let api = HttpTaskApi::new("http://127.0.0.1:9");

        assert!(matches!(api.fetch_tasks().await, Err(ClientError::NotAuthenticated)));
        assert!(matches!(
            api.update_task(Uuid::new_v4(), &TaskPatch::default()).await,
            Err(ClientError::NotAuthenticated)
        ));
    }
}
