/// Client configuration
///
/// Loaded from environment variables (with `.env` support):
///
/// - `COLLABTASK_URL` - API base URL (default `http://localhost:4000`)
/// - `COLLABTASK_EMAIL` - Login email (required)
/// - `COLLABTASK_PASSWORD` - Login password (required)

use std::env;

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:4000";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL without trailing slash
    pub base_url: String,
    pub email: String,
    pub password: String,
}

impl ClientConfig {
    pub fn from_env() -> ClientResult<Self> {
        dotenvy::dotenv().ok();

        let base_url = env::var("COLLABTASK_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let email = env::var("COLLABTASK_EMAIL")
            .map_err(|_| ClientError::Config("COLLABTASK_EMAIL must be set".to_string()))?;
        let password = env::var("COLLABTASK_PASSWORD")
            .map_err(|_| ClientError::Config("COLLABTASK_PASSWORD must be set".to_string()))?;

        Self::new(&base_url, email, password)
    }

    pub fn new(base_url: &str, email: String, password: String) -> ClientResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "COLLABTASK_URL must start with http:// or https://, got {}",
                base_url
            )));
        }

        Ok(Self {
            base_url,
            email,
            password,
        })
    }

    /// REST endpoint for `path` (which starts with `/`)
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Realtime endpoint carrying `token` as a query parameter
    pub fn ws_url(&self, token: &str) -> String {
        let ws_base = match self.base_url.strip_prefix("https://") {
            Some(rest) => format!("wss://{}", rest),
            None => format!("ws://{}", self.base_url.trim_start_matches("http://")),
        };
        format!("{}/ws?token={}", ws_base, token)
    }
}
