/// Configuration management for the API server
///
/// Configuration is read from environment variables (a `.env` file is
/// loaded first when present) through the `config` crate.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 4000)
/// - `DATABASE_URL`: PostgreSQL connection string (optional; without it the
///   server keeps its data in memory)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 chars)
/// - `CORS_ORIGINS`: Comma separated allowed origins, or `*`
///   (default: `http://localhost:5173,http://localhost:3000`)
/// - `SECURE_COOKIES`: Mark the session cookie `Secure` and send HSTS
///   (default: false)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use collabtask_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,

    /// `None` selects the in-memory store
    pub database: Option<DatabaseConfig>,

    pub jwt: JwtConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    /// Allowed CORS origins; `*` allows any origin without credentials
    pub cors_origins: Vec<String>,

    /// Secure session cookie and HSTS, for deployments behind HTTPS
    pub secure_cookies: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Flat view of the environment, as the `config` crate deserializes it
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default = "default_host")]
    api_host: String,

    #[serde(default = "default_port")]
    api_port: u16,

    database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    database_max_connections: u32,

    jwt_secret: Option<String>,

    cors_origins: Option<String>,

    #[serde(default)]
    secure_cookies: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_max_connections() -> u32 {
    10
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `JWT_SECRET` is missing or shorter than 32 characters
    /// - A variable has a value of the wrong type
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::load(config::Environment::default().try_parsing(true))
    }

    /// Loads configuration from an explicit variable map instead of the
    /// process environment
    pub fn from_vars(vars: HashMap<String, String>) -> anyhow::Result<Self> {
        Self::load(
            config::Environment::default()
                .try_parsing(true)
                .source(Some(vars)),
        )
    }

    fn load(environment: config::Environment) -> anyhow::Result<Self> {
        let raw: RawConfig = config::Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        let jwt_secret = raw
            .jwt_secret
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let cors_origins = raw
            .cors_origins
            .as_deref()
            .unwrap_or(DEFAULT_CORS_ORIGINS)
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        let database = raw
            .database_url
            .filter(|url| !url.trim().is_empty())
            .map(|url| DatabaseConfig {
                url,
                max_connections: raw.database_max_connections,
            });

        Ok(Self {
            api: ApiConfig {
                host: raw.api_host,
                port: raw.api_port,
                cors_origins,
                secure_cookies: raw.secure_cookies,
            },
            database,
            jwt: JwtConfig { secret: jwt_secret },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(vars(&[("JWT_SECRET", SECRET)])).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:4000");
        assert!(config.database.is_none());
        assert!(!config.api.secure_cookies);
        assert_eq!(
            config.api.cors_origins,
            vec!["http://localhost:5173", "http://localhost:3000"]
        );
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("JWT_SECRET", SECRET),
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "8080"),
            ("DATABASE_URL", "postgresql://localhost/collabtask"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("CORS_ORIGINS", "https://app.example.com, https://admin.example.com"),
            ("SECURE_COOKIES", "true"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        let database = config.database.unwrap();
        assert_eq!(database.url, "postgresql://localhost/collabtask");
        assert_eq!(database.max_connections, 4);
        assert_eq!(
            config.api.cors_origins,
            vec!["https://app.example.com", "https://admin.example.com"]
        );
        assert!(config.api.secure_cookies);
    }

    #[test]
    fn test_jwt_secret_is_required_and_long() {
        assert!(Config::from_vars(vars(&[])).is_err());
        assert!(Config::from_vars(vars(&[("JWT_SECRET", "short")])).is_err());
    }

    #[test]
    fn test_empty_database_url_means_memory() {
        let config =
            Config::from_vars(vars(&[("JWT_SECRET", SECRET), ("DATABASE_URL", "")])).unwrap();
        assert!(config.database.is_none());
    }
}
