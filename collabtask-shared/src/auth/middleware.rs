/// Request authentication
///
/// A session token is accepted from either place a client may put it:
///
/// - `Authorization: Bearer <token>` (API clients, the realtime client)
/// - the `token` cookie set at login (browsers)
///
/// The header wins when both are present. After successful authentication
/// the HTTP layer inserts an [`AuthContext`] into request extensions, where
/// handlers pick it up with axum's `Extension` extractor.
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use collabtask_shared::auth::middleware::extract_token;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=abc"));
/// assert_eq!(extract_token(&headers), Some("abc"));
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "token";

/// Identity of the authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
}

impl AuthContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Error type for request authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
            other => AuthError::InvalidToken(other.to_string()),
        }
    }
}

/// Finds the session token in the bearer header or the session cookie
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.trim());
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Validates the request's session token
///
/// # Errors
///
/// - `MissingCredentials` when neither header nor cookie carries a token
/// - `InvalidFormat` when an `Authorization` header is present but not a
///   bearer token and no cookie is available
/// - `InvalidToken` when the token fails validation
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = match extract_token(headers) {
        Some(token) => token,
        None if headers.contains_key(header::AUTHORIZATION) => {
            return Err(AuthError::InvalidFormat("Expected Bearer token".to_string()))
        }
        None => return Err(AuthError::MissingCredentials),
    };

    let claims = validate_token(token, secret)?;
    Ok(AuthContext::new(claims.sub))
}
