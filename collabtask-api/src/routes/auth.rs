/// Authentication endpoints
///
/// - `POST /api/auth/register` - Create an account
/// - `POST /api/auth/login` - Check credentials, set the session cookie
/// - `POST /api/auth/logout` - Clear the session cookie
/// - `GET  /api/auth/me` - Current user
/// - `PUT  /api/auth/profile` - Rename the current user
///
/// Login returns the token in the body as well as in the cookie, so
/// non-browser clients can send it as a bearer token.

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    Extension, Json,
};
use collabtask_shared::auth::jwt::SESSION_TTL_DAYS;
use collabtask_shared::auth::middleware::SESSION_COOKIE;
use collabtask_shared::auth::AuthContext;
use collabtask_shared::models::User;
use collabtask_shared::service::{LoginInput, RegisterInput};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Response carrying a user and a status message
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: String,
}

/// Builds the `Set-Cookie` value for a session token
///
/// An empty token with zero max-age clears the cookie.
fn session_cookie(token: &str, max_age_seconds: i64, secure: bool) -> ApiResult<HeaderValue> {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age_seconds
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::InternalError(format!("Invalid cookie value: {}", e)))
}

/// Register a new user
///
/// # Errors
///
/// - `409 Conflict`: Email already registered
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterInput>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    req.validate()?;

    let user = state.accounts.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "User registered".to_string(),
            user,
        }),
    ))
}

/// Log in and receive the session cookie
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginInput>,
) -> ApiResult<([(header::HeaderName, HeaderValue); 1], Json<LoginResponse>)> {
    req.validate()?;

    let session = state.accounts.login(req).await?;
    let cookie = session_cookie(
        &session.token,
        SESSION_TTL_DAYS * 24 * 60 * 60,
        state.config.api.secure_cookies,
    )?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            message: "Login successful".to_string(),
            user: session.user,
            token: session.token,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
) -> ApiResult<([(header::HeaderName, HeaderValue); 1], Json<MessageResponse>)> {
    let cookie = session_cookie("", 0, state.config.api.secure_cookies)?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    ))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.accounts.me(auth.user_id).await?))
}

/// Rename the current user
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Name empty after trimming, or too long
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserResponse>> {
    req.validate()?;

    let user = state.accounts.update_profile(auth.user_id, &req.name).await?;

    Ok(Json(UserResponse {
        message: "Profile updated".to_string(),
        user,
    }))
}
