/// Account service: registration, login and profile
///
/// Password hashing runs on the blocking pool so Argon2 never stalls the
/// runtime's worker threads.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{ServiceError, ServiceResult};
use crate::auth::jwt::{create_token, Claims};
use crate::auth::password::{hash_password, verify_password};
use crate::models::{normalize_email, CreateUser, User};
use crate::store::Store;

/// Longest accepted display name, in characters
pub const MAX_NAME_LENGTH: usize = 100;

/// Display name with surrounding whitespace dropped
///
/// Registration and profile updates both go through here.
fn display_name(raw: &str) -> ServiceResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ServiceError::Validation("Name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ServiceError::Validation(format!(
            "Name must be at most {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Authenticated user plus their session token
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: User,

    #[serde(skip)]
    pub token: String,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    jwt_secret: Arc<str>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, jwt_secret: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            jwt_secret: jwt_secret.into(),
        }
    }

    /// Creates an account
    ///
    /// # Errors
    ///
    /// - `Validation` if the trimmed name is empty or too long
    /// - `Conflict` if the email is taken
    pub async fn register(&self, input: RegisterInput) -> ServiceResult<User> {
        let name = display_name(&input.name)?;
        let email = normalize_email(&input.email);
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict("User already exists".to_string()));
        }

        let password = input.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ServiceError::Internal(format!("hashing task failed: {}", e)))??;

        let user = self
            .store
            .create_user(CreateUser {
                name,
                email,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Checks credentials and issues a session token
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, input: LoginInput) -> ServiceResult<Session> {
        let email = normalize_email(&input.email);
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let password = input.password;
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| ServiceError::Internal(format!("verification task failed: {}", e)))??;

        if !matches {
            return Err(ServiceError::InvalidCredentials);
        }

        let token = create_token(&Claims::new(user.id), &self.jwt_secret)?;
        info!(user_id = %user.id, "user logged in");
        Ok(Session { user, token })
    }

    pub async fn me(&self, user_id: Uuid) -> ServiceResult<User> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    /// Changes the display name; surrounding whitespace is dropped
    ///
    /// # Errors
    ///
    /// - `Validation` if the trimmed name is empty or too long
    /// - `NotFound` if the user does not exist
    pub async fn update_profile(&self, user_id: Uuid, name: &str) -> ServiceResult<User> {
        let name = display_name(name)?;

        self.store.update_user_name(user_id, &name).await.map_err(|e| match e {
            crate::store::StoreError::NotFound => {
                ServiceError::NotFound("User not found".to_string())
            }
            other => other.into(),
        })
    }
}
