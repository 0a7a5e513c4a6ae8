//! Domain service for authentication and user management.
//!
//! Handles registration, login, profile changes and the admin-side account
//! switches. Points are never written here; only settlement moves them.

use serde::Serialize;
use thiserror::Error;

use crate::db::User;
use crate::domain::{UserId, UserRole};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User account is inactive")]
    Inactive,

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Administrator privileges required")]
    Forbidden,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// The authenticated caller, resolved once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub role: UserRole,
    pub is_active: bool,
}

impl Principal {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// # Errors
    ///
    /// Returns [`AuthError::Forbidden`] for non-admin principals.
    pub fn require_admin(&self) -> Result<(), AuthError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            is_active: user.is_active,
        }
    }
}

/// User info DTO for responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    pub role: UserRole,
    pub points: i32,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            points: user.points,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Login result containing user info and API key.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user: UserInfo,
    pub api_key: String,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account. Public registration always passes [`UserRole::User`].
    ///
    /// # Errors
    ///
    /// - [`AuthError::Validation`] for malformed usernames or short passwords.
    /// - [`AuthError::UsernameTaken`] if the name is in use.
    async fn register(
        &self,
        username: &str,
        password: &str,
        role: UserRole,
    ) -> Result<UserInfo, AuthError>;

    /// Verifies credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails and
    /// [`AuthError::Inactive`] for disabled accounts.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Resolves an API key to its principal.
    async fn principal_for_api_key(&self, api_key: &str) -> Result<Option<Principal>, AuthError>;

    /// Resolves a session's user id to its principal.
    async fn principal_for_user(&self, user_id: UserId) -> Result<Option<Principal>, AuthError>;

    async fn get_user_info(&self, user_id: UserId) -> Result<UserInfo, AuthError>;

    async fn update_username(&self, user_id: UserId, username: &str)
    -> Result<UserInfo, AuthError>;

    /// Changes a user's password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if current password is incorrect or new password invalid.
    async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    /// Regenerates the API key for a user and returns the new one.
    async fn regenerate_api_key(&self, user_id: UserId) -> Result<String, AuthError>;

    async fn list_users(&self) -> Result<Vec<UserInfo>, AuthError>;

    /// Soft-enables or disables an account. Accounts are never deleted.
    async fn set_active(&self, user_id: UserId, is_active: bool) -> Result<UserInfo, AuthError>;

    /// Sets the password of the seeded `admin` account.
    async fn bootstrap_admin_password(&self, password: &str) -> Result<(), AuthError>;
}
