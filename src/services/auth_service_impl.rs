//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::Store;
use crate::domain::{UserId, UserRole};
use crate::services::auth_service::{AuthError, AuthService, LoginResult, Principal, UserInfo};

const MIN_PASSWORD_LEN: usize = 8;
const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 50;

/// Name of the account seeded by the initial migration.
pub const ADMIN_USERNAME: &str = "admin";

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    async fn ensure_username_free(&self, username: &str) -> Result<(), AuthError> {
        if self.store.get_user_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken(username.to_string()));
        }
        Ok(())
    }
}

fn validate_username(username: &str) -> Result<&str, AuthError> {
    let trimmed = username.trim();
    let len = trimmed.chars().count();

    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(AuthError::Validation(format!(
            "Username must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters"
        )));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(AuthError::Validation(
            "Username can only contain letters, numbers, dots, hyphens, and underscores"
                .to_string(),
        ));
    }

    Ok(trimmed)
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(
        &self,
        username: &str,
        password: &str,
        role: UserRole,
    ) -> Result<UserInfo, AuthError> {
        let username = validate_username(username)?;
        validate_password(password)?;
        self.ensure_username_free(username).await?;

        let user = self
            .store
            .create_user(username, password, role, &self.security)
            .await?;

        info!(
            event = "user_registered",
            user_id = user.id.value(),
            role = %user.role,
            "Registered user {}",
            user.username
        );

        Ok(UserInfo::from(user))
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError> {
        let user = self
            .store
            .verify_user_password(username, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::Inactive);
        }

        let api_key = user.api_key.clone();
        Ok(LoginResult {
            user: UserInfo::from(user),
            api_key,
        })
    }

    async fn principal_for_api_key(&self, api_key: &str) -> Result<Option<Principal>, AuthError> {
        let user = self.store.verify_api_key(api_key).await?;
        Ok(user.as_ref().map(Principal::from))
    }

    async fn principal_for_user(&self, user_id: UserId) -> Result<Option<Principal>, AuthError> {
        let user = self.store.get_user(user_id).await?;
        Ok(user.as_ref().map(Principal::from))
    }

    async fn get_user_info(&self, user_id: UserId) -> Result<UserInfo, AuthError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound(user_id))?;

        Ok(UserInfo::from(user))
    }

    async fn update_username(
        &self,
        user_id: UserId,
        username: &str,
    ) -> Result<UserInfo, AuthError> {
        let username = validate_username(username)?;

        let current = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound(user_id))?;
        if current.username == username {
            return Ok(UserInfo::from(current));
        }

        self.ensure_username_free(username).await?;

        let user = self
            .store
            .update_username(user_id, username)
            .await?
            .ok_or(AuthError::UserNotFound(user_id))?;

        info!(
            event = "username_changed",
            user_id = user_id.value(),
            "User renamed from {} to {}",
            current.username,
            user.username
        );

        Ok(UserInfo::from(user))
    }

    async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validate_password(new_password)
            .map_err(|_| AuthError::Validation("New password must be at least 8 characters".to_string()))?;

        if current_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound(user_id))?;

        if self
            .store
            .verify_user_password(&user.username, current_password)
            .await?
            .is_none()
        {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        self.store
            .update_user_password(user_id, new_password, &self.security)
            .await?;

        info!(event = "password_changed", user_id = user_id.value(), "Password changed");
        Ok(())
    }

    async fn regenerate_api_key(&self, user_id: UserId) -> Result<String, AuthError> {
        if self.store.get_user(user_id).await?.is_none() {
            return Err(AuthError::UserNotFound(user_id));
        }
        let api_key = self.store.regenerate_user_api_key(user_id).await?;
        info!(event = "api_key_regenerated", user_id = user_id.value(), "API key regenerated");
        Ok(api_key)
    }

    async fn list_users(&self) -> Result<Vec<UserInfo>, AuthError> {
        let users = self.store.list_users().await?;
        Ok(users.into_iter().map(UserInfo::from).collect())
    }

    async fn set_active(&self, user_id: UserId, is_active: bool) -> Result<UserInfo, AuthError> {
        let user = self
            .store
            .set_user_active(user_id, is_active)
            .await?
            .ok_or(AuthError::UserNotFound(user_id))?;

        info!(
            event = "user_activation_changed",
            user_id = user_id.value(),
            is_active,
            "User {} is now {}",
            user.username,
            if is_active { "active" } else { "inactive" }
        );

        Ok(UserInfo::from(user))
    }

    async fn bootstrap_admin_password(&self, password: &str) -> Result<(), AuthError> {
        validate_password(password)?;

        let admin = self
            .store
            .get_user_by_username(ADMIN_USERNAME)
            .await?
            .ok_or_else(|| AuthError::Internal("Seeded admin account is missing".to_string()))?;

        self.store
            .update_user_password(admin.id, password, &self.security)
            .await?;

        info!(event = "admin_bootstrapped", "Admin password set from configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_trimmed_and_checked() {
        assert_eq!(validate_username("  maria_1 ").unwrap(), "maria_1");
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }
}
