use std::sync::Arc;

use chrono::Utc;

use crate::{
    Error, User, UserId,
    error::{ConflictError, NotFoundError},
    repositories::UserRepository,
    user::{NewUser, ProfileUpdate},
    validation::validate_email,
};

/// Service for user lookup and profile management
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> UserService<R> {
    /// Create a new UserService with the given repository
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Create a new user. Uniqueness is checked by the caller.
    pub async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        self.repository.create(user).await
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, Error> {
        self.repository.find_by_id(user_id).await
    }

    /// Get a user by username
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        self.repository.find_by_username(username).await
    }

    /// Get a user by email
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.repository.find_by_email(email).await
    }

    /// Users the alert checker cannot notify
    pub async fn users_without_email(&self) -> Result<Vec<User>, Error> {
        self.repository.list_without_email().await
    }

    /// Give `username` an e-mail address.
    ///
    /// Unlike a profile update, an empty address is rejected rather than
    /// ignored. A different address already on the account is only replaced
    /// when `replace` is set.
    pub async fn set_email(
        &self,
        username: &str,
        email: &str,
        replace: bool,
    ) -> Result<User, Error> {
        validate_email(email)?;
        let user = self
            .repository
            .find_by_username(username)
            .await?
            .ok_or(Error::NotFound(NotFoundError::User))?;

        if let Some(current) = user.email.as_deref().filter(|e| !e.trim().is_empty()) {
            if !replace && current != email {
                return Err(Error::Conflict(ConflictError::EmailAlreadySet(
                    current.to_string(),
                )));
            }
        }

        let update = ProfileUpdate {
            email: Some(email.to_string()),
            ..Default::default()
        };
        self.update_profile(&user.id, &update).await
    }

    async fn require_user(&self, user_id: &UserId) -> Result<User, Error> {
        self.repository
            .find_by_id(user_id)
            .await?
            .ok_or(Error::NotFound(NotFoundError::User))
    }

    /// Apply a partial profile update.
    ///
    /// A non-empty email must be well formed and must not belong to another user.
    pub async fn update_profile(
        &self,
        user_id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<User, Error> {
        let mut user = self.require_user(user_id).await?;

        if let Some(email) = update.email.as_deref().filter(|e| !e.is_empty()) {
            validate_email(email)?;
            if let Some(owner) = self.repository.find_by_email(email).await? {
                if owner.id != user.id {
                    return Err(Error::Conflict(ConflictError::EmailInUse));
                }
            }
        }

        update.apply(&mut user);
        user.updated_at = Utc::now();
        self.repository.update(&user).await
    }

    /// Record a new avatar path (relative to the media root).
    ///
    /// Returns the updated user and the previous avatar path, if any.
    pub async fn set_avatar(
        &self,
        user_id: &UserId,
        path: &str,
    ) -> Result<(User, Option<String>), Error> {
        let mut user = self.require_user(user_id).await?;
        let previous = user.avatar.replace(path.to_string());
        user.updated_at = Utc::now();
        let user = self.repository.update(&user).await?;
        Ok((user, previous))
    }
}
