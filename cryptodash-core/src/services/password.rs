use std::sync::Arc;

use serde::Deserialize;

use crate::{
    Error, User,
    error::ConflictError,
    repositories::{PasswordRepository, UserRepository},
    services::UserService,
    user::NewUser,
    validation::{require_credentials, validate_email, validate_password},
};

/// Fields accepted by the registration endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Service for password registration and authentication
pub struct PasswordService<U: UserRepository, P: PasswordRepository> {
    user_service: Arc<UserService<U>>,
    password_repository: Arc<P>,
}

impl<U: UserRepository, P: PasswordRepository> PasswordService<U, P> {
    /// Create a new PasswordService with the given repositories
    pub fn new(user_repository: Arc<U>, password_repository: Arc<P>) -> Self {
        let user_service = Arc::new(UserService::new(user_repository));
        Self {
            user_service,
            password_repository,
        }
    }

    /// Register a new user with a password.
    ///
    /// Rules are checked in order and the first violation is returned:
    /// credentials present, password length, email format, username unique,
    /// email unique. Nothing is written unless every rule passes.
    pub async fn register_user(&self, registration: &Registration) -> Result<User, Error> {
        let (username, password) = require_credentials(
            registration.username.as_deref(),
            registration.password.as_deref(),
        )?;
        validate_password(password)?;

        let email = registration
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());
        if let Some(email) = email {
            validate_email(email)?;
        }

        if self
            .user_service
            .get_user_by_username(username)
            .await?
            .is_some()
        {
            return Err(Error::Conflict(ConflictError::UsernameTaken));
        }
        if let Some(email) = email {
            if self.user_service.get_user_by_email(email).await?.is_some() {
                return Err(Error::Conflict(ConflictError::EmailTaken));
            }
        }

        let password_hash = Self::hash_password(password)?;

        let new_user = NewUser::new(username)
            .with_email(email.map(str::to_string))
            .with_names(
                registration.first_name.clone(),
                registration.last_name.clone(),
            );
        let user = self.user_service.create_user(new_user).await?;

        self.password_repository
            .set_password_hash(&user.id, &password_hash)
            .await?;

        tracing::info!(user.id = %user.id, username = %user.username, "Registered user");
        Ok(user)
    }

    /// Check a username and password.
    ///
    /// Returns `Ok(None)` for an unknown user or a wrong password; lockout
    /// bookkeeping is left to the caller.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>, Error> {
        let Some(user) = self.user_service.get_user_by_username(username).await? else {
            return Ok(None);
        };

        let Some(password_hash) = self.password_repository.get_password_hash(&user.id).await?
        else {
            return Ok(None);
        };

        if !Self::verify_password(password, &password_hash)? {
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Hash a password using argon2
    fn hash_password(password: &str) -> Result<String, Error> {
        use password_auth::generate_hash;
        Ok(generate_hash(password))
    }

    /// Verify a password against a hash
    fn verify_password(password: &str, hash: &str) -> Result<bool, Error> {
        use password_auth::verify_password;
        Ok(verify_password(password, hash).is_ok())
    }
}
