use crate::{Error, User, UserId, user::NewUser};
use async_trait::async_trait;

/// Repository for user data access
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Create a new user
    async fn create(&self, user: NewUser) -> Result<User, Error>;

    /// Find a user by ID
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error>;

    /// Find a user by username (exact match)
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error>;

    /// Find a user by email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error>;

    /// Users with no e-mail address, ordered by username
    async fn list_without_email(&self) -> Result<Vec<User>, Error>;

    /// Persist profile fields and avatar of an existing user
    async fn update(&self, user: &User) -> Result<User, Error>;
}
