use crate::{Error, UserId};
use async_trait::async_trait;

/// Argon2 PHC strings. `User` never carries the hash; only this trait reads it.
#[async_trait]
pub trait PasswordRepository: Send + Sync + 'static {
    async fn set_password_hash(&self, user_id: &UserId, hash: &str) -> Result<(), Error>;

    /// `None` when the user has no password set
    async fn get_password_hash(&self, user_id: &UserId) -> Result<Option<String>, Error>;
}
