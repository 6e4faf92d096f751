use crate::{Error, Session, UserId, session::SessionToken};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository for session data access
#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    /// Create a new session
    async fn create(&self, session: Session) -> Result<Session, Error>;

    /// Find a session by token
    async fn find_by_token(&self, token: &SessionToken) -> Result<Option<Session>, Error>;

    /// Record activity on a session, sliding its expiry
    async fn touch(
        &self,
        token: &SessionToken,
        last_activity: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error>;

    /// Delete a session by token
    async fn delete(&self, token: &SessionToken) -> Result<(), Error>;

    /// Delete all sessions for a user
    async fn delete_by_user_id(&self, user_id: &UserId) -> Result<(), Error>;

    /// Remove sessions past their expiry, returning how many were removed
    async fn cleanup_expired(&self) -> Result<u64, Error>;
}
