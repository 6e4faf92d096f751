use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::{
    Error, Session, UserId, error::SessionError, repositories::SessionRepository,
    session::SessionToken,
};

pub const DEFAULT_SESSION_LIFETIME_SECONDS: i64 = 1800;

/// Idle lifetime of a session. Every authenticated request slides it forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub lifetime: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime: Duration::seconds(DEFAULT_SESSION_LIFETIME_SECONDS),
        }
    }
}

impl SessionConfig {
    pub fn lifetime_seconds(&self) -> i64 {
        self.lifetime.num_seconds()
    }
}

/// Service for session management operations
pub struct SessionService<R: SessionRepository> {
    repository: Arc<R>,
    config: SessionConfig,
}

impl<R: SessionRepository> SessionService<R> {
    /// Create a new SessionService with the given repository
    pub fn new(repository: Arc<R>, config: SessionConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create a new session for a user
    pub async fn create_session(
        &self,
        user_id: &UserId,
        user_agent: Option<String>,
        ip_address: Option<String>,
    ) -> Result<Session, Error> {
        let session = Session::new(
            user_id.clone(),
            user_agent,
            ip_address,
            self.config.lifetime,
        );
        self.repository.create(session).await
    }

    /// Get a live session by token without recording activity
    pub async fn get_session(&self, token: &SessionToken) -> Result<Option<Session>, Error> {
        let session = self.repository.find_by_token(token).await?;
        Ok(session.filter(|s| !s.is_idle(Utc::now(), self.config.lifetime)))
    }

    /// Record a request on the session.
    ///
    /// A session idle for longer than the lifetime is deleted and reported as
    /// [`SessionError::Expired`]; otherwise its window slides to now.
    pub async fn touch(&self, token: &SessionToken) -> Result<Session, Error> {
        let mut session = self
            .repository
            .find_by_token(token)
            .await?
            .ok_or(Error::Session(SessionError::NotFound))?;

        let now = Utc::now();
        if session.is_idle(now, self.config.lifetime) {
            self.repository.delete(token).await?;
            tracing::info!(
                user.id = %session.user_id,
                idle_seconds = (now - session.last_activity).num_seconds(),
                "Session expired after inactivity"
            );
            return Err(Error::Session(SessionError::Expired));
        }

        session.touch(now, self.config.lifetime);
        self.repository
            .touch(token, session.last_activity, session.expires_at)
            .await?;
        Ok(session)
    }

    /// Delete a session
    pub async fn delete_session(&self, token: &SessionToken) -> Result<(), Error> {
        self.repository.delete(token).await
    }

    /// Delete all sessions for a user
    pub async fn delete_user_sessions(&self, user_id: &UserId) -> Result<(), Error> {
        self.repository.delete_by_user_id(user_id).await
    }

    /// Clean up expired sessions
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, Error> {
        self.repository.cleanup_expired().await
    }

    /// Start the background task that purges expired sessions every `period`.
    pub fn start_cleanup_task(
        &self,
        period: std::time::Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let repository = Arc::clone(&self.repository);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match repository.cleanup_expired().await {
                            Ok(count) if count > 0 => {
                                tracing::info!(count, "Cleaned up expired sessions");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to cleanup expired sessions");
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down session cleanup task");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// Sessions keyed by token hash, like the real stores.
    #[derive(Default)]
    pub(crate) struct MockSessionRepository {
        pub(crate) sessions: Mutex<HashMap<String, Session>>,
    }

    #[async_trait]
    impl SessionRepository for MockSessionRepository {
        async fn create(&self, session: Session) -> Result<Session, Error> {
            self.sessions
                .lock()
                .await
                .insert(session.token_hash.clone(), session.clone());
            Ok(session)
        }

        async fn find_by_token(&self, token: &SessionToken) -> Result<Option<Session>, Error> {
            Ok(self.sessions.lock().await.get(&token.token_hash()).cloned())
        }

        async fn touch(
            &self,
            token: &SessionToken,
            last_activity: DateTime<Utc>,
            expires_at: DateTime<Utc>,
        ) -> Result<(), Error> {
            if let Some(session) = self.sessions.lock().await.get_mut(&token.token_hash()) {
                session.last_activity = last_activity;
                session.expires_at = expires_at;
            }
            Ok(())
        }

        async fn delete(&self, token: &SessionToken) -> Result<(), Error> {
            self.sessions.lock().await.remove(&token.token_hash());
            Ok(())
        }

        async fn delete_by_user_id(&self, user_id: &UserId) -> Result<(), Error> {
            self.sessions
                .lock()
                .await
                .retain(|_, s| &s.user_id != user_id);
            Ok(())
        }

        async fn cleanup_expired(&self) -> Result<u64, Error> {
            let now = Utc::now();
            let mut sessions = self.sessions.lock().await;
            let before = sessions.len();
            sessions.retain(|_, s| s.expires_at >= now);
            Ok((before - sessions.len()) as u64)
        }
    }

    fn service() -> (
        SessionService<MockSessionRepository>,
        Arc<MockSessionRepository>,
    ) {
        let repo = Arc::new(MockSessionRepository::default());
        (
            SessionService::new(repo.clone(), SessionConfig::default()),
            repo,
        )
    }

    async fn age_session(repo: &MockSessionRepository, token: &SessionToken, by: Duration) {
        let mut sessions = repo.sessions.lock().await;
        let session = sessions.get_mut(&token.token_hash()).unwrap();
        session.last_activity -= by;
        session.expires_at -= by;
    }

    #[tokio::test]
    async fn test_touch_slides_window() {
        let (service, repo) = service();
        let session = service
            .create_session(&UserId::new_random(), None, None)
            .await
            .unwrap();

        age_session(&repo, &session.token, Duration::seconds(1000)).await;
        let touched = service.touch(&session.token).await.unwrap();

        assert!(Utc::now() - touched.last_activity < Duration::seconds(5));
        assert!(touched.expires_at - touched.last_activity == Duration::seconds(1800));
        assert!(service.get_session(&session.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_idle_session_is_invalidated() {
        let (service, repo) = service();
        let session = service
            .create_session(&UserId::new_random(), None, None)
            .await
            .unwrap();

        age_session(&repo, &session.token, Duration::seconds(1801)).await;
        let err = service.touch(&session.token).await.unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::Expired)));

        // Deleted, so the next request finds nothing at all.
        let err = service.touch(&session.token).await.unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn test_get_session_hides_idle_sessions() {
        let (service, repo) = service();
        let session = service
            .create_session(&UserId::new_random(), None, None)
            .await
            .unwrap();
        age_session(&repo, &session.token, Duration::seconds(3600)).await;
        assert!(service.get_session(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expired_sessions() {
        let (service, repo) = service();
        let stale = service
            .create_session(&UserId::new_random(), None, None)
            .await
            .unwrap();
        service
            .create_session(&UserId::new_random(), None, None)
            .await
            .unwrap();

        age_session(&repo, &stale.token, Duration::seconds(7200)).await;
        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 1);
        assert_eq!(repo.sessions.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_on_shutdown() {
        let (service, _) = service();
        let (tx, rx) = tokio::sync::watch::channel(false);
        let handle = service.start_cleanup_task(std::time::Duration::from_secs(3600), rx);
        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
