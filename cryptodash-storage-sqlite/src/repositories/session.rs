use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cryptodash_core::{
    Error, Session, UserId, repositories::SessionRepository, session::SessionToken,
};
use sqlx::SqlitePool;

use crate::{db_error, from_unix};

pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Only the token hash is stored; the plaintext token never reaches the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SqliteSession {
    token_hash: String,
    user_id: String,
    user_agent: Option<String>,
    ip_address: Option<String>,
    created_at: i64,
    last_activity: i64,
    expires_at: i64,
}

impl SqliteSession {
    fn into_session(self, token: SessionToken) -> Session {
        Session {
            token,
            token_hash: self.token_hash,
            user_id: UserId::new(&self.user_id),
            user_agent: self.user_agent,
            ip_address: self.ip_address,
            created_at: from_unix(self.created_at),
            last_activity: from_unix(self.last_activity),
            expires_at: from_unix(self.expires_at),
        }
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, session: Session) -> Result<Session, Error> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token_hash, user_id, user_agent, ip_address, created_at, last_activity, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&session.token_hash)
        .bind(session.user_id.as_str())
        .bind(&session.user_agent)
        .bind(&session.ip_address)
        .bind(session.created_at.timestamp())
        .bind(session.last_activity.timestamp())
        .bind(session.expires_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create session", e))?;

        Ok(session)
    }

    async fn find_by_token(&self, token: &SessionToken) -> Result<Option<Session>, Error> {
        let row = sqlx::query_as::<_, SqliteSession>(
            r#"
            SELECT token_hash, user_id, user_agent, ip_address, created_at, last_activity, expires_at
            FROM sessions
            WHERE token_hash = ?1
            "#,
        )
        .bind(token.token_hash())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load session", e))?;

        Ok(row
            .filter(|row| token.verify_hash(&row.token_hash))
            .map(|row| row.into_session(token.clone())))
    }

    async fn touch(
        &self,
        token: &SessionToken,
        last_activity: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE sessions SET last_activity = ?1, expires_at = ?2 WHERE token_hash = ?3")
            .bind(last_activity.timestamp())
            .bind(expires_at.timestamp())
            .bind(token.token_hash())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to touch session", e))?;

        Ok(())
    }

    async fn delete(&self, token: &SessionToken) -> Result<(), Error> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?1")
            .bind(token.token_hash())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete session", e))?;

        Ok(())
    }

    async fn delete_by_user_id(&self, user_id: &UserId) -> Result<(), Error> {
        sqlx::query("DELETE FROM sessions WHERE user_id = ?1")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete user sessions", e))?;

        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?1")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to clean up expired sessions", e))?;

        Ok(result.rows_affected())
    }
}
