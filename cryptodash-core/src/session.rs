//! Server-side sessions.
//!
//! A session binds an opaque random token (held by the client in a cookie) to
//! one user. Only the SHA-256 hash of the token is stored.
//!
//! | Field           | Type             | Description                                          |
//! | --------------- | ---------------- | ---------------------------------------------------- |
//! | `token`         | `SessionToken`   | Plaintext token; only known to the client.           |
//! | `token_hash`    | `String`         | Hex SHA-256 of the token; the storage key.           |
//! | `user_id`       | `UserId`         | Owner of the session.                                |
//! | `user_agent`    | `Option<String>` | User agent of the client that created the session.   |
//! | `ip_address`    | `Option<String>` | IP address of the client that created the session.   |
//! | `created_at`    | `DateTime`       | When the session was created.                        |
//! | `last_activity` | `DateTime`       | Last authenticated request seen for the session.     |
//! | `expires_at`    | `DateTime`       | `last_activity` plus the session lifetime.           |
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    crypto::{generate_secure_token, hash_token, verify_token_hash},
    user::UserId,
};

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: &str) -> Self {
        Self(token.to_string())
    }

    pub fn new_random() -> Self {
        Self(generate_secure_token())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Hex SHA-256 of the token, used as the storage key.
    pub fn token_hash(&self) -> String {
        hash_token(&self.0)
    }

    /// Constant-time check of this token against a stored hash.
    pub fn verify_hash(&self, stored_hash: &str) -> bool {
        verify_token_hash(&self.0, stored_hash)
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub token_hash: String,
    pub user_id: UserId,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        user_id: UserId,
        user_agent: Option<String>,
        ip_address: Option<String>,
        lifetime: Duration,
    ) -> Self {
        let now = Utc::now();
        let token = SessionToken::new_random();
        Self {
            token_hash: token.token_hash(),
            token,
            user_id,
            user_agent,
            ip_address,
            created_at: now,
            last_activity: now,
            expires_at: now + lifetime,
        }
    }

    /// True when the gap since the last request exceeds `lifetime`, or the
    /// absolute expiry has passed.
    pub fn is_idle(&self, now: DateTime<Utc>, lifetime: Duration) -> bool {
        now - self.last_activity > lifetime || self.expires_at < now
    }

    /// Slide the window forward to `now`.
    pub fn touch(&mut self, now: DateTime<Utc>, lifetime: Duration) {
        self.last_activity = now;
        self.expires_at = now + lifetime;
    }
}
