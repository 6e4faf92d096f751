//! Users of the dashboard.
//!
//! | Field        | Type               | Description                                      |
//! | ------------ | ------------------ | ------------------------------------------------ |
//! | `id`         | `UserId`           | Prefixed random identifier (`usr_…`).            |
//! | `username`   | `String`           | Unique login name.                               |
//! | `email`      | `Option<String>`   | Unique when present; used for alert e-mails.     |
//! | `first_name` | `String`           | May be empty.                                    |
//! | `last_name`  | `String`           | May be empty.                                    |
//! | `avatar`     | `Option<String>`   | Path of the uploaded avatar, relative to media.  |
//! | `is_staff`   | `bool`             | Staff flag, exposed to the frontend.             |
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{generate_prefixed_id, validate_prefixed_id};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: &str) -> Self {
        UserId(id.to_string())
    }

    pub fn new_random() -> Self {
        UserId(generate_prefixed_id("usr"))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "usr")
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new_random()
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The e-mail address, or an empty string when none is set.
    pub fn email_or_empty(&self) -> &str {
        self.email.as_deref().unwrap_or_default()
    }
}

/// A user that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

impl NewUser {
    pub fn new(username: &str) -> Self {
        Self {
            id: UserId::new_random(),
            username: username.to_string(),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    /// Empty addresses are stored as no address.
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email.filter(|e| !e.is_empty());
        self
    }

    pub fn with_names(mut self, first_name: Option<String>, last_name: Option<String>) -> Self {
        self.first_name = first_name.unwrap_or_default();
        self.last_name = last_name.unwrap_or_default();
        self
    }
}

/// Partial profile update; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ProfileUpdate {
    pub fn apply(&self, user: &mut User) {
        if let Some(email) = self.email.as_ref().filter(|e| !e.is_empty()) {
            user.email = Some(email.clone());
        }
        if let Some(first_name) = &self.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = last_name.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: UserId::new_random(),
            username: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
            first_name: "Alice".to_string(),
            last_name: String::new(),
            avatar: None,
            is_staff: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_id() {
        let id = UserId::new_random();
        assert!(id.is_valid());
        assert_eq!(id.to_string(), id.as_str());
        assert!(!UserId::new("42").is_valid());
    }

    #[test]
    fn test_new_user_drops_empty_email() {
        let user = NewUser::new("bob").with_email(Some(String::new()));
        assert!(user.email.is_none());

        let user = NewUser::new("bob").with_email(Some("bob@example.com".to_string()));
        assert_eq!(user.email.as_deref(), Some("bob@example.com"));
    }

    #[test]
    fn test_profile_update_is_partial() {
        let mut user = sample_user();
        ProfileUpdate {
            email: Some(String::new()),
            first_name: None,
            last_name: Some("Smith".to_string()),
        }
        .apply(&mut user);

        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert_eq!(user.first_name, "Alice");
        assert_eq!(user.last_name, "Smith");
    }

    #[test]
    fn test_email_or_empty() {
        let mut user = sample_user();
        user.email = None;
        assert_eq!(user.email_or_empty(), "");
    }
}
