use async_trait::async_trait;
use cryptodash_core::{
    Error, User, UserId, error::StorageError, repositories::UserRepository, user::NewUser,
};
use sqlx::SqlitePool;

use crate::{db_error, from_unix, write_error};

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, avatar, is_staff, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
struct SqliteUser {
    id: String,
    username: String,
    email: Option<String>,
    first_name: String,
    last_name: String,
    avatar: Option<String>,
    is_staff: bool,
    created_at: i64,
    updated_at: i64,
}

impl From<SqliteUser> for User {
    fn from(row: SqliteUser) -> Self {
        User {
            id: UserId::new(&row.id),
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            avatar: row.avatar,
            is_staff: row.is_staff,
            created_at: from_unix(row.created_at),
            updated_at: from_unix(row.updated_at),
        }
    }
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>, Error> {
        let row = sqlx::query_as::<_, SqliteUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load user", e))?;

        Ok(row.map(User::from))
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, Error> {
        let now = chrono::Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteUser>(&format!(
            r#"
            INSERT INTO users (id, username, email, first_name, last_name, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id.as_str())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error("Failed to create user", e))?;

        tracing::debug!(user_id = %row.id, "Created user");
        Ok(row.into())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        self.find_one("id", id.as_str()).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        self.find_one("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.find_one("email", email).await
    }

    async fn list_without_email(&self) -> Result<Vec<User>, Error> {
        let rows = sqlx::query_as::<_, SqliteUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email IS NULL OR email = '' ORDER BY username"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list users", e))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update(&self, user: &User) -> Result<User, Error> {
        let now = chrono::Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteUser>(&format!(
            r#"
            UPDATE users
            SET email = ?2, first_name = ?3, last_name = ?4, avatar = ?5, updated_at = ?6
            WHERE id = ?1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id.as_str())
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.avatar)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error("Failed to update user", e))?;

        row.map(User::from)
            .ok_or(Error::Storage(StorageError::NotFound))
    }
}
