//! MySQL adapter for user records.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{MySqlPool, mysql::MySqlPoolOptions};
use thiserror::Error;

use crate::{
    error::ApiError,
    models::{UserCreate, UserRead},
};

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGINT NOT NULL AUTO_INCREMENT,
    email VARCHAR(320) NOT NULL,
    full_name VARCHAR(200) NOT NULL,
    PRIMARY KEY (id),
    UNIQUE KEY ix_users_email (email)
)
"#;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("a user with this email already exists")]
    Duplicate,
    #[error("database unavailable: {0}")]
    Unavailable(String),
    #[error("database query failed: {0}")]
    Query(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Duplicate,
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => Self::Unavailable(err.to_string()),
            _ => Self::Query(err),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Duplicate => {
                ApiError::Conflict("A user with this email already exists".to_string())
            }
            RepositoryError::Unavailable(_) => {
                ApiError::ServiceUnavailable("Database connection unavailable".to_string())
            }
            RepositoryError::Query(e) => ApiError::internal(e.to_string()),
        }
    }
}

/// Persistence port for users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &UserCreate) -> Result<UserRead, RepositoryError>;

    async fn get(&self, id: i64) -> Result<Option<UserRead>, RepositoryError>;

    async fn list(&self, offset: u32, limit: u32) -> Result<Vec<UserRead>, RepositoryError>;

    /// Returns `false` when no row matched.
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;

    /// Round trip used by readiness checks.
    async fn check(&self) -> Result<(), RepositoryError>;
}

#[derive(Clone)]
pub struct MySqlUserRepository {
    pool: MySqlPool,
}

impl MySqlUserRepository {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, RepositoryError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Create the `users` table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl UserRepository for MySqlUserRepository {
    async fn create(&self, user: &UserCreate) -> Result<UserRead, RepositoryError> {
        let result = sqlx::query("INSERT INTO users (email, full_name) VALUES (?, ?)")
            .bind(&user.email)
            .bind(&user.full_name)
            .execute(&self.pool)
            .await?;

        Ok(UserRead {
            id: result.last_insert_id() as i64,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
        })
    }

    async fn get(&self, id: i64) -> Result<Option<UserRead>, RepositoryError> {
        let user = sqlx::query_as::<_, UserRead>(
            "SELECT id, email, full_name FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list(&self, offset: u32, limit: u32) -> Result<Vec<UserRead>, RepositoryError> {
        let users = sqlx::query_as::<_, UserRead>(
            "SELECT id, email, full_name FROM users ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn check(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
