//! User repository for database operations.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

use super::models::{CreateUserRequest, User};

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Generate a new user ID.
    fn generate_id() -> String {
        format!("usr_{}", nanoid::nanoid!(12))
    }

    /// Create a new user.
    pub async fn create(&self, request: CreateUserRequest) -> Result<User> {
        let id = Self::generate_id();
        debug!("Creating user: {} ({})", request.user_name, id);

        sqlx::query(
            r#"
            INSERT INTO users (id, user_name, first_name, last_name)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&request.user_name)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .execute(&self.pool)
        .await
        .context("inserting user")?;

        self.get(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after creation"))
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, user_name, first_name, last_name, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("fetching user")
    }

    /// Get a user by login name.
    pub async fn get_by_user_name(&self, user_name: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, user_name, first_name, last_name, created_at FROM users WHERE user_name = ?",
        )
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await
        .context("fetching user by name")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn request(name: &str) -> CreateUserRequest {
        CreateUserRequest {
            user_name: name.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_fetch_user() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool().clone());

        let user = repo.create(request("alice")).await.unwrap();
        assert!(user.id.starts_with("usr_"));

        let by_id = repo.get(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.user_name, "alice");

        let by_name = repo.get_by_user_name("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);

        assert!(repo.get_by_user_name("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_user_name_is_rejected() {
        let db = Database::in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool().clone());

        repo.create(request("alice")).await.unwrap();
        assert!(repo.create(request("alice")).await.is_err());
    }
}
