//! Repository for conversation database operations.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use super::models::{Conversation, ConversationFilter, DEFAULT_FIND_LIMIT};

/// Repository for conversation metadata.
#[derive(Debug, Clone)]
pub struct ConversationRepository {
    pool: SqlitePool,
}

impl ConversationRepository {
    /// Create a new repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new conversation with last_activity set to now.
    pub async fn insert(
        &self,
        title: &str,
        owner_id: &str,
        file_name: &str,
    ) -> Result<Conversation> {
        let last_activity = Utc::now().to_rfc3339();

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO conversations (title, owner_id, file_name, last_activity)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(title)
        .bind(owner_id)
        .bind(file_name)
        .bind(&last_activity)
        .fetch_one(&self.pool)
        .await
        .context("inserting conversation")?;

        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Conversation not found after creation"))
    }

    /// Get a conversation by id.
    pub async fn get(&self, id: i64) -> Result<Option<Conversation>> {
        sqlx::query_as::<_, Conversation>(
            "SELECT id, title, owner_id, file_name, last_activity FROM conversations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("fetching conversation")
    }

    /// Find conversations matching the filter.
    ///
    /// Owner-only queries are ordered by recency and truncated; id queries
    /// return the matching record regardless of limit.
    pub async fn find(&self, filter: &ConversationFilter) -> Result<Vec<Conversation>> {
        if let Some(id) = filter.id {
            let mut query = String::from(
                "SELECT id, title, owner_id, file_name, last_activity FROM conversations WHERE id = ?",
            );
            if filter.owner_id.is_some() {
                query.push_str(" AND owner_id = ?");
            }
            let mut q = sqlx::query_as::<_, Conversation>(&query).bind(id);
            if let Some(ref owner) = filter.owner_id {
                q = q.bind(owner);
            }
            return q.fetch_all(&self.pool).await.context("finding conversation by id");
        }

        let limit = filter.limit.unwrap_or(DEFAULT_FIND_LIMIT);
        if let Some(ref owner) = filter.owner_id {
            sqlx::query_as::<_, Conversation>(
                r#"
                SELECT id, title, owner_id, file_name, last_activity
                FROM conversations
                WHERE owner_id = ?
                ORDER BY last_activity DESC
                LIMIT ?
                "#,
            )
            .bind(owner)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("finding conversations by owner")
        } else {
            sqlx::query_as::<_, Conversation>(
                r#"
                SELECT id, title, owner_id, file_name, last_activity
                FROM conversations
                ORDER BY last_activity DESC
                LIMIT ?
                "#,
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("listing conversations")
        }
    }

    /// Delete a conversation record.
    ///
    /// Returns whether a row was actually removed.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("deleting conversation")?;
        Ok(result.rows_affected() > 0)
    }

    /// Update last_activity to now.
    pub async fn touch(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE conversations SET last_activity = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("touching conversation activity")?;
        Ok(())
    }
}
