//! Conversation data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Default number of conversations returned by an owner query.
pub const DEFAULT_FIND_LIMIT: i64 = 5;

/// Upper bound on conversation titles, enforced both here and by the schema.
pub const MAX_TITLE_LEN: usize = 50;

/// One chat thread. The transcript itself lives in a flat file under the
/// transcripts directory; this record only carries the metadata.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    /// Auto-incrementing ID
    pub id: i64,
    /// Conversation title (bounded to 50 chars upstream)
    pub title: String,
    /// Owning user's account id
    pub owner_id: String,
    /// Backing transcript file name, derived from (owner, title)
    pub file_name: String,
    /// RFC 3339 timestamp of the last appended message
    pub last_activity: String,
}

/// Filters for looking up conversations.
///
/// With only an owner filter, results come back most-recent first and are
/// truncated to `limit`. An id filter ignores the limit.
#[derive(Debug, Clone, Default)]
pub struct ConversationFilter {
    pub owner_id: Option<String>,
    pub id: Option<i64>,
    pub limit: Option<i64>,
}

impl ConversationFilter {
    /// Filter by owning user.
    pub fn for_owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            ..Self::default()
        }
    }

    /// Filter by conversation id.
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Cap the number of results for owner queries.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}
