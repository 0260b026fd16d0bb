//! Conversation store: metadata CRUD plus the file-backed transcript.
//!
//! Commands here match the fail-closed contract of the HTTP layer: errors
//! are caught at this boundary and reported as `None`/`false`/empty rather
//! than propagated, so a failed command surfaces as "nothing happened".

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::dispatch::{ChatEvent, EventDispatcher};
use crate::transcript::{self, Message};
use crate::user::User;

use super::models::{Conversation, ConversationFilter};
use super::repository::ConversationRepository;

/// Service over conversation metadata and transcript files.
#[derive(Clone)]
pub struct ConversationStore {
    repo: ConversationRepository,
    transcripts_dir: PathBuf,
    dispatcher: Arc<EventDispatcher>,
}

impl ConversationStore {
    /// Create a new store writing transcripts under `transcripts_dir`.
    pub fn new(
        repo: ConversationRepository,
        transcripts_dir: PathBuf,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            repo,
            transcripts_dir,
            dispatcher,
        }
    }

    /// Derive the backing file name for a conversation.
    ///
    /// Hashing the owner name and title separately keeps the mapping stable
    /// and filename-safe no matter what characters they contain, and makes
    /// collisions across different (owner, title) pairs negligible. The same
    /// pair always maps to the same file.
    pub fn transcript_file_name(owner_name: &str, title: &str) -> String {
        let owner_hash = hex::encode(Sha256::digest(owner_name.as_bytes()));
        let title_hash = hex::encode(Sha256::digest(title.as_bytes()));
        format!("{owner_hash}__{title_hash}.txt")
    }

    /// Absolute path of a conversation's transcript file.
    fn transcript_path(&self, conversation: &Conversation) -> PathBuf {
        self.transcripts_dir.join(&conversation.file_name)
    }

    /// Create a new conversation owned by `owner`.
    ///
    /// Publishes [`ChatEvent::NewConversation`] on success. Any persistence
    /// failure yields `None`.
    pub async fn create(&self, title: &str, owner: &User) -> Option<Conversation> {
        let file_name = Self::transcript_file_name(&owner.user_name, title);
        match self.repo.insert(title, &owner.id, &file_name).await {
            Ok(conversation) => {
                debug!(conversation_id = conversation.id, "created conversation");
                self.dispatcher.publish(ChatEvent::NewConversation {
                    conversation_id: conversation.id,
                });
                Some(conversation)
            }
            Err(err) => {
                warn!("failed to create conversation: {err:#}");
                None
            }
        }
    }

    /// Delete a conversation on behalf of `requesting_owner_id`.
    ///
    /// Fails closed when the conversation is missing or owned by someone
    /// else. The transcript file is deliberately left on disk. Publishes
    /// [`ChatEvent::DeleteConversation`] on success.
    pub async fn delete(&self, requesting_owner_id: &str, conversation_id: i64) -> bool {
        let conversation = match self.repo.get(conversation_id).await {
            Ok(Some(conversation)) => conversation,
            Ok(None) => return false,
            Err(err) => {
                warn!("failed to look up conversation {conversation_id}: {err:#}");
                return false;
            }
        };
        if conversation.owner_id != requesting_owner_id {
            debug!(
                conversation_id,
                "delete refused: requester does not own the conversation"
            );
            return false;
        }

        match self.repo.delete(conversation_id).await {
            Ok(true) => {
                self.dispatcher
                    .publish(ChatEvent::DeleteConversation { conversation_id });
                true
            }
            Ok(false) => false,
            Err(err) => {
                warn!("failed to delete conversation {conversation_id}: {err:#}");
                false
            }
        }
    }

    /// Find conversations matching `filter`. Errors yield an empty list.
    pub async fn find(&self, filter: &ConversationFilter) -> Vec<Conversation> {
        match self.repo.find(filter).await {
            Ok(found) => found,
            Err(err) => {
                warn!("conversation lookup failed: {err:#}");
                Vec::new()
            }
        }
    }

    /// Get a single conversation by id.
    pub async fn get(&self, conversation_id: i64) -> Option<Conversation> {
        self.repo.get(conversation_id).await.ok().flatten()
    }

    /// Append a message to the conversation's transcript.
    ///
    /// Creates the transcript file (and parent directories) on first use and
    /// bumps last_activity. Any I/O or persistence error yields `false`.
    pub async fn append_message(&self, conversation_id: i64, message: &Message) -> bool {
        let Ok(Some(conversation)) = self.repo.get(conversation_id).await else {
            return false;
        };
        let path = self.transcript_path(&conversation);

        if let Err(err) = self.append_to_file(&path, &message.serialize()).await {
            warn!(
                "failed to append to transcript {}: {err:#}",
                path.display()
            );
            return false;
        }
        if let Err(err) = self.repo.touch(conversation_id).await {
            warn!("failed to touch conversation {conversation_id}: {err:#}");
            return false;
        }
        true
    }

    /// Read the conversation's title and full message history.
    ///
    /// A missing transcript file means zero messages, not an error; the
    /// empty file is created as a side effect.
    pub async fn read_messages(&self, conversation_id: i64) -> Option<(String, Vec<Message>)> {
        let conversation = self.repo.get(conversation_id).await.ok().flatten()?;
        let path = self.transcript_path(&conversation);

        if let Err(err) = ensure_file_exists(&path) {
            warn!("failed to create transcript {}: {err:#}", path.display());
            return None;
        }
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) => {
                warn!("failed to read transcript {}: {err:#}", path.display());
                return None;
            }
        };

        let messages = Message::deserialize_messages(transcript::split_lines(&contents));
        Some((conversation.title, messages))
    }

    async fn append_to_file(&self, path: &Path, data: &str) -> anyhow::Result<()> {
        use tokio::io::AsyncWriteExt;

        ensure_file_exists(path)?;
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(path)
            .await?;
        file.write_all(data.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Create `path` (and its parent directories) if it does not exist yet.
fn ensure_file_exists(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::File::create(path)?;
    Ok(())
}
