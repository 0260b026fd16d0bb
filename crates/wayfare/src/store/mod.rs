//! Conversation metadata and file-backed transcripts.

pub mod models;
pub mod repository;
pub mod service;

pub use models::{Conversation, ConversationFilter, DEFAULT_FIND_LIMIT, MAX_TITLE_LEN};
pub use repository::ConversationRepository;
pub use service::ConversationStore;
