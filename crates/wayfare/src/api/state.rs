use std::sync::Arc;

use crate::agent::AgentCoordinator;
use crate::api::session::SessionRegistry;
use crate::dispatch::EventDispatcher;
use crate::store::ConversationStore;
use crate::user::UserRepository;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub users: UserRepository,
    pub store: ConversationStore,
    pub dispatcher: Arc<EventDispatcher>,
    pub coordinator: Arc<AgentCoordinator>,
    pub sessions: Arc<SessionRegistry>,
}
