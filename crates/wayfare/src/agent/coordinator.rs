//! Agent session coordinator.
//!
//! Bridges a submitted user message to an asynchronous completion call: the
//! user's message is appended synchronously, then the agent call runs on a
//! background task so the request path returns immediately. Failures of the
//! external call are absorbed: nothing is appended and no event fires.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::dispatch::{ChatEvent, EventDispatcher};
use crate::store::ConversationStore;
use crate::transcript::Message;

use super::client::{CompletionClient, CompletionTurn};

/// Coordinates one conversation turn: persist user message, call the agent,
/// persist and announce the response.
pub struct AgentCoordinator {
    store: ConversationStore,
    dispatcher: Arc<EventDispatcher>,
    client: Arc<dyn CompletionClient>,
    /// Completion call deadline; expiry is treated as "no response".
    call_timeout: Duration,
    /// One writer per conversation at a time. Protects the transcript
    /// against interleaved appends from double submissions.
    turn_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl AgentCoordinator {
    /// Create a new coordinator.
    ///
    /// Logs the client's readiness once; a client that is not ready never
    /// produces responses, but conversations keep working otherwise.
    pub fn new(
        store: ConversationStore,
        dispatcher: Arc<EventDispatcher>,
        client: Arc<dyn CompletionClient>,
        call_timeout: Duration,
    ) -> Self {
        if client.ready() {
            info!("completion client initialized");
        } else {
            warn!("completion client not ready; agent responses are disabled");
        }
        Self {
            store,
            dispatcher,
            client,
            call_timeout,
            turn_locks: DashMap::new(),
        }
    }

    fn turn_lock(&self, conversation_id: i64) -> Arc<Mutex<()>> {
        Arc::clone(
            self.turn_locks
                .entry(conversation_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Submit a user message for `conversation_id`.
    ///
    /// Appends the user's message, then spawns the agent call in the
    /// background. Returns whether the user message was persisted; the
    /// agent's side of the turn is fire-and-forget.
    pub async fn submit(self: &Arc<Self>, conversation_id: i64, text: String) -> bool {
        let lock = self.turn_lock(conversation_id);
        let persisted = {
            let _guard = lock.lock().await;
            self.store
                .append_message(conversation_id, &Message::from_user(text))
                .await
        };
        if !persisted {
            warn!(conversation_id, "failed to persist user message");
            drop(lock);
            self.turn_locks
                .remove_if(&conversation_id, |_, lock| Arc::strong_count(lock) == 1);
            return false;
        }

        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.run_agent_turn(conversation_id).await;
        });
        true
    }

    /// Background half of the turn, plus lock cleanup once it is over.
    async fn run_agent_turn(&self, conversation_id: i64) {
        self.agent_turn(conversation_id).await;
        // Prune the per-conversation lock once nothing else holds it; the
        // predicate runs under the shard lock, so no new holder can appear
        // between the check and the removal.
        self.turn_locks
            .remove_if(&conversation_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Load history, call the completion service, append and announce the
    /// response.
    async fn agent_turn(&self, conversation_id: i64) {
        if !self.client.ready() {
            debug!(conversation_id, "completion client not ready; skipping turn");
            return;
        }

        let lock = self.turn_lock(conversation_id);
        let _guard = lock.lock().await;

        let Some((_, history)) = self.store.read_messages(conversation_id).await else {
            warn!(conversation_id, "could not load history for agent turn");
            return;
        };
        let turns: Vec<CompletionTurn> = history
            .iter()
            .map(|message| CompletionTurn {
                role: message.role(),
                text: message.body.clone(),
            })
            .collect();

        let response =
            match tokio::time::timeout(self.call_timeout, self.client.complete(&turns)).await {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => {
                    debug!(conversation_id, "completion call failed: {err:#}");
                    return;
                }
                Err(_) => {
                    debug!(conversation_id, "completion call timed out");
                    return;
                }
            };
        if response.is_empty() {
            debug!(conversation_id, "completion service returned nothing");
            return;
        }

        if self
            .store
            .append_message(conversation_id, &Message::from_agent(response.clone()))
            .await
        {
            self.dispatcher.publish(ChatEvent::NewAgentMessage {
                conversation_id,
                text: response,
            });
        }
    }
}
