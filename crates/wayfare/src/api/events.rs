//! Server-sent event stream that turns dispatcher events into browser
//! signals.
//!
//! Each connection registers its own subscriber queue, so two tabs of the
//! same user receive independent copies of every event. The stream emits
//! exactly one signal per poll: `reload` when the caller's view is stale,
//! `keepalive` otherwise. The stream never writes anything itself; message
//! persistence happens in the message endpoint, so fan-out to many
//! connections cannot multiply writes.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures::stream::Stream;
use nanoid::nanoid;
use tracing::debug;

use crate::api::session::CurrentUser;
use crate::api::state::AppState;
use crate::dispatch::{ChatEvent, EventDispatcher, EventKind};

/// How long a single poll blocks before falling back to a keepalive.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

fn reload() -> Event {
    Event::default().data("reload")
}

fn keepalive() -> Event {
    Event::default().data("keepalive")
}

/// Unregisters the connection's subscriber when the stream is dropped.
struct SubscriberGuard {
    dispatcher: Arc<EventDispatcher>,
    name: String,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        debug!(subscriber = %self.name, "event stream closed");
        self.dispatcher.remove_subscriber(&self.name);
    }
}

pub async fn event_stream(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let name = format!("sse_{}", nanoid!(10));
    for kind in EventKind::ALL {
        state.dispatcher.subscribe(&name, kind);
    }
    debug!(subscriber = %name, user_id = %user.user.id, "event stream opened");

    let guard = SubscriberGuard {
        dispatcher: state.dispatcher.clone(),
        name: name.clone(),
    };

    let stream = futures::stream::unfold(
        (state, user, name, guard),
        |(state, user, name, guard)| async move {
            let signal = match state.dispatcher.wait_event(&name, POLL_INTERVAL).await {
                Some(event) => handle_event(&state, &user, event).await,
                None => keepalive(),
            };
            Some((Ok(signal), (state, user, name, guard)))
        },
    );

    Sse::new(stream)
}

/// Decides what a single dispatcher event means for this connection.
async fn handle_event(state: &AppState, user: &CurrentUser, event: ChatEvent) -> Event {
    match event {
        ChatEvent::NewConversation { conversation_id } => {
            let owned = state
                .store
                .get(conversation_id)
                .await
                .is_some_and(|conversation| conversation.owner_id == user.user.id);
            if owned && state.sessions.claim_conversation(&user.token, conversation_id) {
                reload()
            } else {
                keepalive()
            }
        }
        ChatEvent::NewUserMessage { conversation_id, .. }
        | ChatEvent::NewAgentMessage { conversation_id, .. } => {
            if state.sessions.conversation_of(&user.token) == Some(conversation_id) {
                reload()
            } else {
                keepalive()
            }
        }
        ChatEvent::DeleteConversation { conversation_id } => {
            if state.sessions.conversation_of(&user.token) == Some(conversation_id) {
                state.sessions.clear_conversation(&user.token);
                reload()
            } else {
                keepalive()
            }
        }
    }
}
