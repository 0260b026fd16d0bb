use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use dashmap::DashMap;
use nanoid::nanoid;

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::user::User;

/// Per-login session state kept in memory for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct WebSession {
    pub user_id: String,
    /// Conversation the session is currently looking at, if any.
    pub conversation_id: Option<i64>,
}

/// Token-indexed registry of live web sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, WebSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session for a user and returns the bearer token.
    pub fn create_session(&self, user_id: &str) -> String {
        let token = format!("ses_{}", nanoid!(24));
        self.sessions.insert(
            token.clone(),
            WebSession {
                user_id: user_id.to_string(),
                conversation_id: None,
            },
        );
        token
    }

    pub fn get(&self, token: &str) -> Option<WebSession> {
        self.sessions.get(token).map(|s| s.value().clone())
    }

    /// Points the session at a conversation, replacing any previous choice.
    pub fn bind_conversation(&self, token: &str, conversation_id: i64) {
        if let Some(mut session) = self.sessions.get_mut(token) {
            session.conversation_id = Some(conversation_id);
        }
    }

    /// Binds a conversation only if the session has none yet. Returns whether
    /// the claim took effect.
    pub fn claim_conversation(&self, token: &str, conversation_id: i64) -> bool {
        match self.sessions.get_mut(token) {
            Some(mut session) if session.conversation_id.is_none() => {
                session.conversation_id = Some(conversation_id);
                true
            }
            _ => false,
        }
    }

    /// Drops the session's conversation binding, if any.
    pub fn clear_conversation(&self, token: &str) {
        if let Some(mut session) = self.sessions.get_mut(token) {
            session.conversation_id = None;
        }
    }

    pub fn conversation_of(&self, token: &str) -> Option<i64> {
        self.sessions.get(token).and_then(|s| s.conversation_id)
    }

    pub fn remove(&self, token: &str) {
        self.sessions.remove(token);
    }
}

/// Authenticated caller, resolved from the `Authorization: Bearer` header.
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

fn bearer_token_from_header(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token_from_header(parts)
            .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?
            .to_string();

        let session = state
            .sessions
            .get(&token)
            .ok_or_else(|| ApiError::unauthorized("unknown or expired session"))?;

        let user = state
            .users
            .get(&session.user_id)
            .await
            .map_err(|err| ApiError::internal(err.to_string()))?
            .ok_or_else(|| ApiError::unauthorized("session user no longer exists"))?;

        Ok(CurrentUser { user, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_roundtrip() {
        let registry = SessionRegistry::new();
        let token = registry.create_session("usr_abc");
        let session = registry.get(&token).unwrap();
        assert_eq!(session.user_id, "usr_abc");
        assert_eq!(session.conversation_id, None);

        registry.remove(&token);
        assert!(registry.get(&token).is_none());
    }

    #[test]
    fn claim_only_binds_once() {
        let registry = SessionRegistry::new();
        let token = registry.create_session("usr_abc");

        assert!(registry.claim_conversation(&token, 7));
        assert!(!registry.claim_conversation(&token, 8));
        assert_eq!(registry.conversation_of(&token), Some(7));

        registry.bind_conversation(&token, 9);
        assert_eq!(registry.conversation_of(&token), Some(9));
    }

    #[test]
    fn claim_on_unknown_token_is_noop() {
        let registry = SessionRegistry::new();
        assert!(!registry.claim_conversation("ses_missing", 1));
    }
}
