//! Test utilities and common setup.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use wayfare::agent::{AdvisorClient, AdvisorConfig, AgentCoordinator};
use wayfare::api::{self, AppState, SessionRegistry};
use wayfare::db::Database;
use wayfare::dispatch::EventDispatcher;
use wayfare::store::{ConversationRepository, ConversationStore};
use wayfare::user::UserRepository;

/// Create a test application backed by an in-memory database and a
/// temporary transcripts directory. The completion client has no API key,
/// so no agent calls leave the process.
pub async fn test_app() -> (Router, TempDir) {
    let db = Database::in_memory().await.unwrap();
    let transcripts = TempDir::new().unwrap();

    let dispatcher = Arc::new(EventDispatcher::new());
    let users = UserRepository::new(db.pool().clone());
    let store = ConversationStore::new(
        ConversationRepository::new(db.pool().clone()),
        transcripts.path().to_path_buf(),
        dispatcher.clone(),
    );

    let advisor = AdvisorConfig {
        api_key_env: "WAYFARE_TEST_MISSING_KEY".to_string(),
        ..AdvisorConfig::default()
    };
    let client = Arc::new(AdvisorClient::new(advisor));
    let coordinator = Arc::new(AgentCoordinator::new(
        store.clone(),
        dispatcher.clone(),
        client,
        Duration::from_secs(1),
    ));

    let state = AppState {
        users,
        store,
        dispatcher,
        coordinator,
        sessions: Arc::new(SessionRegistry::new()),
    };

    (api::create_router(state), transcripts)
}

/// Sign up a user through the API and return their bearer token.
pub async fn signup(app: &Router, user_name: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/signup")
                .method(Method::POST)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_string(&json!({ "user_name": user_name })).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    json["token"].as_str().unwrap().to_string()
}

/// Issue an authenticated JSON request and return the response.
pub async fn authed_request(
    app: &Router,
    method: Method,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> axum::http::Response<axum::body::Body> {
    let builder = Request::builder()
        .uri(uri)
        .method(method)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json");

    let request = match body {
        Some(value) => builder
            .body(Body::from(serde_json::to_string(&value).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

/// Deserialize a response body as JSON.
pub async fn response_json(response: axum::http::Response<axum::body::Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
