//! API integration tests.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::{authed_request, response_json, signup, test_app};

/// Health endpoint works without authentication.
#[tokio::test]
async fn test_health_endpoint() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = response_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_signup_returns_token_and_user() {
    let (app, _dir) = test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/signup")
                .method(Method::POST)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_string(&json!({
                        "user_name": "alice",
                        "first_name": "Alice"
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let json: Value = response_json(response).await;
    assert!(json["token"].is_string());
    assert_eq!(json["user"]["user_name"], "alice");
    assert!(json["user"]["id"].as_str().unwrap().starts_with("usr_"));
}

#[tokio::test]
async fn test_signup_rejects_duplicate_user_name() {
    let (app, _dir) = test_app().await;
    signup(&app, "alice").await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/signup")
                .method(Method::POST)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_string(&json!({ "user_name": "alice" })).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_unknown_user() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/login")
                .method(Method::POST)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_string(&json!({ "user_name": "nobody" })).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Protected endpoints reject requests without a bearer token.
#[tokio::test]
async fn test_chats_require_auth() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/chats")
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_chat_lifecycle() {
    let (app, _dir) = test_app().await;
    let token = signup(&app, "alice").await;

    // Create
    let response = authed_request(
        &app,
        Method::POST,
        "/api/chats",
        &token,
        Some(json!({ "title": "Japan trip" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["title"], "Japan trip");

    // List
    let response = authed_request(&app, Method::GET, "/api/chats", &token, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed = response_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // Read back; a fresh conversation has no messages
    let response =
        authed_request(&app, Method::GET, &format!("/api/chats/{id}"), &token, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let chat = response_json(response).await;
    assert_eq!(chat["title"], "Japan trip");
    assert_eq!(chat["messages"].as_array().unwrap().len(), 0);

    // Select
    let response = authed_request(
        &app,
        Method::POST,
        &format!("/api/chats/{id}/select"),
        &token,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Delete
    let response =
        authed_request(&app, Method::DELETE, &format!("/api/chats/{id}"), &token, None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = authed_request(&app, Method::GET, "/api/chats", &token, None).await;
    let listed = response_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_create_chat_validates_title() {
    let (app, _dir) = test_app().await;
    let token = signup(&app, "alice").await;

    let response = authed_request(
        &app,
        Method::POST,
        "/api/chats",
        &token,
        Some(json!({ "title": "" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let long_title = "x".repeat(51);
    let response = authed_request(
        &app,
        Method::POST,
        "/api/chats",
        &token,
        Some(json!({ "title": long_title })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// The title limit counts characters, not bytes.
#[tokio::test]
async fn test_create_chat_title_limit_counts_characters() {
    let (app, _dir) = test_app().await;
    let token = signup(&app, "alice").await;

    // 50 two-byte characters fit
    let response = authed_request(
        &app,
        Method::POST,
        "/api/chats",
        &token,
        Some(json!({ "title": "é".repeat(50) })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // 51 characters do not
    let response = authed_request(
        &app,
        Method::POST,
        "/api/chats",
        &token,
        Some(json!({ "title": "é".repeat(51) })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// A posted message lands in the sender's selected conversation and
/// nowhere else, no matter how many event streams are open.
#[tokio::test]
async fn test_messages_stay_in_the_senders_conversation() {
    let (app, _dir) = test_app().await;
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;

    let mut ids = Vec::new();
    for (token, title) in [(&alice, "Alps"), (&bob, "Fjords")] {
        let response = authed_request(
            &app,
            Method::POST,
            "/api/chats",
            token,
            Some(json!({ "title": title })),
        )
        .await;
        let id = response_json(response).await["id"].as_i64().unwrap();
        let response = authed_request(
            &app,
            Method::POST,
            &format!("/api/chats/{id}/select"),
            token,
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        ids.push(id);
    }

    let response = authed_request(
        &app,
        Method::POST,
        "/api/messages",
        &alice,
        Some(json!({ "message": "Chamonix in June?" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = authed_request(
        &app,
        Method::GET,
        &format!("/api/chats/{}", ids[0]),
        &alice,
        None,
    )
    .await;
    let alice_chat = response_json(response).await;
    let alice_messages = alice_chat["messages"].as_array().unwrap();
    assert_eq!(alice_messages.len(), 1);
    assert_eq!(alice_messages[0]["body"], "Chamonix in June?");

    let response = authed_request(
        &app,
        Method::GET,
        &format!("/api/chats/{}", ids[1]),
        &bob,
        None,
    )
    .await;
    let bob_chat = response_json(response).await;
    assert_eq!(bob_chat["messages"].as_array().unwrap().len(), 0);
}

/// A user cannot see or delete another user's conversation.
#[tokio::test]
async fn test_foreign_chat_is_invisible() {
    let (app, _dir) = test_app().await;
    let alice = signup(&app, "alice").await;
    let mallory = signup(&app, "mallory").await;

    let response = authed_request(
        &app,
        Method::POST,
        "/api/chats",
        &alice,
        Some(json!({ "title": "Secret plans" })),
    )
    .await;
    let id = response_json(response).await["id"].as_i64().unwrap();

    let response =
        authed_request(&app, Method::GET, &format!("/api/chats/{id}"), &mallory, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = authed_request(
        &app,
        Method::DELETE,
        &format!("/api/chats/{id}"),
        &mallory,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Still there for the owner
    let response =
        authed_request(&app, Method::GET, &format!("/api/chats/{id}"), &alice, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_post_message_requires_selected_chat() {
    let (app, _dir) = test_app().await;
    let token = signup(&app, "alice").await;

    let response = authed_request(
        &app,
        Method::POST,
        "/api/messages",
        &token,
        Some(json!({ "message": "Hello" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_post_message_accepted_after_select() {
    let (app, _dir) = test_app().await;
    let token = signup(&app, "alice").await;

    let response = authed_request(
        &app,
        Method::POST,
        "/api/chats",
        &token,
        Some(json!({ "title": "Norway" })),
    )
    .await;
    let id = response_json(response).await["id"].as_i64().unwrap();

    let response = authed_request(
        &app,
        Method::POST,
        &format!("/api/chats/{id}/select"),
        &token,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = authed_request(
        &app,
        Method::POST,
        "/api/messages",
        &token,
        Some(json!({ "message": "Where should I go hiking?" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = authed_request(
        &app,
        Method::POST,
        "/api/messages",
        &token,
        Some(json!({ "message": "   " })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_invalidates_token() {
    let (app, _dir) = test_app().await;
    let token = signup(&app, "alice").await;

    let response = authed_request(&app, Method::POST, "/api/auth/logout", &token, None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = authed_request(&app, Method::GET, "/api/chats", &token, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
