use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::{events, handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/auth/signup", post(handlers::signup))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route(
            "/api/chats",
            get(handlers::list_chats).post(handlers::create_chat),
        )
        .route(
            "/api/chats/{id}",
            get(handlers::get_chat).delete(handlers::delete_chat),
        )
        .route("/api/chats/{id}/select", post(handlers::select_chat))
        .route("/api/messages", post(handlers::post_message))
        .route("/api/events", get(events::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
