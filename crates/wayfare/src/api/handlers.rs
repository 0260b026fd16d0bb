use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::api::session::CurrentUser;
use crate::api::state::AppState;
use crate::dispatch::ChatEvent;
use crate::store::{Conversation, ConversationFilter, MAX_TITLE_LEN};
use crate::transcript::Message;
use crate::user::{CreateUserRequest, User};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub user_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let user_name = request.user_name.trim();
    if user_name.is_empty() {
        return Err(ApiError::bad_request("user_name must not be empty"));
    }
    if state
        .users
        .get_by_user_name(user_name)
        .await
        .map_err(ApiError::from)?
        .is_some()
    {
        return Err(ApiError::bad_request("user_name already taken"));
    }

    let user = state
        .users
        .create(CreateUserRequest {
            user_name: user_name.to_string(),
            first_name: request.first_name,
            last_name: request.last_name,
        })
        .await
        .map_err(ApiError::from)?;

    let token = state.sessions.create_session(&user.id);
    tracing::info!(user_id = %user.id, "user signed up");
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub user_name: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = state
        .users
        .get_by_user_name(request.user_name.trim())
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::unauthorized("unknown user"))?;

    let token = state.sessions.create_session(&user.id);
    Ok(Json(AuthResponse { token, user }))
}

pub async fn logout(State(state): State<AppState>, user: CurrentUser) -> StatusCode {
    state.sessions.remove(&user.token);
    StatusCode::NO_CONTENT
}

#[derive(Deserialize, Default)]
pub struct ListChatsQuery {
    pub limit: Option<i64>,
}

pub async fn list_chats(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListChatsQuery>,
) -> Json<Vec<Conversation>> {
    let mut filter = ConversationFilter::for_owner(&user.user.id);
    if let Some(limit) = query.limit {
        filter = filter.with_limit(limit);
    }
    Json(state.store.find(&filter).await)
}

#[derive(Deserialize)]
pub struct NewChatRequest {
    pub title: String,
}

pub async fn create_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<NewChatRequest>,
) -> ApiResult<(StatusCode, Json<Conversation>)> {
    let title = request.title.trim();
    // Characters, not bytes, to agree with the schema's length() check.
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::bad_request(format!(
            "title must be between 1 and {MAX_TITLE_LEN} characters"
        )));
    }

    let conversation = state
        .store
        .create(title, &user.user)
        .await
        .ok_or_else(|| ApiError::internal("could not create conversation"))?;

    Ok((StatusCode::CREATED, Json(conversation)))
}

#[derive(Serialize)]
pub struct MessageView {
    pub body: String,
    pub from_user: bool,
}

impl From<Message> for MessageView {
    fn from(message: Message) -> Self {
        Self {
            body: message.body,
            from_user: message.from_user,
        }
    }
}

#[derive(Serialize)]
pub struct ChatView {
    pub id: i64,
    pub title: String,
    pub messages: Vec<MessageView>,
}

/// Loads a conversation if it exists and belongs to the caller. Missing and
/// foreign conversations are indistinguishable to the caller.
async fn owned_conversation(
    state: &AppState,
    user: &CurrentUser,
    conversation_id: i64,
) -> ApiResult<Conversation> {
    state
        .store
        .get(conversation_id)
        .await
        .filter(|conversation| conversation.owner_id == user.user.id)
        .ok_or_else(|| ApiError::not_found("conversation not found"))
}

pub async fn get_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<ChatView>> {
    let conversation = owned_conversation(&state, &user, id).await?;

    let (title, messages) = state
        .store
        .read_messages(conversation.id)
        .await
        .ok_or_else(|| ApiError::internal("could not read transcript"))?;

    Ok(Json(ChatView {
        id: conversation.id,
        title,
        messages: messages.into_iter().map(MessageView::from).collect(),
    }))
}

pub async fn select_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    owned_conversation(&state, &user, id).await?;
    state.sessions.bind_conversation(&user.token, id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.store.delete(&user.user.id, id).await {
        return Err(ApiError::not_found("conversation not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct NewMessageRequest {
    pub message: String,
}

/// Accepts a user message for the session's selected conversation.
///
/// The message is persisted here, exactly once, and the background agent
/// turn starts; the published event is a pure notification for open event
/// streams. The selected conversation was ownership-checked when it was
/// bound, so the caller can only ever write into their own transcript.
pub async fn post_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<NewMessageRequest>,
) -> ApiResult<StatusCode> {
    let text = request.message.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }
    let conversation_id = state
        .sessions
        .conversation_of(&user.token)
        .ok_or_else(|| ApiError::bad_request("no conversation selected"))?;

    if !state.coordinator.submit(conversation_id, text.clone()).await {
        return Err(ApiError::internal("could not persist message"));
    }

    state.dispatcher.publish(ChatEvent::NewUserMessage {
        conversation_id,
        text,
    });
    Ok(StatusCode::ACCEPTED)
}
