//! Conversation endpoints: inbox, counterpart resolution, and messages.

use axum::{Json, Router, extract::State, routing::post};
use matchup_common::AppResult;
use matchup_core::{ConversationSummary, ResolvedCounterpart};
use matchup_db::entities::chat_message::Model as MessageModel;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{extractors::AuthActor, middleware::AppState, response::ApiResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub match_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesRequest {
    pub room_id: String,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

const fn default_limit() -> u64 {
    30
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub room_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendToMatchRequest {
    pub match_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequest {
    pub room_id: String,
}

/// Chat message response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub text: String,
    pub created_at: String,
}

impl From<MessageModel> for MessageResponse {
    fn from(m: MessageModel) -> Self {
        Self {
            id: m.id,
            room_id: m.room_id,
            sender_id: m.sender_id,
            text: m.text,
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

/// The viewer's inbox.
async fn list(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ConversationSummary>>> {
    let conversations = state.inbox_service.list_conversations(&actor_id).await?;
    Ok(ApiResponse::ok(conversations))
}

async fn resolve(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<ResolveRequest>,
) -> AppResult<ApiResponse<ResolvedCounterpart>> {
    let resolved = state
        .conversation_service
        .resolve_counterpart(&req.match_id, &actor_id)
        .await?;
    Ok(ApiResponse::ok(resolved))
}

async fn messages(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<MessagesRequest>,
) -> AppResult<ApiResponse<Vec<MessageResponse>>> {
    let messages = state
        .conversation_service
        .list_messages(&req.room_id, &actor_id, req.limit, req.until_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(messages.into_iter().map(Into::into).collect()))
}

async fn send(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> AppResult<ApiResponse<MessageResponse>> {
    let message = state
        .conversation_service
        .send_message(&req.room_id, &actor_id, &req.text)
        .await?;
    Ok(ApiResponse::created(message.into()))
}

/// First message from an applicant opens the room.
async fn send_to_match(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<SendToMatchRequest>,
) -> AppResult<ApiResponse<MessageResponse>> {
    let message = state
        .conversation_service
        .send_match_message(&req.match_id, &actor_id, &req.text)
        .await?;
    Ok(ApiResponse::created(message.into()))
}

async fn leave(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<RoomRequest>,
) -> AppResult<ApiResponse<Value>> {
    state
        .conversation_service
        .leave_room(&req.room_id, &actor_id)
        .await?;
    Ok(ApiResponse::ok(json!({})))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", post(list))
        .route("/resolve", post(resolve))
        .route("/messages", post(messages))
        .route("/send", post(send))
        .route("/send-to-match", post(send_to_match))
        .route("/leave", post(leave))
}
