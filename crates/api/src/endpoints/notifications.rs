//! Notifications endpoints.

use axum::{Json, Router, extract::State, routing::post};
use matchup_common::AppResult;
use matchup_db::entities::notification::Model as NotificationModel;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    extractors::AuthActor,
    middleware::AppState,
    response::{ApiResponse, CountResponse},
};

/// List notifications request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsRequest {
    /// Maximum results (default: 20, max: 100)
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Cursor for pagination (before this ID)
    pub until_id: Option<String>,
    #[serde(default)]
    pub unread_only: bool,
}

const fn default_limit() -> u64 {
    20
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationIdRequest {
    pub notification_id: String,
}

/// Notification response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    pub kind: String,
    pub sender_id: Option<String>,
    pub target_id: String,
    pub title: String,
    pub body: String,
    pub redirect_target: String,
    pub metadata: Value,
    pub is_read: bool,
    pub created_at: String,
}

impl From<NotificationModel> for NotificationResponse {
    fn from(n: NotificationModel) -> Self {
        Self {
            id: n.id,
            kind: n.kind.as_str().to_string(),
            sender_id: n.sender_id,
            target_id: n.target_id,
            title: n.title,
            body: n.body,
            redirect_target: n.redirect_target,
            metadata: n.metadata,
            is_read: n.is_read,
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

/// List notifications.
async fn list(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<ListNotificationsRequest>,
) -> AppResult<ApiResponse<Vec<NotificationResponse>>> {
    let notifications = state
        .notification_service
        .list(&actor_id, req.limit, req.until_id.as_deref(), req.unread_only)
        .await?;

    Ok(ApiResponse::ok(
        notifications.into_iter().map(Into::into).collect(),
    ))
}

async fn unread_count(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<CountResponse>> {
    let count = state.notification_service.count_unread(&actor_id).await?;
    Ok(ApiResponse::ok(CountResponse { count }))
}

async fn mark_read(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<NotificationIdRequest>,
) -> AppResult<ApiResponse<Value>> {
    state
        .notification_service
        .mark_read(&actor_id, &req.notification_id)
        .await?;
    Ok(ApiResponse::ok(json!({})))
}

async fn mark_all_read(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<CountResponse>> {
    let count = state.notification_service.mark_all_read(&actor_id).await?;
    Ok(ApiResponse::ok(CountResponse { count }))
}

async fn delete(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<NotificationIdRequest>,
) -> AppResult<ApiResponse<Value>> {
    state
        .notification_service
        .delete(&actor_id, &req.notification_id)
        .await?;
    Ok(ApiResponse::ok(json!({})))
}

async fn delete_all(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<CountResponse>> {
    let count = state.notification_service.delete_all(&actor_id).await?;
    Ok(ApiResponse::ok(CountResponse { count }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", post(list))
        .route("/unread-count", post(unread_count))
        .route("/read", post(mark_read))
        .route("/read-all", post(mark_all_read))
        .route("/delete", post(delete))
        .route("/delete-all", post(delete_all))
}
