//! Join request endpoints.

use axum::{Json, Router, extract::State, routing::post};
use matchup_common::AppResult;
use matchup_core::{JoinDecision, SubmitJoinRequestInput};
use matchup_db::entities::join_request::Model as JoinRequestModel;
use serde::{Deserialize, Serialize};

use super::default_history_limit;
use crate::{extractors::AuthActor, middleware::AppState, response::ApiResponse};

/// Join request response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequestResponse {
    pub id: String,
    pub requester_id: String,
    pub group_id: String,
    pub status: String,
    pub message: Option<String>,
    pub created_at: String,
    pub decided_at: Option<String>,
    pub decided_by: Option<String>,
}

impl From<JoinRequestModel> for JoinRequestResponse {
    fn from(r: JoinRequestModel) -> Self {
        Self {
            id: r.id,
            requester_id: r.requester_id,
            group_id: r.group_id,
            status: r.status.as_str().to_string(),
            message: r.message,
            created_at: r.created_at.to_rfc3339(),
            decided_at: r.decided_at.map(|t| t.to_rfc3339()),
            decided_by: r.decided_by,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideRequest {
    pub request_id: String,
    pub decision: JoinDecision,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRequest {
    pub group_id: String,
    #[serde(default = "default_history_limit")]
    pub limit: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MineRequest {
    #[serde(default = "default_history_limit")]
    pub limit: u64,
}

fn to_responses(requests: Vec<JoinRequestModel>) -> Vec<JoinRequestResponse> {
    requests.into_iter().map(Into::into).collect()
}

/// Submit a join request.
async fn create(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(input): Json<SubmitJoinRequestInput>,
) -> AppResult<ApiResponse<JoinRequestResponse>> {
    let request = state
        .ledger_service
        .submit_join_request(&actor_id, input)
        .await?;
    Ok(ApiResponse::created(request.into()))
}

/// Approve or reject a join request.
async fn decide(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<DecideRequest>,
) -> AppResult<ApiResponse<JoinRequestResponse>> {
    let request = state
        .ledger_service
        .decide_join_request(&req.request_id, req.decision, &actor_id)
        .await?;
    Ok(ApiResponse::ok(request.into()))
}

async fn pending(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<GroupRequest>,
) -> AppResult<ApiResponse<Vec<JoinRequestResponse>>> {
    let requests = state
        .ledger_service
        .list_pending_join_requests(&req.group_id, &actor_id)
        .await?;
    Ok(ApiResponse::ok(to_responses(requests)))
}

async fn history(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<GroupRequest>,
) -> AppResult<ApiResponse<Vec<JoinRequestResponse>>> {
    let requests = state
        .ledger_service
        .list_join_request_history(&req.group_id, &actor_id, req.limit)
        .await?;
    Ok(ApiResponse::ok(to_responses(requests)))
}

async fn mine(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<MineRequest>,
) -> AppResult<ApiResponse<Vec<JoinRequestResponse>>> {
    let requests = state
        .ledger_service
        .list_my_join_requests(&actor_id, req.limit)
        .await?;
    Ok(ApiResponse::ok(to_responses(requests)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/decide", post(decide))
        .route("/pending", post(pending))
        .route("/history", post(history))
        .route("/mine", post(mine))
}
