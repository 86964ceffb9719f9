//! Match application endpoints.

use axum::{Json, Router, extract::State, routing::post};
use matchup_common::AppResult;
use matchup_core::{ApplicationDecision, SubmitApplicationInput};
use matchup_db::entities::match_application::Model as ApplicationModel;
use serde::{Deserialize, Serialize};

use super::default_history_limit;
use crate::{extractors::AuthActor, middleware::AppState, response::ApiResponse};

/// Application response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub id: String,
    pub match_id: String,
    pub applicant_actor_id: String,
    pub applicant_profile_id: String,
    pub status: String,
    pub message: Option<String>,
    pub attribute_snapshot: Option<String>,
    pub created_at: String,
    pub decided_at: Option<String>,
    pub decided_by: Option<String>,
}

impl From<ApplicationModel> for ApplicationResponse {
    fn from(a: ApplicationModel) -> Self {
        Self {
            id: a.id,
            match_id: a.match_id,
            applicant_actor_id: a.applicant_actor_id,
            applicant_profile_id: a.applicant_profile_id,
            status: a.status.as_str().to_string(),
            message: a.message,
            attribute_snapshot: a.attribute_snapshot,
            created_at: a.created_at.to_rfc3339(),
            decided_at: a.decided_at.map(|t| t.to_rfc3339()),
            decided_by: a.decided_by,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideRequest {
    pub application_id: String,
    pub decision: ApplicationDecision,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    pub match_id: String,
    #[serde(default = "default_history_limit")]
    pub limit: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MineRequest {
    #[serde(default = "default_history_limit")]
    pub limit: u64,
}

fn to_responses(applications: Vec<ApplicationModel>) -> Vec<ApplicationResponse> {
    applications.into_iter().map(Into::into).collect()
}

/// Apply to a match.
async fn create(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(input): Json<SubmitApplicationInput>,
) -> AppResult<ApiResponse<ApplicationResponse>> {
    let application = state
        .ledger_service
        .submit_application(&actor_id, input)
        .await?;
    Ok(ApiResponse::created(application.into()))
}

/// Accept or reject an application. Host only.
async fn decide(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<DecideRequest>,
) -> AppResult<ApiResponse<ApplicationResponse>> {
    let application = state
        .ledger_service
        .decide_application(&req.application_id, req.decision, &actor_id)
        .await?;
    Ok(ApiResponse::ok(application.into()))
}

async fn pending(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> AppResult<ApiResponse<Vec<ApplicationResponse>>> {
    let applications = state
        .ledger_service
        .list_pending_applications(&req.match_id, &actor_id)
        .await?;
    Ok(ApiResponse::ok(to_responses(applications)))
}

async fn history(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> AppResult<ApiResponse<Vec<ApplicationResponse>>> {
    let applications = state
        .ledger_service
        .list_application_history(&req.match_id, &actor_id, req.limit)
        .await?;
    Ok(ApiResponse::ok(to_responses(applications)))
}

async fn mine(
    AuthActor(actor_id): AuthActor,
    State(state): State<AppState>,
    Json(req): Json<MineRequest>,
) -> AppResult<ApiResponse<Vec<ApplicationResponse>>> {
    let applications = state
        .ledger_service
        .list_my_applications(&actor_id, req.limit)
        .await?;
    Ok(ApiResponse::ok(to_responses(applications)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/decide", post(decide))
        .route("/pending", post(pending))
        .route("/history", post(history))
        .route("/mine", post(mine))
}
