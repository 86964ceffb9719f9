//! API endpoints.

mod applications;
mod conversations;
mod join_requests;
mod notifications;

use axum::{Json, Router, middleware::from_fn, routing::get};
use serde_json::{Value, json};

use crate::middleware::{AppState, auth_middleware};

/// Default page size for history listings.
pub(crate) const fn default_history_limit() -> u64 {
    30
}

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/join-requests", join_requests::router())
        .nest("/applications", applications::router())
        .nest("/notifications", notifications::router())
        .nest("/conversations", conversations::router())
}

/// Full application: `/api` behind the auth middleware plus the health probe.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", router().layer(from_fn(auth_middleware)))
        .with_state(state)
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
