//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use matchup_core::{ConversationService, InboxService, NotificationService, RequestLedgerService};
use tracing::debug;

use crate::extractors::ActorContext;

/// Header carrying the actor ID authenticated by the upstream gateway.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub ledger_service: RequestLedgerService,
    pub notification_service: NotificationService,
    pub conversation_service: ConversationService,
    pub inbox_service: InboxService,
}

/// Authentication middleware.
///
/// The core never authenticates; it trusts the actor ID the gateway put in
/// [`ACTOR_HEADER`]. Requests without it reach handlers unauthenticated and
/// are rejected by the [`crate::extractors::AuthActor`] extractor.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Response {
    let actor_id = req
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    match actor_id {
        Some(actor_id) => {
            req.extensions_mut().insert(ActorContext(actor_id));
        }
        None => debug!(uri = %req.uri(), "Request without actor header"),
    }

    next.run(req).await
}
