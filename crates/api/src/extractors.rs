//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use matchup_common::AppError;

/// Actor identity established by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext(pub String);

/// Authenticated actor extractor.
#[derive(Debug, Clone)]
pub struct AuthActor(pub String);

impl<S> FromRequestParts<S> for AuthActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by auth middleware
        parts
            .extensions
            .get::<ActorContext>()
            .map(|ctx| Self(ctx.0.clone()))
            .ok_or(AppError::Unauthorized)
    }
}
