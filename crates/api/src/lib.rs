//! HTTP API layer for matchup.
//!
//! - **Endpoints**: join requests, applications, notifications, conversations
//! - **Extractors**: the acting actor, taken from the gateway's auth header
//! - **Middleware**: auth context
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::{app, router};
pub use middleware::{ACTOR_HEADER, AppState, auth_middleware};
