//! Event publisher service.
//!
//! Provides an abstraction for the outbound "something changed" stream.
//! The actual implementation is provided by the queue crate (Redis Pub/Sub).
//! Delivery is best-effort: callers log publish failures and move on.

use async_trait::async_trait;
use matchup_common::AppResult;
use std::sync::Arc;

/// Trait for publishing real-time change events to actors.
///
/// This allows the core services to publish events
/// without directly depending on the queue/pubsub implementation.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// A notification was delivered to `receiver_id`.
    async fn publish_notification(
        &self,
        receiver_id: &str,
        notification_id: &str,
        kind: &str,
        target_id: &str,
    ) -> AppResult<()>;

    /// A join request or application addressed to or made by `actor_id` changed status.
    async fn publish_request_changed(
        &self,
        actor_id: &str,
        request_id: &str,
        request_kind: &str,
        status: &str,
    ) -> AppResult<()>;

    /// A chat room visible to `actor_id` was created or reopened.
    async fn publish_room_changed(&self, actor_id: &str, room_id: &str) -> AppResult<()>;

    /// A chat message was sent to `recipient_id`.
    async fn publish_chat_message(
        &self,
        recipient_id: &str,
        room_id: &str,
        message_id: &str,
        sender_id: &str,
    ) -> AppResult<()>;
}

/// A no-op implementation of EventPublisher for testing or when real-time events are disabled.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish_notification(
        &self,
        _receiver_id: &str,
        _notification_id: &str,
        _kind: &str,
        _target_id: &str,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn publish_request_changed(
        &self,
        _actor_id: &str,
        _request_id: &str,
        _request_kind: &str,
        _status: &str,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn publish_room_changed(&self, _actor_id: &str, _room_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_chat_message(
        &self,
        _recipient_id: &str,
        _room_id: &str,
        _message_id: &str,
        _sender_id: &str,
    ) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed EventPublisher trait object.
pub type EventPublisherService = Arc<dyn EventPublisher>;
