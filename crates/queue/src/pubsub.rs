//! Redis Pub/Sub for the real-time side channel.
//!
//! Every change event is published on the affected actor's channel so a
//! gateway can wake up that actor's inbox and notification bell. Delivery is
//! at-most-once; nothing in the workflow waits on a subscriber.

#![allow(missing_docs)]

use async_trait::async_trait;
use fred::clients::{Client, SubscriberClient};
use fred::error::{Error as RedisError, ErrorKind as RedisErrorKind};
use fred::interfaces::{ClientLike, EventInterface, PubsubInterface};
use fred::types::config::Config as RedisConfig;
use matchup_common::{AppError, AppResult};
use matchup_core::services::EventPublisher;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Pub/Sub channel names.
pub mod channels {
    /// Per-actor channel infix; the full name is `{prefix}:actor:{id}`.
    pub const ACTOR_INFIX: &str = "actor";

    /// Channel carrying every event for one actor.
    #[must_use]
    pub fn actor(prefix: &str, actor_id: &str) -> String {
        format!("{prefix}:{ACTOR_INFIX}:{actor_id}")
    }
}

/// Pub/Sub event types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PubSubEvent {
    /// A notification landed in the actor's bell.
    #[serde(rename_all = "camelCase")]
    Notification {
        receiver_id: String,
        notification_id: String,
        kind: String,
        target_id: String,
    },
    /// A join request or application the actor cares about changed status.
    #[serde(rename_all = "camelCase")]
    RequestChanged {
        actor_id: String,
        request_id: String,
        request_kind: String,
        status: String,
    },
    /// A chat room in the actor's inbox was created, left or reopened.
    #[serde(rename_all = "camelCase")]
    RoomChanged { actor_id: String, room_id: String },
    /// A chat message was sent to the actor.
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        recipient_id: String,
        room_id: String,
        message_id: String,
        sender_id: String,
    },
}

impl PubSubEvent {
    /// The actor whose channel carries this event.
    #[must_use]
    pub fn actor_id(&self) -> &str {
        match self {
            Self::Notification { receiver_id, .. } => receiver_id,
            Self::RequestChanged { actor_id, .. } | Self::RoomChanged { actor_id, .. } => actor_id,
            Self::ChatMessage { recipient_id, .. } => recipient_id,
        }
    }
}

/// Redis Pub/Sub manager for event distribution.
#[derive(Clone)]
pub struct RedisPubSub {
    publisher: Client,
    subscriber: SubscriberClient,
    prefix: String,
    /// Local broadcast channel for events received from Redis.
    local_tx: broadcast::Sender<PubSubEvent>,
}

impl RedisPubSub {
    /// Create a new Redis Pub/Sub manager.
    pub async fn new(redis_url: &str, prefix: &str) -> Result<Self, RedisError> {
        let config = RedisConfig::from_url(redis_url)?;

        let publisher = Client::new(config.clone(), None, None, None);
        publisher.init().await?;

        let subscriber = SubscriberClient::new(config, None, None, None);
        subscriber.init().await?;

        let (local_tx, _) = broadcast::channel(1000);

        info!(prefix = %prefix, "Redis Pub/Sub initialized");

        Ok(Self {
            publisher,
            subscriber,
            prefix: prefix.to_string(),
            local_tx,
        })
    }

    /// Forward messages from subscribed channels to local receivers.
    pub fn start(&self) {
        let local_tx = self.local_tx.clone();
        let mut message_stream = self.subscriber.message_rx();

        tokio::spawn(async move {
            while let Ok(message) = message_stream.recv().await {
                if let Some(payload) = message.value.as_string() {
                    match serde_json::from_str::<PubSubEvent>(&payload) {
                        Ok(event) => {
                            debug!(?event, "Received Pub/Sub event");
                            if local_tx.send(event).is_err() {
                                debug!("No local subscribers for Pub/Sub event");
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse Pub/Sub message: {}", e);
                        }
                    }
                }
            }
            info!("Pub/Sub message stream ended");
        });
    }

    /// Subscribe to an actor's events.
    pub async fn subscribe_actor(&self, actor_id: &str) -> Result<(), RedisError> {
        let channel = channels::actor(&self.prefix, actor_id);
        self.subscriber.subscribe(&channel).await?;
        debug!(actor_id, "Subscribed to actor channel");
        Ok(())
    }

    /// Unsubscribe from an actor's events.
    pub async fn unsubscribe_actor(&self, actor_id: &str) -> Result<(), RedisError> {
        let channel = channels::actor(&self.prefix, actor_id);
        self.subscriber.unsubscribe(&channel).await?;
        debug!(actor_id, "Unsubscribed from actor channel");
        Ok(())
    }

    /// Publish an event on its actor's channel.
    pub async fn publish(&self, event: &PubSubEvent) -> Result<(), RedisError> {
        let channel = channels::actor(&self.prefix, event.actor_id());
        let payload = serde_json::to_string(event).map_err(|e| {
            RedisError::new(
                RedisErrorKind::InvalidArgument,
                format!("Serialization error: {e}"),
            )
        })?;
        let _: () = self.publisher.publish(&channel, payload).await?;
        debug!(channel = %channel, ?event, "Published Pub/Sub event");
        Ok(())
    }

    /// Get a receiver for local broadcast events.
    #[must_use]
    pub fn subscribe_local(&self) -> broadcast::Receiver<PubSubEvent> {
        self.local_tx.subscribe()
    }

    /// Shutdown the Pub/Sub manager.
    pub async fn shutdown(&self) -> Result<(), RedisError> {
        self.subscriber.quit().await?;
        self.publisher.quit().await?;
        info!("Redis Pub/Sub shutdown");
        Ok(())
    }

    async fn publish_app(&self, event: PubSubEvent) -> AppResult<()> {
        self.publish(&event)
            .await
            .map_err(|e| AppError::Redis(e.to_string()))
    }
}

/// Lets core services publish without depending on this crate.
#[async_trait]
impl EventPublisher for RedisPubSub {
    async fn publish_notification(
        &self,
        receiver_id: &str,
        notification_id: &str,
        kind: &str,
        target_id: &str,
    ) -> AppResult<()> {
        self.publish_app(PubSubEvent::Notification {
            receiver_id: receiver_id.to_string(),
            notification_id: notification_id.to_string(),
            kind: kind.to_string(),
            target_id: target_id.to_string(),
        })
        .await
    }

    async fn publish_request_changed(
        &self,
        actor_id: &str,
        request_id: &str,
        request_kind: &str,
        status: &str,
    ) -> AppResult<()> {
        self.publish_app(PubSubEvent::RequestChanged {
            actor_id: actor_id.to_string(),
            request_id: request_id.to_string(),
            request_kind: request_kind.to_string(),
            status: status.to_string(),
        })
        .await
    }

    async fn publish_room_changed(&self, actor_id: &str, room_id: &str) -> AppResult<()> {
        self.publish_app(PubSubEvent::RoomChanged {
            actor_id: actor_id.to_string(),
            room_id: room_id.to_string(),
        })
        .await
    }

    async fn publish_chat_message(
        &self,
        recipient_id: &str,
        room_id: &str,
        message_id: &str,
        sender_id: &str,
    ) -> AppResult<()> {
        self.publish_app(PubSubEvent::ChatMessage {
            recipient_id: recipient_id.to_string(),
            room_id: room_id.to_string(),
            message_id: message_id.to_string(),
            sender_id: sender_id.to_string(),
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_channel_name() {
        assert_eq!(channels::actor("matchup", "a1"), "matchup:actor:a1");
    }

    #[test]
    fn test_notification_event_serialization() {
        let event = PubSubEvent::Notification {
            receiver_id: "a1".to_string(),
            notification_id: "n1".to_string(),
            kind: "MATCH_APPLY".to_string(),
            target_id: "app1".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"notification\""));
        assert!(json.contains("\"receiverId\":\"a1\""));

        let parsed: PubSubEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_events_route_to_affected_actor() {
        let room = PubSubEvent::RoomChanged {
            actor_id: "host".to_string(),
            room_id: "r1".to_string(),
        };
        let message = PubSubEvent::ChatMessage {
            recipient_id: "boxer".to_string(),
            room_id: "r1".to_string(),
            message_id: "msg1".to_string(),
            sender_id: "host".to_string(),
        };

        assert_eq!(room.actor_id(), "host");
        assert_eq!(message.actor_id(), "boxer");
        assert!(
            serde_json::to_string(&message)
                .unwrap()
                .contains("\"type\":\"chatMessage\"")
        );
    }
}
