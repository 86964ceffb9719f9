//! Notification service.
//!
//! Notifications are written through a transactional outbox: the ledger
//! calls [`NotificationService::enqueue_in`] inside its own transaction, and
//! after commit [`NotificationService::dispatch`] turns the outbox rows into
//! notifications. Rows that fail are retried by the sweeper with exponential
//! backoff and abandoned after the configured number of attempts.

use std::collections::HashSet;

use crate::services::event_publisher::EventPublisherService;
use chrono::Utc;
use matchup_common::{AppError, AppResult, IdGenerator, RetryPolicy};
use matchup_db::{
    entities::{
        chat_room, join_request, match_application, match_post,
        notification::{self, NotificationKind},
        notification_outbox::{self, OutboxStatus},
    },
    repositories::{NotificationOutboxRepository, NotificationRepository},
};
use sea_orm::{ConnectionTrait, Set, TransactionTrait};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

/// Longest message excerpt carried in notification metadata, in characters.
pub const EXCERPT_MAX_CHARS: usize = 80;

/// A notification addressed to one receiver, before it reaches the outbox.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    pub receiver_id: String,
    pub sender_id: Option<String>,
    pub kind: NotificationKind,
    pub target_id: String,
    pub title: String,
    pub body: String,
    pub redirect_target: String,
    pub metadata: serde_json::Value,
}

/// State transitions that fan out notifications.
#[derive(Debug, Clone)]
pub enum NotificationTrigger {
    /// A join request was submitted; `authorities` are the group owner and leaders.
    JoinRequestSubmitted {
        request: join_request::Model,
        group_name: String,
        requester_name: String,
        authorities: Vec<String>,
    },
    /// A join request was approved or rejected.
    JoinRequestDecided {
        request: join_request::Model,
        group_name: String,
    },
    /// An application to a match was submitted.
    ApplicationSubmitted {
        application: match_application::Model,
        match_post: match_post::Model,
        applicant_name: String,
    },
    /// An application was accepted or rejected.
    ApplicationDecided {
        application: match_application::Model,
        match_post: match_post::Model,
    },
    /// A chat room was provisioned for an accepted applicant.
    ChatOpened {
        room: chat_room::Model,
        match_post: match_post::Model,
        host_name: String,
    },
}

impl NotificationTrigger {
    /// Compute the receiver set and render one draft per receiver.
    #[must_use]
    pub fn drafts(&self) -> Vec<NotificationDraft> {
        match self {
            Self::JoinRequestSubmitted {
                request,
                group_name,
                requester_name,
                authorities,
            } => {
                let mut seen = HashSet::new();
                authorities
                    .iter()
                    .filter(|id| *id != &request.requester_id && seen.insert(id.as_str()))
                    .map(|receiver| NotificationDraft {
                        receiver_id: receiver.clone(),
                        sender_id: Some(request.requester_id.clone()),
                        kind: NotificationKind::JoinRequest,
                        target_id: request.id.clone(),
                        title: "New join request".to_string(),
                        body: format!("{requester_name} wants to join {group_name}"),
                        redirect_target: format!("/groups/{}/requests", request.group_id),
                        metadata: json!({
                            "groupId": request.group_id,
                            "groupName": group_name,
                            "requesterName": requester_name,
                            "excerpt": request.message.as_deref().map(excerpt),
                        }),
                    })
                    .collect()
            }
            Self::JoinRequestDecided {
                request,
                group_name,
            } => {
                let (kind, title, body) = match request.status {
                    join_request::JoinRequestStatus::Approved => (
                        NotificationKind::JoinApproved,
                        "Join request approved",
                        format!("You are now a member of {group_name}"),
                    ),
                    _ => (
                        NotificationKind::JoinRejected,
                        "Join request declined",
                        format!("Your request to join {group_name} was declined"),
                    ),
                };

                vec![NotificationDraft {
                    receiver_id: request.requester_id.clone(),
                    sender_id: request.decided_by.clone(),
                    kind,
                    target_id: request.id.clone(),
                    title: title.to_string(),
                    body,
                    redirect_target: format!("/groups/{}", request.group_id),
                    metadata: json!({
                        "groupId": request.group_id,
                        "groupName": group_name,
                    }),
                }]
            }
            Self::ApplicationSubmitted {
                application,
                match_post,
                applicant_name,
            } => vec![NotificationDraft {
                receiver_id: match_post.host_actor_id.clone(),
                sender_id: Some(application.applicant_actor_id.clone()),
                kind: NotificationKind::MatchApply,
                target_id: application.id.clone(),
                title: "New application".to_string(),
                body: format!("{applicant_name} applied to {}", match_post.title),
                redirect_target: format!("/matches/{}/applications", match_post.id),
                metadata: json!({
                    "matchId": match_post.id,
                    "matchTitle": match_post.title,
                    "applicantName": applicant_name,
                    "applicantProfileId": application.applicant_profile_id,
                    "attributeSnapshot": application.attribute_snapshot,
                    "excerpt": application.message.as_deref().map(excerpt),
                }),
            }],
            Self::ApplicationDecided {
                application,
                match_post,
            } => {
                let (kind, title, body) = match application.status {
                    match_application::ApplicationStatus::Accepted => (
                        NotificationKind::MatchAccepted,
                        "Application accepted",
                        format!("You're in for {}", match_post.title),
                    ),
                    _ => (
                        NotificationKind::MatchRejected,
                        "Application declined",
                        format!("Your application to {} was declined", match_post.title),
                    ),
                };

                vec![NotificationDraft {
                    receiver_id: application.applicant_actor_id.clone(),
                    sender_id: application.decided_by.clone(),
                    kind,
                    target_id: application.id.clone(),
                    title: title.to_string(),
                    body,
                    redirect_target: format!("/matches/{}", match_post.id),
                    metadata: json!({
                        "matchId": match_post.id,
                        "matchTitle": match_post.title,
                    }),
                }]
            }
            Self::ChatOpened {
                room,
                match_post,
                host_name,
            } => vec![NotificationDraft {
                receiver_id: room.counterpart_actor_id.clone(),
                sender_id: Some(room.host_actor_id.clone()),
                kind: NotificationKind::ChatOpen,
                target_id: room.id.clone(),
                title: "Chat opened".to_string(),
                body: format!("{host_name} opened a chat for {}", match_post.title),
                redirect_target: format!("/chats/{}", room.id),
                metadata: json!({
                    "matchId": match_post.id,
                    "matchTitle": match_post.title,
                    "hostName": host_name,
                }),
            }],
        }
    }
}

/// Shorten free text to [`EXCERPT_MAX_CHARS`] characters.
#[must_use]
pub fn excerpt(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= EXCERPT_MAX_CHARS {
        return text.to_string();
    }

    let mut out: String = text.chars().take(EXCERPT_MAX_CHARS - 1).collect();
    out.push('…');
    out
}

/// Outcome of a delivery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    pub delivered: usize,
    pub rescheduled: usize,
    pub abandoned: usize,
}

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    outbox_repo: NotificationOutboxRepository,
    event_publisher: Option<EventPublisherService>,
    retry_policy: RetryPolicy,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(
        notification_repo: NotificationRepository,
        outbox_repo: NotificationOutboxRepository,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            notification_repo,
            outbox_repo,
            event_publisher: None,
            retry_policy,
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    // ==================== Outbox ====================

    /// Write outbox rows for `trigger` on the caller's connection or transaction.
    ///
    /// Returns the outbox IDs to hand to [`Self::dispatch`] after commit.
    pub async fn enqueue_in<C: ConnectionTrait>(
        conn: &C,
        trigger: &NotificationTrigger,
    ) -> AppResult<Vec<String>> {
        let id_gen = IdGenerator::new();
        let now = Utc::now();

        let mut ids = Vec::new();
        let rows = trigger
            .drafts()
            .into_iter()
            .map(|draft| {
                let id = id_gen.generate();
                ids.push(id.clone());
                notification_outbox::ActiveModel {
                    id: Set(id),
                    receiver_id: Set(draft.receiver_id),
                    sender_id: Set(draft.sender_id),
                    kind: Set(draft.kind),
                    target_id: Set(draft.target_id),
                    title: Set(draft.title),
                    body: Set(draft.body),
                    redirect_target: Set(draft.redirect_target),
                    metadata: Set(draft.metadata),
                    status: Set(OutboxStatus::Pending),
                    attempts: Set(0),
                    last_error: Set(None),
                    next_attempt_at: Set(now.into()),
                    created_at: Set(now.into()),
                    delivered_at: Set(None),
                }
            })
            .collect::<Vec<_>>();

        NotificationOutboxRepository::insert_many(conn, rows).await?;
        Ok(ids)
    }

    /// Deliver freshly committed outbox rows.
    ///
    /// Never fails: problems are recorded on the rows for the sweeper.
    pub async fn dispatch(&self, outbox_ids: &[String]) -> DeliveryReport {
        let rows = match self.outbox_repo.find_pending_by_ids(outbox_ids).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, count = outbox_ids.len(), "Failed to load outbox rows; leaving them to the sweeper");
                return DeliveryReport::default();
            }
        };

        self.deliver_all(rows).await
    }

    /// Retry outbox rows whose next attempt is due.
    pub async fn retry_due(&self, batch_size: u64) -> AppResult<DeliveryReport> {
        let rows = self.outbox_repo.find_due(Utc::now().into(), batch_size).await?;
        if rows.is_empty() {
            return Ok(DeliveryReport::default());
        }

        debug!(count = rows.len(), "Retrying due notifications");
        Ok(self.deliver_all(rows).await)
    }

    async fn deliver_all(&self, rows: Vec<notification_outbox::Model>) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for row in rows {
            match self.deliver(&row).await {
                Ok(()) => {
                    report.delivered += 1;
                    self.publish(&row).await;
                }
                Err(e) => {
                    if self.record_failure(&row, &e).await {
                        report.rescheduled += 1;
                    } else {
                        report.abandoned += 1;
                    }
                }
            }
        }

        report
    }

    async fn deliver(&self, row: &notification_outbox::Model) -> AppResult<()> {
        let txn = self.outbox_repo.db().begin().await?;

        let model = notification::ActiveModel {
            id: Set(row.id.clone()),
            receiver_id: Set(row.receiver_id.clone()),
            sender_id: Set(row.sender_id.clone()),
            kind: Set(row.kind),
            target_id: Set(row.target_id.clone()),
            title: Set(row.title.clone()),
            body: Set(row.body.clone()),
            redirect_target: Set(row.redirect_target.clone()),
            metadata: Set(row.metadata.clone()),
            is_read: Set(false),
            created_at: Set(row.created_at),
        };

        NotificationRepository::create_if_absent(&txn, model).await?;
        NotificationOutboxRepository::mark_delivered(&txn, &row.id).await?;
        txn.commit().await?;

        Ok(())
    }

    /// Record a failed attempt. Returns `false` when the row was abandoned.
    async fn record_failure(&self, row: &notification_outbox::Model, err: &AppError) -> bool {
        let attempts = row.attempts.saturating_add(1);
        let failed = u32::try_from(attempts).unwrap_or(u32::MAX);
        let retry = err.is_retryable() && self.retry_policy.should_retry(failed);

        let next_attempt_at = if retry {
            let delay = self.retry_policy.delay_after(failed);
            let delay = chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::days(1));
            Some((Utc::now() + delay).into())
        } else {
            None
        };

        if retry {
            warn!(
                outbox_id = %row.id,
                receiver_id = %row.receiver_id,
                kind = row.kind.as_str(),
                attempts = attempts,
                error = %err,
                "Notification delivery failed; rescheduled"
            );
        } else {
            error!(
                outbox_id = %row.id,
                receiver_id = %row.receiver_id,
                kind = row.kind.as_str(),
                attempts = attempts,
                error = %err,
                "Notification delivery abandoned"
            );
        }

        if let Err(e) = self
            .outbox_repo
            .record_failure(&row.id, attempts, &err.to_string(), next_attempt_at)
            .await
        {
            error!(outbox_id = %row.id, error = %e, "Failed to record notification failure");
        }

        retry
    }

    async fn publish(&self, row: &notification_outbox::Model) {
        if let Some(ref publisher) = self.event_publisher {
            if let Err(e) = publisher
                .publish_notification(&row.receiver_id, &row.id, row.kind.as_str(), &row.target_id)
                .await
            {
                warn!(receiver_id = %row.receiver_id, error = %e, "Failed to publish notification event");
            }
        }
    }

    // ==================== Receiver side ====================

    /// List a receiver's notifications, newest first.
    pub async fn list(
        &self,
        receiver_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        let limit = limit.clamp(1, 100);
        self.notification_repo
            .find_by_receiver(receiver_id, limit, until_id, unread_only)
            .await
    }

    /// Count unread notifications.
    pub async fn count_unread(&self, receiver_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(receiver_id).await
    }

    /// Mark one notification as read. Only the receiver may do this.
    pub async fn mark_read(&self, receiver_id: &str, notification_id: &str) -> AppResult<()> {
        let rows = self
            .notification_repo
            .mark_as_read(notification_id, receiver_id)
            .await?;

        if rows == 0 {
            return Err(AppError::NotFound(format!(
                "Notification not found: {notification_id}"
            )));
        }

        Ok(())
    }

    /// Mark all of a receiver's notifications as read.
    pub async fn mark_all_read(&self, receiver_id: &str) -> AppResult<u64> {
        let rows = self.notification_repo.mark_all_as_read(receiver_id).await?;
        info!(receiver_id = %receiver_id, count = rows, "Marked notifications as read");
        Ok(rows)
    }

    /// Delete one notification. Only the receiver may do this.
    pub async fn delete(&self, receiver_id: &str, notification_id: &str) -> AppResult<()> {
        let rows = self
            .notification_repo
            .delete(notification_id, receiver_id)
            .await?;

        if rows == 0 {
            return Err(AppError::NotFound(format!(
                "Notification not found: {notification_id}"
            )));
        }

        Ok(())
    }

    /// Delete all of a receiver's notifications.
    pub async fn delete_all(&self, receiver_id: &str) -> AppResult<u64> {
        self.notification_repo
            .delete_all_for_receiver(receiver_id)
            .await
    }
}
