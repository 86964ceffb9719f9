//! Request ledger service.
//!
//! Owns the lifecycle of join requests and match applications. A decision
//! runs as one database transaction: status compare-and-set, the implied
//! membership or chat room, and the outbox rows for its notifications.
//! Notifications are delivered after commit and never fail the decision.

use crate::services::conversation::ConversationService;
use crate::services::directory::DirectoryService;
use crate::services::event_publisher::EventPublisherService;
use crate::services::membership::MembershipService;
use crate::services::notification::{NotificationService, NotificationTrigger};
use chrono::Utc;
use matchup_common::{AppError, AppResult, IdGenerator};
use matchup_db::{
    entities::{
        group,
        join_request::{self, JoinRequestStatus},
        match_application::{self, ApplicationStatus},
        match_post::{self, MatchStatus},
    },
    repositories::{
        GroupRepository, JoinRequestRepository, MatchApplicationRepository, MatchPostRepository,
        MembershipRepository,
    },
};
use sea_orm::{Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

const JOIN_REQUEST_KIND: &str = "join_request";
const APPLICATION_KIND: &str = "match_application";

/// Input for asking to join a group.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJoinRequestInput {
    #[validate(length(min = 1))]
    pub group_id: String,
    #[validate(length(max = 1000))]
    pub message: Option<String>,
}

/// Input for applying to a match.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationInput {
    #[validate(length(min = 1))]
    pub match_id: String,
    #[validate(length(min = 1))]
    pub profile_id: String,
    #[validate(length(max = 1000))]
    pub message: Option<String>,
    /// Weight class or similar attribute at application time.
    #[validate(length(max = 64))]
    pub attribute_snapshot: Option<String>,
}

/// Decision on a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinDecision {
    Approve,
    Reject,
}

impl JoinDecision {
    const fn status(self) -> JoinRequestStatus {
        match self {
            Self::Approve => JoinRequestStatus::Approved,
            Self::Reject => JoinRequestStatus::Rejected,
        }
    }
}

/// Decision on a match application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationDecision {
    Accept,
    Reject,
}

impl ApplicationDecision {
    const fn status(self) -> ApplicationStatus {
        match self {
            Self::Accept => ApplicationStatus::Accepted,
            Self::Reject => ApplicationStatus::Rejected,
        }
    }
}

/// Request ledger service for business logic.
#[derive(Clone)]
pub struct RequestLedgerService {
    join_request_repo: JoinRequestRepository,
    application_repo: MatchApplicationRepository,
    group_repo: GroupRepository,
    match_repo: MatchPostRepository,
    membership_repo: MembershipRepository,
    directory: DirectoryService,
    notification_service: NotificationService,
    event_publisher: Option<EventPublisherService>,
    history_limit: u64,
}

impl RequestLedgerService {
    /// Create a new request ledger service.
    #[must_use]
    pub const fn new(
        join_request_repo: JoinRequestRepository,
        application_repo: MatchApplicationRepository,
        group_repo: GroupRepository,
        match_repo: MatchPostRepository,
        membership_repo: MembershipRepository,
        directory: DirectoryService,
        notification_service: NotificationService,
        history_limit: u64,
    ) -> Self {
        Self {
            join_request_repo,
            application_repo,
            group_repo,
            match_repo,
            membership_repo,
            directory,
            notification_service,
            event_publisher: None,
            history_limit,
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    // ==================== Join requests ====================

    /// Ask to join a group.
    pub async fn submit_join_request(
        &self,
        requester_id: &str,
        input: SubmitJoinRequestInput,
    ) -> AppResult<join_request::Model> {
        input.validate()?;

        let requester = self.directory.require_actor(requester_id).await?;
        let group = self.group_repo.get_by_id(&input.group_id).await?;

        if group.owner_id == requester_id {
            return Err(AppError::NotEligible(
                "You already own this group".to_string(),
            ));
        }
        if self.membership_repo.exists(&group.id, requester_id).await? {
            return Err(AppError::NotEligible(
                "You are already a member of this group".to_string(),
            ));
        }

        let authorities = self.group_authorities(&group).await?;

        let model = join_request::ActiveModel {
            id: Set(IdGenerator::new().generate()),
            requester_id: Set(requester_id.to_string()),
            group_id: Set(group.id.clone()),
            status: Set(JoinRequestStatus::Pending),
            message: Set(input.message.map(|m| m.trim().to_string()).filter(|m| !m.is_empty())),
            created_at: Set(Utc::now().into()),
            decided_at: Set(None),
            decided_by: Set(None),
        };

        let txn = self.join_request_repo.db().begin().await?;
        let request = JoinRequestRepository::create(&txn, model).await?;
        let outbox_ids = NotificationService::enqueue_in(
            &txn,
            &NotificationTrigger::JoinRequestSubmitted {
                request: request.clone(),
                group_name: group.name.clone(),
                requester_name: requester.display_name,
                authorities: authorities.clone(),
            },
        )
        .await?;
        txn.commit().await?;

        info!(request_id = %request.id, group_id = %group.id, requester_id = %requester_id, "Join request submitted");

        self.notification_service.dispatch(&outbox_ids).await;
        for authority in &authorities {
            self.publish_request_changed(authority, &request.id, JOIN_REQUEST_KIND, request.status.as_str())
                .await;
        }

        Ok(request)
    }

    /// Approve or reject a pending join request.
    ///
    /// Approval creates the membership in the same transaction as the status
    /// change, so an approved request never lacks its membership.
    pub async fn decide_join_request(
        &self,
        request_id: &str,
        decision: JoinDecision,
        decider_id: &str,
    ) -> AppResult<join_request::Model> {
        let request = self
            .join_request_repo
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Join request not found: {request_id}")))?;
        let group = self.group_repo.get_by_id(&request.group_id).await?;

        self.require_group_authority(&group, decider_id).await?;

        if request.status.is_terminal() {
            return Err(AppError::AlreadyDecided(format!(
                "Join request was already {}",
                request.status.as_str()
            )));
        }

        let status = decision.status();
        let decided_at = Utc::now().into();

        let txn = self.join_request_repo.db().begin().await?;
        let rows =
            JoinRequestRepository::transition(&txn, &request.id, status, decider_id, decided_at)
                .await?;
        if rows == 0 {
            txn.rollback().await?;
            return Err(AppError::AlreadyDecided(
                "Join request was decided concurrently".to_string(),
            ));
        }

        let decided = join_request::Model {
            status,
            decided_at: Some(decided_at),
            decided_by: Some(decider_id.to_string()),
            ..request
        };

        if status == JoinRequestStatus::Approved {
            MembershipService::materialize_in(&txn, &decided.group_id, &decided.requester_id)
                .await?;
        }

        let outbox_ids = NotificationService::enqueue_in(
            &txn,
            &NotificationTrigger::JoinRequestDecided {
                request: decided.clone(),
                group_name: group.name.clone(),
            },
        )
        .await?;
        txn.commit().await?;

        info!(
            request_id = %decided.id,
            group_id = %decided.group_id,
            decider_id = %decider_id,
            status = decided.status.as_str(),
            "Join request decided"
        );

        self.notification_service.dispatch(&outbox_ids).await;
        self.publish_request_changed(
            &decided.requester_id,
            &decided.id,
            JOIN_REQUEST_KIND,
            decided.status.as_str(),
        )
        .await;

        Ok(decided)
    }

    /// Pending requests of a group, newest first. Authorities only.
    pub async fn list_pending_join_requests(
        &self,
        group_id: &str,
        viewer_id: &str,
    ) -> AppResult<Vec<join_request::Model>> {
        let group = self.group_repo.get_by_id(group_id).await?;
        self.require_group_authority(&group, viewer_id).await?;

        self.join_request_repo
            .find_pending_for_groups(&[group.id])
            .await
    }

    /// Decided requests of a group, newest first. Authorities only.
    pub async fn list_join_request_history(
        &self,
        group_id: &str,
        viewer_id: &str,
        limit: u64,
    ) -> AppResult<Vec<join_request::Model>> {
        let group = self.group_repo.get_by_id(group_id).await?;
        self.require_group_authority(&group, viewer_id).await?;

        self.join_request_repo
            .find_decided_for_groups(&[group.id], self.clamp_history(limit))
            .await
    }

    /// Requests the viewer has submitted, newest first.
    pub async fn list_my_join_requests(
        &self,
        requester_id: &str,
        limit: u64,
    ) -> AppResult<Vec<join_request::Model>> {
        self.join_request_repo
            .find_by_requester(requester_id, self.clamp_history(limit))
            .await
    }

    async fn group_authorities(&self, group: &group::Model) -> AppResult<Vec<String>> {
        let mut authorities = vec![group.owner_id.clone()];
        authorities.extend(
            MembershipRepository::find_leaders_in(self.membership_repo.db(), &group.id)
                .await?
                .into_iter()
                .map(|m| m.member_actor_id),
        );

        Ok(authorities)
    }

    /// The owner and leader members decide on a group's requests.
    async fn require_group_authority(&self, group: &group::Model, actor_id: &str) -> AppResult<()> {
        if group.owner_id == actor_id {
            return Ok(());
        }

        let membership =
            MembershipRepository::find_pair_in(self.membership_repo.db(), &group.id, actor_id)
                .await?;
        if membership.is_some_and(|m| m.role.can_decide_requests()) {
            return Ok(());
        }

        Err(AppError::NotAuthorized(
            "Only the group owner or a leader can do this".to_string(),
        ))
    }

    // ==================== Match applications ====================

    /// Apply to a match with one of the applicant's sport profiles.
    pub async fn submit_application(
        &self,
        applicant_id: &str,
        input: SubmitApplicationInput,
    ) -> AppResult<match_application::Model> {
        input.validate()?;

        self.directory.require_actor(applicant_id).await?;
        let match_post = self.match_repo.get_by_id(&input.match_id).await?;

        if match_post.host_actor_id == applicant_id {
            return Err(AppError::NotEligible(
                "You cannot apply to your own match".to_string(),
            ));
        }
        if match_post.status != MatchStatus::Open {
            return Err(AppError::NotEligible(
                "This match is no longer taking applications".to_string(),
            ));
        }

        let profile = self
            .directory
            .get_profile(&input.profile_id)
            .await?
            .ok_or_else(|| AppError::NotEligible("Complete your profile first".to_string()))?;
        if profile.actor_id != applicant_id {
            return Err(AppError::NotEligible(
                "That profile belongs to someone else".to_string(),
            ));
        }
        if profile.sport != match_post.sport {
            return Err(AppError::NotEligible(format!(
                "A {} profile is required for this match",
                match_post.sport
            )));
        }

        let model = match_application::ActiveModel {
            id: Set(IdGenerator::new().generate()),
            match_id: Set(match_post.id.clone()),
            applicant_actor_id: Set(applicant_id.to_string()),
            applicant_profile_id: Set(profile.id.clone()),
            status: Set(ApplicationStatus::Pending),
            message: Set(input.message.map(|m| m.trim().to_string()).filter(|m| !m.is_empty())),
            attribute_snapshot: Set(input.attribute_snapshot.or_else(|| profile.attribute.clone())),
            created_at: Set(Utc::now().into()),
            decided_at: Set(None),
            decided_by: Set(None),
        };

        let txn = self.application_repo.db().begin().await?;
        let application = MatchApplicationRepository::create(&txn, model).await?;
        let outbox_ids = NotificationService::enqueue_in(
            &txn,
            &NotificationTrigger::ApplicationSubmitted {
                application: application.clone(),
                match_post: match_post.clone(),
                applicant_name: profile.nickname,
            },
        )
        .await?;
        txn.commit().await?;

        info!(application_id = %application.id, match_id = %match_post.id, applicant_id = %applicant_id, "Application submitted");

        self.notification_service.dispatch(&outbox_ids).await;
        self.publish_request_changed(
            &match_post.host_actor_id,
            &application.id,
            APPLICATION_KIND,
            application.status.as_str(),
        )
        .await;

        Ok(application)
    }

    /// Accept or reject a pending application. Only the host may decide.
    ///
    /// Acceptance provisions the chat room with the applicant in the same
    /// transaction and notifies them that the chat is open.
    pub async fn decide_application(
        &self,
        application_id: &str,
        decision: ApplicationDecision,
        decider_id: &str,
    ) -> AppResult<match_application::Model> {
        let application = self
            .application_repo
            .find_by_id(application_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Application not found: {application_id}"))
            })?;
        let match_post = self.match_repo.get_by_id(&application.match_id).await?;

        Self::require_host(&match_post, decider_id)?;

        if application.status.is_terminal() {
            return Err(AppError::AlreadyDecided(format!(
                "Application was already {}",
                application.status.as_str()
            )));
        }

        // Rendered before the transaction; the pool may hold one connection.
        let host_name = if decision == ApplicationDecision::Accept {
            Some(
                self.directory
                    .display_name(&match_post.host_actor_id, Some(&match_post.sport))
                    .await?,
            )
        } else {
            None
        };

        let status = decision.status();
        let decided_at = Utc::now().into();

        let txn = self.application_repo.db().begin().await?;
        let rows = MatchApplicationRepository::transition(
            &txn,
            &application.id,
            status,
            decider_id,
            decided_at,
        )
        .await?;
        if rows == 0 {
            txn.rollback().await?;
            return Err(AppError::AlreadyDecided(
                "Application was decided concurrently".to_string(),
            ));
        }

        let decided = match_application::Model {
            status,
            decided_at: Some(decided_at),
            decided_by: Some(decider_id.to_string()),
            ..application
        };

        let mut outbox_ids = NotificationService::enqueue_in(
            &txn,
            &NotificationTrigger::ApplicationDecided {
                application: decided.clone(),
                match_post: match_post.clone(),
            },
        )
        .await?;

        let mut opened_room = None;
        if let Some(host_name) = host_name {
            let (room, created) =
                ConversationService::ensure_room_in(&txn, &match_post, &decided.applicant_actor_id)
                    .await?;
            if created {
                outbox_ids.extend(
                    NotificationService::enqueue_in(
                        &txn,
                        &NotificationTrigger::ChatOpened {
                            room: room.clone(),
                            match_post: match_post.clone(),
                            host_name,
                        },
                    )
                    .await?,
                );
                opened_room = Some(room);
            }
        }
        txn.commit().await?;

        info!(
            application_id = %decided.id,
            match_id = %decided.match_id,
            decider_id = %decider_id,
            status = decided.status.as_str(),
            "Application decided"
        );

        self.notification_service.dispatch(&outbox_ids).await;
        self.publish_request_changed(
            &decided.applicant_actor_id,
            &decided.id,
            APPLICATION_KIND,
            decided.status.as_str(),
        )
        .await;
        if let Some(room) = opened_room {
            self.publish_room_changed(&room.host_actor_id, &room.id).await;
            self.publish_room_changed(&room.counterpart_actor_id, &room.id)
                .await;
        }

        Ok(decided)
    }

    /// Pending applications to a match, newest first. Host only.
    pub async fn list_pending_applications(
        &self,
        match_id: &str,
        viewer_id: &str,
    ) -> AppResult<Vec<match_application::Model>> {
        let match_post = self.match_repo.get_by_id(match_id).await?;
        Self::require_host(&match_post, viewer_id)?;

        self.application_repo
            .find_pending_for_matches(&[match_post.id])
            .await
    }

    /// Decided applications to a match, newest first. Host only.
    pub async fn list_application_history(
        &self,
        match_id: &str,
        viewer_id: &str,
        limit: u64,
    ) -> AppResult<Vec<match_application::Model>> {
        let match_post = self.match_repo.get_by_id(match_id).await?;
        Self::require_host(&match_post, viewer_id)?;

        self.application_repo
            .find_decided_for_matches(&[match_post.id], self.clamp_history(limit))
            .await
    }

    /// Applications the viewer has made, newest first.
    pub async fn list_my_applications(
        &self,
        applicant_id: &str,
        limit: u64,
    ) -> AppResult<Vec<match_application::Model>> {
        self.application_repo
            .find_by_applicant(applicant_id, self.clamp_history(limit))
            .await
    }

    fn require_host(match_post: &match_post::Model, actor_id: &str) -> AppResult<()> {
        if match_post.host_actor_id == actor_id {
            Ok(())
        } else {
            Err(AppError::NotAuthorized(
                "Only the match host can do this".to_string(),
            ))
        }
    }

    // ==================== Helpers ====================

    fn clamp_history(&self, limit: u64) -> u64 {
        limit.clamp(1, self.history_limit.max(1))
    }

    async fn publish_request_changed(
        &self,
        actor_id: &str,
        request_id: &str,
        request_kind: &str,
        status: &str,
    ) {
        if let Some(ref publisher) = self.event_publisher {
            if let Err(e) = publisher
                .publish_request_changed(actor_id, request_id, request_kind, status)
                .await
            {
                warn!(request_id = %request_id, error = %e, "Failed to publish request event");
            }
        }
    }

    async fn publish_room_changed(&self, actor_id: &str, room_id: &str) {
        if let Some(ref publisher) = self.event_publisher {
            if let Err(e) = publisher.publish_room_changed(actor_id, room_id).await {
                warn!(room_id = %room_id, error = %e, "Failed to publish room event");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use matchup_common::RetryPolicy;
    use matchup_db::entities::{
        NotificationOutbox,
        membership::MemberRole,
        notification::NotificationKind,
        notification_outbox::{self, OutboxStatus},
    };
    use matchup_db::repositories::{
        ActorRepository, ChatRepository, NotificationOutboxRepository, NotificationRepository,
        SportProfileRepository,
    };
    use matchup_db::test_utils::{
        insert_actor, insert_group, insert_match, insert_membership, insert_sport_profile,
        setup_sqlite,
    };
    use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixture {
        db: Arc<DatabaseConnection>,
        ledger: RequestLedgerService,
        notifications: NotificationService,
    }

    async fn fixture_with_policy(retry_policy: RetryPolicy) -> Fixture {
        let db = Arc::new(setup_sqlite().await.unwrap());

        insert_actor(&db, "owner", "Coach Kim").await.unwrap();
        insert_actor(&db, "leader", "Captain").await.unwrap();
        insert_actor(&db, "rookie", "Rookie").await.unwrap();
        insert_actor(&db, "host", "Host Gym").await.unwrap();
        insert_actor(&db, "boxer", "Boxer Account").await.unwrap();
        insert_group(&db, "g1", "owner", "Night Owls").await.unwrap();
        insert_membership(&db, "m-leader", "g1", "leader", MemberRole::Leader)
            .await
            .unwrap();
        insert_match(&db, "match1", "host", "boxing", "Friday sparring")
            .await
            .unwrap();
        insert_sport_profile(&db, "p-boxer", "boxer", "boxing", "Iron Fist")
            .await
            .unwrap();
        insert_sport_profile(&db, "p-boxer-futsal", "boxer", "futsal", "Winger")
            .await
            .unwrap();

        let notifications = NotificationService::new(
            NotificationRepository::new(Arc::clone(&db)),
            NotificationOutboxRepository::new(Arc::clone(&db)),
            retry_policy,
        );

        let ledger = RequestLedgerService::new(
            JoinRequestRepository::new(Arc::clone(&db)),
            MatchApplicationRepository::new(Arc::clone(&db)),
            GroupRepository::new(Arc::clone(&db)),
            MatchPostRepository::new(Arc::clone(&db)),
            MembershipRepository::new(Arc::clone(&db)),
            DirectoryService::new(
                ActorRepository::new(Arc::clone(&db)),
                SportProfileRepository::new(Arc::clone(&db)),
            ),
            notifications.clone(),
            30,
        );

        Fixture {
            db,
            ledger,
            notifications,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with_policy(RetryPolicy::default()).await
    }

    fn join_input(group_id: &str) -> SubmitJoinRequestInput {
        SubmitJoinRequestInput {
            group_id: group_id.to_string(),
            message: Some("I train three times a week".to_string()),
        }
    }

    fn application_input(profile_id: &str) -> SubmitApplicationInput {
        SubmitApplicationInput {
            match_id: "match1".to_string(),
            profile_id: profile_id.to_string(),
            message: Some("70kg, orthodox".to_string()),
            attribute_snapshot: Some("70kg".to_string()),
        }
    }

    async fn kinds_for(f: &Fixture, receiver_id: &str) -> Vec<NotificationKind> {
        f.notifications
            .list(receiver_id, 100, None, false)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.kind)
            .collect()
    }

    #[tokio::test]
    async fn test_duplicate_pending_request() {
        let f = fixture().await;

        f.ledger
            .submit_join_request("rookie", join_input("g1"))
            .await
            .unwrap();
        let second = f.ledger.submit_join_request("rookie", join_input("g1")).await;

        assert!(matches!(second, Err(AppError::DuplicatePending(_))));
    }

    #[tokio::test]
    async fn test_concurrent_submissions_leave_one_pending() {
        let f = fixture().await;

        let (a, b) = tokio::join!(
            f.ledger.submit_join_request("rookie", join_input("g1")),
            f.ledger.submit_join_request("rookie", join_input("g1")),
        );

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(AppError::DuplicatePending(_))))
        );

        let pending = f
            .ledger
            .list_pending_join_requests("g1", "owner")
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_submission_notifies_owner_and_leaders() {
        let f = fixture().await;

        f.ledger
            .submit_join_request("rookie", join_input("g1"))
            .await
            .unwrap();

        assert_eq!(kinds_for(&f, "owner").await, vec![NotificationKind::JoinRequest]);
        assert_eq!(kinds_for(&f, "leader").await, vec![NotificationKind::JoinRequest]);
        assert!(kinds_for(&f, "rookie").await.is_empty());
    }

    #[tokio::test]
    async fn test_approve_happy_path() {
        let f = fixture().await;
        let memberships = MembershipRepository::new(Arc::clone(&f.db));

        let request = f
            .ledger
            .submit_join_request("rookie", join_input("g1"))
            .await
            .unwrap();
        assert_eq!(request.status, JoinRequestStatus::Pending);

        let decided = f
            .ledger
            .decide_join_request(&request.id, JoinDecision::Approve, "owner")
            .await
            .unwrap();
        assert_eq!(decided.status, JoinRequestStatus::Approved);
        assert!(decided.decided_at.is_some());

        let membership =
            MembershipRepository::find_pair_in(memberships.db(), "g1", "rookie")
                .await
                .unwrap()
                .unwrap();
        assert_eq!(membership.role, MemberRole::Member);
        assert_eq!(kinds_for(&f, "rookie").await, vec![NotificationKind::JoinApproved]);

        let again = f
            .ledger
            .decide_join_request(&request.id, JoinDecision::Approve, "owner")
            .await;
        assert!(matches!(again, Err(AppError::AlreadyDecided(_))));
    }

    #[tokio::test]
    async fn test_decide_terminal_request_is_already_decided() {
        let f = fixture().await;

        for (requester, first) in [("rookie", JoinDecision::Approve), ("boxer", JoinDecision::Reject)] {
            let request = f
                .ledger
                .submit_join_request(requester, join_input("g1"))
                .await
                .unwrap();
            f.ledger
                .decide_join_request(&request.id, first, "owner")
                .await
                .unwrap();

            for decision in [JoinDecision::Approve, JoinDecision::Reject] {
                let result = f
                    .ledger
                    .decide_join_request(&request.id, decision, "owner")
                    .await;
                assert!(matches!(result, Err(AppError::AlreadyDecided(_))));
            }
        }
    }

    #[tokio::test]
    async fn test_leader_can_decide_and_stranger_cannot() {
        let f = fixture().await;

        let request = f
            .ledger
            .submit_join_request("rookie", join_input("g1"))
            .await
            .unwrap();

        let stranger = f
            .ledger
            .decide_join_request(&request.id, JoinDecision::Approve, "boxer")
            .await;
        assert!(matches!(stranger, Err(AppError::NotAuthorized(_))));

        let decided = f
            .ledger
            .decide_join_request(&request.id, JoinDecision::Reject, "leader")
            .await
            .unwrap();
        assert_eq!(decided.status, JoinRequestStatus::Rejected);
        assert_eq!(decided.decided_by.as_deref(), Some("leader"));
        assert_eq!(kinds_for(&f, "rookie").await, vec![NotificationKind::JoinRejected]);
    }

    #[tokio::test]
    async fn test_join_eligibility() {
        let f = fixture().await;

        let owner = f.ledger.submit_join_request("owner", join_input("g1")).await;
        assert!(matches!(owner, Err(AppError::NotEligible(_))));

        let member = f.ledger.submit_join_request("leader", join_input("g1")).await;
        assert!(matches!(member, Err(AppError::NotEligible(_))));

        let ghost = f.ledger.submit_join_request("ghost", join_input("g1")).await;
        assert!(matches!(ghost, Err(AppError::NotEligible(_))));

        let missing = f.ledger.submit_join_request("rookie", join_input("nope")).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let empty = f.ledger.submit_join_request("rookie", join_input("")).await;
        assert!(matches!(empty, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_history_is_authority_only() {
        let f = fixture().await;

        let request = f
            .ledger
            .submit_join_request("rookie", join_input("g1"))
            .await
            .unwrap();
        f.ledger
            .decide_join_request(&request.id, JoinDecision::Approve, "owner")
            .await
            .unwrap();

        let history = f
            .ledger
            .list_join_request_history("g1", "leader", 100)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert!(
            f.ledger
                .list_pending_join_requests("g1", "owner")
                .await
                .unwrap()
                .is_empty()
        );

        let denied = f.ledger.list_join_request_history("g1", "rookie", 10).await;
        assert!(matches!(denied, Err(AppError::NotAuthorized(_))));

        let mine = f.ledger.list_my_join_requests("rookie", 10).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].status, JoinRequestStatus::Approved);
    }

    #[tokio::test]
    async fn test_application_rejection_scenario() {
        let f = fixture().await;
        let chats = ChatRepository::new(Arc::clone(&f.db));

        let application = f
            .ledger
            .submit_application("boxer", application_input("p-boxer"))
            .await
            .unwrap();
        assert_eq!(application.status, ApplicationStatus::Pending);
        assert_eq!(application.attribute_snapshot.as_deref(), Some("70kg"));
        assert_eq!(kinds_for(&f, "host").await, vec![NotificationKind::MatchApply]);

        let decided = f
            .ledger
            .decide_application(&application.id, ApplicationDecision::Reject, "host")
            .await
            .unwrap();

        assert_eq!(decided.status, ApplicationStatus::Rejected);
        assert_eq!(kinds_for(&f, "boxer").await, vec![NotificationKind::MatchRejected]);
        assert!(
            ChatRepository::find_room_by_pair_in(chats.db(), "match1", "boxer")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_accept_opens_chat() {
        let f = fixture().await;
        let chats = ChatRepository::new(Arc::clone(&f.db));

        let application = f
            .ledger
            .submit_application("boxer", application_input("p-boxer"))
            .await
            .unwrap();
        f.ledger
            .decide_application(&application.id, ApplicationDecision::Accept, "host")
            .await
            .unwrap();

        let room = ChatRepository::find_room_by_pair_in(chats.db(), "match1", "boxer")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(room.host_actor_id, "host");

        let kinds = kinds_for(&f, "boxer").await;
        assert!(kinds.contains(&NotificationKind::MatchAccepted));
        assert!(kinds.contains(&NotificationKind::ChatOpen));

        let again = f
            .ledger
            .decide_application(&application.id, ApplicationDecision::Reject, "host")
            .await;
        assert!(matches!(again, Err(AppError::AlreadyDecided(_))));
    }

    #[tokio::test]
    async fn test_application_eligibility() {
        let f = fixture().await;

        let own = f
            .ledger
            .submit_application("host", application_input("p-boxer"))
            .await;
        assert!(matches!(own, Err(AppError::NotEligible(_))));

        let foreign_profile = f
            .ledger
            .submit_application("rookie", application_input("p-boxer"))
            .await;
        assert!(matches!(foreign_profile, Err(AppError::NotEligible(_))));

        let wrong_sport = f
            .ledger
            .submit_application("boxer", application_input("p-boxer-futsal"))
            .await;
        assert!(matches!(wrong_sport, Err(AppError::NotEligible(_))));

        let no_profile = f
            .ledger
            .submit_application("boxer", application_input("missing"))
            .await;
        assert!(matches!(no_profile, Err(AppError::NotEligible(_))));

        f.ledger
            .submit_application("boxer", application_input("p-boxer"))
            .await
            .unwrap();
        let duplicate = f
            .ledger
            .submit_application("boxer", application_input("p-boxer"))
            .await;
        assert!(matches!(duplicate, Err(AppError::DuplicatePending(_))));
    }

    #[tokio::test]
    async fn test_reapply_after_rejection() {
        let f = fixture().await;

        let first = f
            .ledger
            .submit_application("boxer", application_input("p-boxer"))
            .await
            .unwrap();
        f.ledger
            .decide_application(&first.id, ApplicationDecision::Reject, "host")
            .await
            .unwrap();

        let second = f
            .ledger
            .submit_application("boxer", application_input("p-boxer"))
            .await
            .unwrap();
        assert_ne!(first.id, second.id);

        let pending = f
            .ledger
            .list_pending_applications("match1", "host")
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);

        let denied = f.ledger.list_application_history("match1", "boxer", 10).await;
        assert!(matches!(denied, Err(AppError::NotAuthorized(_))));

        assert_eq!(f.ledger.list_my_applications("boxer", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_decision() {
        let f = fixture_with_policy(RetryPolicy {
            max_attempts: 2,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        })
        .await;

        let request = f
            .ledger
            .submit_join_request("rookie", join_input("g1"))
            .await
            .unwrap();

        f.db.execute_unprepared("DROP TABLE notification")
            .await
            .unwrap();

        let decided = f
            .ledger
            .decide_join_request(&request.id, JoinDecision::Approve, "owner")
            .await
            .unwrap();
        assert_eq!(decided.status, JoinRequestStatus::Approved);

        let rows = NotificationOutbox::find()
            .filter(notification_outbox::Column::TargetId.eq(request.id.clone()))
            .filter(notification_outbox::Column::Kind.eq(NotificationKind::JoinApproved))
            .all(f.db.as_ref())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, OutboxStatus::Pending);
        assert_eq!(rows[0].attempts, 1);
        assert!(rows[0].last_error.is_some());

        // Make sure the row is due regardless of clock resolution.
        NotificationOutbox::update_many()
            .set(notification_outbox::ActiveModel {
                next_attempt_at: Set((Utc::now() - chrono::Duration::minutes(1)).into()),
                ..Default::default()
            })
            .filter(notification_outbox::Column::Id.eq(rows[0].id.clone()))
            .exec(f.db.as_ref())
            .await
            .unwrap();

        let report = f.notifications.retry_due(100).await.unwrap();
        assert_eq!(report.delivered, 0);
        assert_eq!(report.abandoned, 1);

        let row = NotificationOutbox::find_by_id(rows[0].id.clone())
            .one(f.db.as_ref())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, OutboxStatus::Abandoned);
        assert_eq!(row.attempts, 2);
    }
}
