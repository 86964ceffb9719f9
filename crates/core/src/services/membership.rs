//! Membership service.
//!
//! The only writer of `membership` rows and of the derived
//! `actor.current_group_id` pointer.

use chrono::Utc;
use matchup_common::{AppError, AppResult, IdGenerator};
use matchup_db::entities::membership::{self, MemberRole};
use matchup_db::repositories::{ActorRepository, JoinRequestRepository, MembershipRepository};
use sea_orm::{ConnectionTrait, Set, TransactionTrait};
use tracing::{debug, info, warn};

/// Membership service for business logic.
#[derive(Clone)]
pub struct MembershipService {
    membership_repo: MembershipRepository,
    join_request_repo: JoinRequestRepository,
}

impl MembershipService {
    /// Create a new membership service.
    #[must_use]
    pub const fn new(
        membership_repo: MembershipRepository,
        join_request_repo: JoinRequestRepository,
    ) -> Self {
        Self {
            membership_repo,
            join_request_repo,
        }
    }

    /// Create the membership for `(group, actor)` in its own transaction.
    ///
    /// Idempotent: an existing membership is returned unchanged.
    pub async fn materialize(
        &self,
        group_id: &str,
        member_actor_id: &str,
    ) -> AppResult<membership::Model> {
        let txn = self.membership_repo.db().begin().await?;
        let membership = Self::materialize_in(&txn, group_id, member_actor_id).await?;
        txn.commit().await?;

        Ok(membership)
    }

    /// Create the membership on the caller's connection or transaction and
    /// rebuild the actor's current-group pointer.
    pub async fn materialize_in<C: ConnectionTrait>(
        conn: &C,
        group_id: &str,
        member_actor_id: &str,
    ) -> AppResult<membership::Model> {
        let model = membership::ActiveModel {
            id: Set(IdGenerator::new().generate()),
            group_id: Set(group_id.to_string()),
            member_actor_id: Set(member_actor_id.to_string()),
            role: Set(MemberRole::Member),
            joined_at: Set(Utc::now().into()),
        };

        let inserted = MembershipRepository::insert_if_absent(conn, model).await?;

        let membership = MembershipRepository::find_pair_in(conn, group_id, member_actor_id)
            .await?
            .ok_or_else(|| {
                AppError::ConsistencyFailure(format!(
                    "Membership for {member_actor_id} in {group_id} missing after insert"
                ))
            })?;

        Self::refresh_current_group(conn, member_actor_id).await?;

        if inserted {
            info!(group_id = %group_id, actor_id = %member_actor_id, membership_id = %membership.id, "Membership created");
        } else {
            debug!(group_id = %group_id, actor_id = %member_actor_id, "Membership already present");
        }

        Ok(membership)
    }

    /// Whether the actor is a member of the group.
    pub async fn membership_exists(&self, group_id: &str, member_actor_id: &str) -> AppResult<bool> {
        self.membership_repo.exists(group_id, member_actor_id).await
    }

    /// Memberships held by an actor, newest first.
    pub async fn list_for_actor(&self, member_actor_id: &str) -> AppResult<Vec<membership::Model>> {
        self.membership_repo.find_by_member(member_actor_id).await
    }

    /// Rebuild the legacy current-group pointer from the latest membership.
    pub async fn refresh_current_group<C: ConnectionTrait>(
        conn: &C,
        actor_id: &str,
    ) -> AppResult<()> {
        let latest = MembershipRepository::find_latest_for_member(conn, actor_id).await?;
        ActorRepository::set_current_group(conn, actor_id, latest.as_ref().map(|m| m.group_id.as_str()))
            .await
    }

    /// Materialize memberships for approved join requests that lack one.
    ///
    /// Walks every orphan in pages of `batch_size`, so rows that keep failing
    /// do not hide newer ones. Returns how many memberships were repaired.
    pub async fn reconcile_approved(&self, batch_size: u64) -> AppResult<usize> {
        let batch_size = batch_size.max(1);
        let mut after: Option<String> = None;
        let mut found = 0;
        let mut repaired = 0;

        loop {
            let page = self
                .join_request_repo
                .find_approved_without_membership(after.as_deref(), batch_size)
                .await?;
            let full_page = page.len() as u64 == batch_size;
            found += page.len();

            for request in &page {
                match self.materialize(&request.group_id, &request.requester_id).await {
                    Ok(_) => repaired += 1,
                    Err(e) => warn!(
                        request_id = %request.id,
                        group_id = %request.group_id,
                        error = %e,
                        "Membership reconciliation failed; will retry"
                    ),
                }
            }

            match page.last() {
                Some(last) if full_page => after = Some(last.id.clone()),
                _ => break,
            }
        }

        if found > 0 {
            warn!(found, repaired, "Approved join requests without membership found");
        }

        Ok(repaired)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use matchup_db::entities::join_request::{self, JoinRequestStatus};
    use matchup_db::test_utils::{insert_actor, insert_group, setup_sqlite};
    use sea_orm::{ActiveModelTrait, DatabaseConnection};
    use std::sync::Arc;

    async fn service() -> (Arc<DatabaseConnection>, MembershipService) {
        let db = Arc::new(setup_sqlite().await.unwrap());
        insert_actor(&db, "owner", "Coach").await.unwrap();
        insert_actor(&db, "rookie", "Rookie").await.unwrap();
        insert_group(&db, "g1", "owner", "Night Owls").await.unwrap();

        let service = MembershipService::new(
            MembershipRepository::new(Arc::clone(&db)),
            JoinRequestRepository::new(Arc::clone(&db)),
        );
        (db, service)
    }

    fn approved_request(id: &str, requester: &str, group: &str) -> join_request::ActiveModel {
        join_request::ActiveModel {
            id: Set(id.to_string()),
            requester_id: Set(requester.to_string()),
            group_id: Set(group.to_string()),
            status: Set(JoinRequestStatus::Approved),
            message: Set(None),
            created_at: Set(Utc::now().into()),
            decided_at: Set(Some(Utc::now().into())),
            decided_by: Set(Some("owner".to_string())),
        }
    }

    #[tokio::test]
    async fn test_materialize_is_idempotent() {
        let (_db, service) = service().await;

        let first = service.materialize("g1", "rookie").await.unwrap();
        let second = service.materialize("g1", "rookie").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.role, MemberRole::Member);
        assert_eq!(service.list_for_actor("rookie").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_materialize_sets_current_group() {
        let (db, service) = service().await;

        service.materialize("g1", "rookie").await.unwrap();

        let actor = ActorRepository::new(Arc::clone(&db))
            .find_by_id("rookie")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(actor.current_group_id.as_deref(), Some("g1"));
        assert!(service.membership_exists("g1", "rookie").await.unwrap());
    }

    #[tokio::test]
    async fn test_reconcile_repairs_missing_membership() {
        let (db, service) = service().await;

        approved_request("jr1", "rookie", "g1")
            .insert(db.as_ref())
        .await
        .unwrap();

        assert!(!service.membership_exists("g1", "rookie").await.unwrap());

        let repaired = service.reconcile_approved(10).await.unwrap();
        assert_eq!(repaired, 1);
        assert!(service.membership_exists("g1", "rookie").await.unwrap());

        let repaired = service.reconcile_approved(10).await.unwrap();
        assert_eq!(repaired, 0);
    }

    #[tokio::test]
    async fn test_reconcile_walks_past_failing_rows() {
        let (db, service) = service().await;

        // A legacy approval pointing at a group that no longer exists.
        db.execute_unprepared("PRAGMA foreign_keys = OFF").await.unwrap();
        approved_request("jr0", "rookie", "vanished")
            .insert(db.as_ref())
            .await
            .unwrap();
        db.execute_unprepared("PRAGMA foreign_keys = ON").await.unwrap();

        approved_request("jr1", "rookie", "g1")
            .insert(db.as_ref())
            .await
            .unwrap();

        let repaired = service.reconcile_approved(1).await.unwrap();

        assert_eq!(repaired, 1);
        assert!(service.membership_exists("g1", "rookie").await.unwrap());
        assert!(!service.membership_exists("vanished", "rookie").await.unwrap());
    }
}
