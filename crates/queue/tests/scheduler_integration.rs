//! Scheduler jobs against an in-memory `SQLite` database.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::Utc;
use matchup_common::RetryPolicy;
use matchup_core::services::{MembershipService, NotificationService};
use matchup_db::entities::join_request::{self, JoinRequestStatus};
use matchup_db::repositories::{
    JoinRequestRepository, MembershipRepository, NotificationOutboxRepository,
    NotificationRepository,
};
use matchup_db::test_utils::{insert_actor, insert_group, setup_sqlite};
use matchup_queue::{JobExecutor, WorkflowJobExecutor};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

async fn executor() -> (Arc<DatabaseConnection>, WorkflowJobExecutor, MembershipService) {
    let db = Arc::new(setup_sqlite().await.unwrap());
    insert_actor(&db, "owner", "Coach").await.unwrap();
    insert_actor(&db, "rookie", "Rookie").await.unwrap();
    insert_group(&db, "g1", "owner", "Night Owls").await.unwrap();

    let notifications = NotificationService::new(
        NotificationRepository::new(Arc::clone(&db)),
        NotificationOutboxRepository::new(Arc::clone(&db)),
        RetryPolicy::default(),
    );
    let memberships = MembershipService::new(
        MembershipRepository::new(Arc::clone(&db)),
        JoinRequestRepository::new(Arc::clone(&db)),
    );

    (
        db,
        WorkflowJobExecutor::new(notifications, memberships.clone()),
        memberships,
    )
}

#[tokio::test]
async fn test_reconcile_job_repairs_orphaned_approval() {
    let (db, executor, memberships) = executor().await;

    join_request::ActiveModel {
        id: Set("jr1".to_string()),
        requester_id: Set("rookie".to_string()),
        group_id: Set("g1".to_string()),
        status: Set(JoinRequestStatus::Approved),
        message: Set(None),
        created_at: Set(Utc::now().into()),
        decided_at: Set(Some(Utc::now().into())),
        decided_by: Set(Some("owner".to_string())),
    }
    .insert(db.as_ref())
    .await
    .unwrap();

    assert_eq!(executor.reconcile_memberships(10).await.unwrap(), 1);
    assert!(memberships.membership_exists("g1", "rookie").await.unwrap());
    assert_eq!(executor.reconcile_memberships(10).await.unwrap(), 0);
}

#[tokio::test]
async fn test_retry_job_with_empty_outbox() {
    let (_db, executor, _memberships) = executor().await;
    assert_eq!(executor.retry_notifications(10).await.unwrap(), 0);
}
