//! Join request repository.

use std::sync::Arc;

use matchup_common::{AppError, AppResult, error::is_unique_violation};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, prelude::DateTimeWithTimeZone, sea_query::Expr,
};

use crate::entities::join_request::JoinRequestStatus;
use crate::entities::{JoinRequest, join_request};

/// Repository for join requests.
#[derive(Clone)]
pub struct JoinRequestRepository {
    db: Arc<DatabaseConnection>,
}

impl JoinRequestRepository {
    /// Create a new join request repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Underlying connection, for opening transactions.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Find request by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<join_request::Model>> {
        Self::find_by_id_in(self.db.as_ref(), id).await
    }

    /// Find request by ID on an explicit connection or transaction.
    pub async fn find_by_id_in<C: ConnectionTrait>(
        conn: &C,
        id: &str,
    ) -> AppResult<Option<join_request::Model>> {
        JoinRequest::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new pending request.
    ///
    /// A second pending request for the same `(requester, group)` trips the
    /// partial unique index and surfaces as [`AppError::DuplicatePending`].
    pub async fn create<C: ConnectionTrait>(
        conn: &C,
        model: join_request::ActiveModel,
    ) -> AppResult<join_request::Model> {
        model.insert(conn).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicatePending(
                    "A join request for this group is already pending".to_string(),
                )
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Move a pending request to a terminal status.
    ///
    /// Compare-and-set on `status = pending`; returns the number of rows
    /// changed, which is zero when another decision won the race.
    pub async fn transition<C: ConnectionTrait>(
        conn: &C,
        id: &str,
        status: JoinRequestStatus,
        decided_by: &str,
        decided_at: DateTimeWithTimeZone,
    ) -> AppResult<u64> {
        let result = JoinRequest::update_many()
            .set(join_request::ActiveModel {
                status: Set(status),
                decided_at: Set(Some(decided_at)),
                decided_by: Set(Some(decided_by.to_string())),
                ..Default::default()
            })
            .filter(join_request::Column::Id.eq(id))
            .filter(join_request::Column::Status.eq(JoinRequestStatus::Pending))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Pending requests addressed to any of the given groups, newest first.
    pub async fn find_pending_for_groups(
        &self,
        group_ids: &[String],
    ) -> AppResult<Vec<join_request::Model>> {
        if group_ids.is_empty() {
            return Ok(vec![]);
        }

        JoinRequest::find()
            .filter(join_request::Column::GroupId.is_in(group_ids.iter().cloned()))
            .filter(join_request::Column::Status.eq(JoinRequestStatus::Pending))
            .order_by_desc(join_request::Column::CreatedAt)
            .order_by_desc(join_request::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Decided requests of the given groups, newest first.
    pub async fn find_decided_for_groups(
        &self,
        group_ids: &[String],
        limit: u64,
    ) -> AppResult<Vec<join_request::Model>> {
        if group_ids.is_empty() {
            return Ok(vec![]);
        }

        JoinRequest::find()
            .filter(join_request::Column::GroupId.is_in(group_ids.iter().cloned()))
            .filter(join_request::Column::Status.ne(JoinRequestStatus::Pending))
            .order_by_desc(join_request::Column::CreatedAt)
            .order_by_desc(join_request::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Requests submitted by an actor, newest first.
    pub async fn find_by_requester(
        &self,
        requester_id: &str,
        limit: u64,
    ) -> AppResult<Vec<join_request::Model>> {
        JoinRequest::find()
            .filter(join_request::Column::RequesterId.eq(requester_id))
            .order_by_desc(join_request::Column::CreatedAt)
            .order_by_desc(join_request::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Approved requests whose membership row is missing, in id order.
    ///
    /// Pass the last id of the previous page as `after` to continue a sweep.
    pub async fn find_approved_without_membership(
        &self,
        after: Option<&str>,
        limit: u64,
    ) -> AppResult<Vec<join_request::Model>> {
        let mut query = JoinRequest::find()
            .filter(join_request::Column::Status.eq(JoinRequestStatus::Approved))
            .filter(Expr::cust(
                "NOT EXISTS (SELECT 1 FROM membership \
                 WHERE membership.group_id = join_request.group_id \
                 AND membership.member_actor_id = join_request.requester_id)",
            ));

        if let Some(after) = after {
            query = query.filter(join_request::Column::Id.gt(after));
        }

        query
            .order_by_asc(join_request::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_request(id: &str, status: JoinRequestStatus) -> join_request::Model {
        join_request::Model {
            id: id.to_string(),
            requester_id: "requester".to_string(),
            group_id: "group".to_string(),
            status,
            message: Some("let me in".to_string()),
            created_at: Utc::now().into(),
            decided_at: None,
            decided_by: None,
        }
    }

    #[tokio::test]
    async fn test_transition_reports_lost_race() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let rows = JoinRequestRepository::transition(
            &db,
            "jr1",
            JoinRequestStatus::Approved,
            "owner",
            Utc::now().into(),
        )
        .await
        .unwrap();

        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn test_find_pending_for_groups() {
        let r1 = create_test_request("jr1", JoinRequestStatus::Pending);
        let r2 = create_test_request("jr2", JoinRequestStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[r1, r2]])
                .into_connection(),
        );

        let repo = JoinRequestRepository::new(db);
        let result = repo
            .find_pending_for_groups(&["group".to_string()])
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "jr1");
    }

    #[tokio::test]
    async fn test_find_pending_for_no_groups() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = JoinRequestRepository::new(db);
        let result = repo.find_pending_for_groups(&[]).await.unwrap();

        assert!(result.is_empty());
    }

    #[test]
    fn test_status_terminality() {
        assert!(!JoinRequestStatus::Pending.is_terminal());
        assert!(JoinRequestStatus::Approved.is_terminal());
        assert!(JoinRequestStatus::Rejected.is_terminal());
    }
}
