//! Match application repository.

use std::sync::Arc;

use matchup_common::{AppError, AppResult, error::is_unique_violation};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, prelude::DateTimeWithTimeZone,
};

use crate::entities::match_application::ApplicationStatus;
use crate::entities::{MatchApplication, match_application};

/// Repository for match applications.
#[derive(Clone)]
pub struct MatchApplicationRepository {
    db: Arc<DatabaseConnection>,
}

impl MatchApplicationRepository {
    /// Create a new match application repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Underlying connection, for opening transactions.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Find application by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<match_application::Model>> {
        Self::find_by_id_in(self.db.as_ref(), id).await
    }

    /// Find application by ID on an explicit connection or transaction.
    pub async fn find_by_id_in<C: ConnectionTrait>(
        conn: &C,
        id: &str,
    ) -> AppResult<Option<match_application::Model>> {
        MatchApplication::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Batch lookup used by the inbox prefetch.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<match_application::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        MatchApplication::find()
            .filter(match_application::Column::Id.is_in(ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new pending application.
    ///
    /// A second live application for the same `(match, applicant)` surfaces
    /// as [`AppError::DuplicatePending`].
    pub async fn create<C: ConnectionTrait>(
        conn: &C,
        model: match_application::ActiveModel,
    ) -> AppResult<match_application::Model> {
        model.insert(conn).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicatePending(
                    "An application to this match is already active".to_string(),
                )
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Move a pending application to a terminal status. Returns rows changed.
    pub async fn transition<C: ConnectionTrait>(
        conn: &C,
        id: &str,
        status: ApplicationStatus,
        decided_by: &str,
        decided_at: DateTimeWithTimeZone,
    ) -> AppResult<u64> {
        let result = MatchApplication::update_many()
            .set(match_application::ActiveModel {
                status: Set(status),
                decided_at: Set(Some(decided_at)),
                decided_by: Set(Some(decided_by.to_string())),
                ..Default::default()
            })
            .filter(match_application::Column::Id.eq(id))
            .filter(match_application::Column::Status.eq(ApplicationStatus::Pending))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Pending applications to any of the given matches, newest first.
    pub async fn find_pending_for_matches(
        &self,
        match_ids: &[String],
    ) -> AppResult<Vec<match_application::Model>> {
        if match_ids.is_empty() {
            return Ok(vec![]);
        }

        MatchApplication::find()
            .filter(match_application::Column::MatchId.is_in(match_ids.iter().cloned()))
            .filter(match_application::Column::Status.eq(ApplicationStatus::Pending))
            .order_by_desc(match_application::Column::CreatedAt)
            .order_by_desc(match_application::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Decided applications to the given matches, newest first.
    pub async fn find_decided_for_matches(
        &self,
        match_ids: &[String],
        limit: u64,
    ) -> AppResult<Vec<match_application::Model>> {
        if match_ids.is_empty() {
            return Ok(vec![]);
        }

        MatchApplication::find()
            .filter(match_application::Column::MatchId.is_in(match_ids.iter().cloned()))
            .filter(match_application::Column::Status.ne(ApplicationStatus::Pending))
            .order_by_desc(match_application::Column::CreatedAt)
            .order_by_desc(match_application::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All applications to the given matches, newest first.
    pub async fn find_by_matches(
        &self,
        match_ids: &[String],
    ) -> AppResult<Vec<match_application::Model>> {
        if match_ids.is_empty() {
            return Ok(vec![]);
        }

        MatchApplication::find()
            .filter(match_application::Column::MatchId.is_in(match_ids.iter().cloned()))
            .order_by_desc(match_application::Column::CreatedAt)
            .order_by_desc(match_application::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Applications made by an actor, newest first.
    pub async fn find_by_applicant(
        &self,
        applicant_actor_id: &str,
        limit: u64,
    ) -> AppResult<Vec<match_application::Model>> {
        MatchApplication::find()
            .filter(match_application::Column::ApplicantActorId.eq(applicant_actor_id))
            .order_by_desc(match_application::Column::CreatedAt)
            .order_by_desc(match_application::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Latest application of an applicant to a match with the given status.
    pub async fn find_latest_for_pair(
        &self,
        match_id: &str,
        applicant_actor_id: &str,
        status: ApplicationStatus,
    ) -> AppResult<Option<match_application::Model>> {
        MatchApplication::find()
            .filter(match_application::Column::MatchId.eq(match_id))
            .filter(match_application::Column::ApplicantActorId.eq(applicant_actor_id))
            .filter(match_application::Column::Status.eq(status))
            .order_by_desc(match_application::Column::CreatedAt)
            .order_by_desc(match_application::Column::Id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Latest application to a match with the given status, any applicant.
    pub async fn find_latest_for_match(
        &self,
        match_id: &str,
        status: ApplicationStatus,
    ) -> AppResult<Option<match_application::Model>> {
        MatchApplication::find()
            .filter(match_application::Column::MatchId.eq(match_id))
            .filter(match_application::Column::Status.eq(status))
            .order_by_desc(match_application::Column::CreatedAt)
            .order_by_desc(match_application::Column::Id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_application(id: &str, status: ApplicationStatus) -> match_application::Model {
        match_application::Model {
            id: id.to_string(),
            match_id: "match".to_string(),
            applicant_actor_id: "applicant".to_string(),
            applicant_profile_id: "profile".to_string(),
            status,
            message: None,
            attribute_snapshot: None,
            created_at: Utc::now().into(),
            decided_at: None,
            decided_by: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_applicant() {
        let a1 = create_test_application("ma1", ApplicationStatus::Accepted);
        let a2 = create_test_application("ma2", ApplicationStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[a1, a2]])
                .into_connection(),
        );

        let repo = MatchApplicationRepository::new(db);
        let result = repo.find_by_applicant("applicant", 10).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].status, ApplicationStatus::Accepted);
    }

    #[tokio::test]
    async fn test_find_latest_for_match_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<match_application::Model>::new()])
                .into_connection(),
        );

        let repo = MatchApplicationRepository::new(db);
        let result = repo
            .find_latest_for_match("match", ApplicationStatus::Accepted)
            .await
            .unwrap();

        assert!(result.is_none());
    }
}
