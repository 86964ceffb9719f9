//! Match post repository.

use std::sync::Arc;

use matchup_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::{MatchPost, match_post};

/// Repository for match post lookups.
#[derive(Clone)]
pub struct MatchPostRepository {
    db: Arc<DatabaseConnection>,
}

impl MatchPostRepository {
    /// Create a new match post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find match by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<match_post::Model>> {
        Self::find_by_id_in(self.db.as_ref(), id).await
    }

    /// Find match by ID on an explicit connection or transaction.
    pub async fn find_by_id_in<C: ConnectionTrait>(
        conn: &C,
        id: &str,
    ) -> AppResult<Option<match_post::Model>> {
        MatchPost::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get match by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<match_post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Match not found: {id}")))
    }

    /// Batch lookup used by the inbox prefetch.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<match_post::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        MatchPost::find()
            .filter(match_post::Column::Id.is_in(ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
