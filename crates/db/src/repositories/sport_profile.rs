//! Sport profile repository.

use std::sync::Arc;

use matchup_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::{SportProfile, sport_profile};

/// Repository for sport-specific profiles.
#[derive(Clone)]
pub struct SportProfileRepository {
    db: Arc<DatabaseConnection>,
}

impl SportProfileRepository {
    /// Create a new sport profile repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find profile by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<sport_profile::Model>> {
        SportProfile::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Batch lookup used by the inbox prefetch.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<sport_profile::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        SportProfile::find()
            .filter(sport_profile::Column::Id.is_in(ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All profiles held by the given actors.
    pub async fn find_by_actor_ids(
        &self,
        actor_ids: &[String],
    ) -> AppResult<Vec<sport_profile::Model>> {
        if actor_ids.is_empty() {
            return Ok(vec![]);
        }

        SportProfile::find()
            .filter(sport_profile::Column::ActorId.is_in(actor_ids.iter().cloned()))
            .order_by_asc(sport_profile::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Oldest profile an actor holds for a sport.
    pub async fn find_for_actor_and_sport(
        &self,
        actor_id: &str,
        sport: &str,
    ) -> AppResult<Option<sport_profile::Model>> {
        SportProfile::find()
            .filter(sport_profile::Column::ActorId.eq(actor_id))
            .filter(sport_profile::Column::Sport.eq(sport))
            .order_by_asc(sport_profile::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
