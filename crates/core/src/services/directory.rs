//! Directory service.
//!
//! Read-only view of actors and sport profiles. These tables are maintained
//! by other features and may lag the workflow tables.

use matchup_common::{AppError, AppResult};
use matchup_db::entities::{actor, sport_profile};
use matchup_db::repositories::{ActorRepository, SportProfileRepository};

/// Name rendered when no profile or account can be found.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Directory service for actor and profile lookups.
#[derive(Clone)]
pub struct DirectoryService {
    actor_repo: ActorRepository,
    profile_repo: SportProfileRepository,
}

impl DirectoryService {
    /// Create a new directory service.
    #[must_use]
    pub const fn new(actor_repo: ActorRepository, profile_repo: SportProfileRepository) -> Self {
        Self {
            actor_repo,
            profile_repo,
        }
    }

    /// Look up an actor's account record.
    pub async fn get_actor(&self, actor_id: &str) -> AppResult<Option<actor::Model>> {
        self.actor_repo.find_by_id(actor_id).await
    }

    /// Look up an actor that must exist to take part in the workflow.
    pub async fn require_actor(&self, actor_id: &str) -> AppResult<actor::Model> {
        self.get_actor(actor_id)
            .await?
            .ok_or_else(|| AppError::NotEligible("Complete your profile first".to_string()))
    }

    /// Look up a sport profile by ID.
    pub async fn get_profile(&self, profile_id: &str) -> AppResult<Option<sport_profile::Model>> {
        self.profile_repo.find_by_id(profile_id).await
    }

    /// Batch lookup of sport profiles.
    pub async fn get_profiles(&self, profile_ids: &[String]) -> AppResult<Vec<sport_profile::Model>> {
        self.profile_repo.find_by_ids(profile_ids).await
    }

    /// All sport profiles held by the given actors.
    pub async fn get_profiles_for_actors(
        &self,
        actor_ids: &[String],
    ) -> AppResult<Vec<sport_profile::Model>> {
        self.profile_repo.find_by_actor_ids(actor_ids).await
    }

    /// An actor's profile for a sport, if they have one.
    pub async fn get_profile_for_sport(
        &self,
        actor_id: &str,
        sport: &str,
    ) -> AppResult<Option<sport_profile::Model>> {
        self.profile_repo
            .find_for_actor_and_sport(actor_id, sport)
            .await
    }

    /// Best display name for an actor: sport nickname, then account name.
    pub async fn display_name(&self, actor_id: &str, sport: Option<&str>) -> AppResult<String> {
        if let Some(sport) = sport {
            if let Some(profile) = self.get_profile_for_sport(actor_id, sport).await? {
                return Ok(profile.nickname);
            }
        }

        Ok(self
            .get_actor(actor_id)
            .await?
            .map_or_else(|| UNKNOWN_NAME.to_string(), |a| a.display_name))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use matchup_db::test_utils::{insert_actor, insert_sport_profile, setup_sqlite};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_display_name_fallbacks() {
        let db = Arc::new(setup_sqlite().await.unwrap());
        insert_actor(&db, "a1", "Account Name").await.unwrap();
        insert_sport_profile(&db, "p1", "a1", "boxing", "Iron Fist")
            .await
            .unwrap();

        let directory = DirectoryService::new(
            ActorRepository::new(Arc::clone(&db)),
            SportProfileRepository::new(Arc::clone(&db)),
        );

        assert_eq!(
            directory.display_name("a1", Some("boxing")).await.unwrap(),
            "Iron Fist"
        );
        assert_eq!(
            directory.display_name("a1", Some("futsal")).await.unwrap(),
            "Account Name"
        );
        assert_eq!(directory.display_name("ghost", None).await.unwrap(), UNKNOWN_NAME);
    }

    #[tokio::test]
    async fn test_require_actor_missing_is_not_eligible() {
        let db = Arc::new(setup_sqlite().await.unwrap());
        let directory = DirectoryService::new(
            ActorRepository::new(Arc::clone(&db)),
            SportProfileRepository::new(Arc::clone(&db)),
        );

        let result = directory.require_actor("ghost").await;
        assert!(matches!(result, Err(AppError::NotEligible(_))));
    }
}
