//! Actor repository.

use std::sync::Arc;

use matchup_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, sea_query::Expr,
};

use crate::entities::{Actor, actor};

/// Repository for actor (account) lookups.
#[derive(Clone)]
pub struct ActorRepository {
    db: Arc<DatabaseConnection>,
}

impl ActorRepository {
    /// Create a new actor repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find actor by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<actor::Model>> {
        Actor::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Overwrite the derived current-group pointer.
    pub async fn set_current_group<C: ConnectionTrait>(
        conn: &C,
        actor_id: &str,
        group_id: Option<&str>,
    ) -> AppResult<()> {
        Actor::update_many()
            .col_expr(
                actor::Column::CurrentGroupId,
                Expr::value(group_id.map(ToString::to_string)),
            )
            .filter(actor::Column::Id.eq(actor_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_actor(id: &str, name: &str) -> actor::Model {
        actor::Model {
            id: id.to_string(),
            kind: actor::ActorKind::Person,
            display_name: name.to_string(),
            avatar_url: None,
            current_group_id: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let actor = create_test_actor("a1", "Kim");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[actor.clone()]])
                .into_connection(),
        );

        let repo = ActorRepository::new(db);
        let result = repo.find_by_id("a1").await.unwrap();

        assert_eq!(result, Some(actor));
    }
}
