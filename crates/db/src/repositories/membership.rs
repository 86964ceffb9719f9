//! Membership repository.

use std::sync::Arc;

use matchup_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, sea_query::OnConflict,
};

use crate::entities::membership::MemberRole;
use crate::entities::{Membership, membership};

/// Repository for group memberships.
#[derive(Clone)]
pub struct MembershipRepository {
    db: Arc<DatabaseConnection>,
}

impl MembershipRepository {
    /// Create a new membership repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get reference to the database connection.
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Find the membership for a `(group, member)` pair.
    pub async fn find_pair_in<C: ConnectionTrait>(
        conn: &C,
        group_id: &str,
        member_actor_id: &str,
    ) -> AppResult<Option<membership::Model>> {
        Membership::find()
            .filter(membership::Column::GroupId.eq(group_id))
            .filter(membership::Column::MemberActorId.eq(member_actor_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether the actor is a member of the group.
    pub async fn exists(&self, group_id: &str, member_actor_id: &str) -> AppResult<bool> {
        let count = Membership::find()
            .filter(membership::Column::GroupId.eq(group_id))
            .filter(membership::Column::MemberActorId.eq(member_actor_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    /// Insert a membership unless the pair already exists.
    ///
    /// Returns `true` when a row was written. Concurrent callers converge on
    /// a single row through the `(group_id, member_actor_id)` unique index.
    pub async fn insert_if_absent<C: ConnectionTrait>(
        conn: &C,
        model: membership::ActiveModel,
    ) -> AppResult<bool> {
        let rows = Membership::insert(model)
            .on_conflict(
                OnConflict::columns([
                    membership::Column::GroupId,
                    membership::Column::MemberActorId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows > 0)
    }

    /// Most recently joined membership of an actor.
    pub async fn find_latest_for_member<C: ConnectionTrait>(
        conn: &C,
        member_actor_id: &str,
    ) -> AppResult<Option<membership::Model>> {
        Membership::find()
            .filter(membership::Column::MemberActorId.eq(member_actor_id))
            .order_by_desc(membership::Column::JoinedAt)
            .order_by_desc(membership::Column::Id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Leader memberships of a group.
    pub async fn find_leaders_in<C: ConnectionTrait>(
        conn: &C,
        group_id: &str,
    ) -> AppResult<Vec<membership::Model>> {
        Membership::find()
            .filter(membership::Column::GroupId.eq(group_id))
            .filter(membership::Column::Role.eq(MemberRole::Leader))
            .order_by_asc(membership::Column::JoinedAt)
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Memberships of an actor, newest first.
    pub async fn find_by_member(&self, member_actor_id: &str) -> AppResult<Vec<membership::Model>> {
        Membership::find()
            .filter(membership::Column::MemberActorId.eq(member_actor_id))
            .order_by_desc(membership::Column::JoinedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
