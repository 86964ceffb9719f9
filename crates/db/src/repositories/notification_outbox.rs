//! Notification outbox repository.

use std::sync::Arc;

use chrono::Utc;
use matchup_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, prelude::DateTimeWithTimeZone,
};

use crate::entities::notification_outbox::OutboxStatus;
use crate::entities::{NotificationOutbox, notification_outbox};

/// Repository for the notification outbox.
#[derive(Clone)]
pub struct NotificationOutboxRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationOutboxRepository {
    /// Create a new outbox repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get reference to the database connection.
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Insert outbox rows, usually inside the transaction of the triggering
    /// state change.
    pub async fn insert_many<C: ConnectionTrait>(
        conn: &C,
        rows: Vec<notification_outbox::ActiveModel>,
    ) -> AppResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        NotificationOutbox::insert_many(rows)
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Find an outbox row by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<notification_outbox::Model>> {
        NotificationOutbox::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Pending rows among the given IDs.
    pub async fn find_pending_by_ids(
        &self,
        ids: &[String],
    ) -> AppResult<Vec<notification_outbox::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        NotificationOutbox::find()
            .filter(notification_outbox::Column::Id.is_in(ids.iter().cloned()))
            .filter(notification_outbox::Column::Status.eq(OutboxStatus::Pending))
            .order_by_asc(notification_outbox::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Pending rows whose next attempt is due.
    pub async fn find_due(
        &self,
        now: DateTimeWithTimeZone,
        limit: u64,
    ) -> AppResult<Vec<notification_outbox::Model>> {
        NotificationOutbox::find()
            .filter(notification_outbox::Column::Status.eq(OutboxStatus::Pending))
            .filter(notification_outbox::Column::NextAttemptAt.lte(now))
            .order_by_asc(notification_outbox::Column::NextAttemptAt)
            .order_by_asc(notification_outbox::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a row as delivered.
    pub async fn mark_delivered<C: ConnectionTrait>(conn: &C, id: &str) -> AppResult<()> {
        NotificationOutbox::update_many()
            .set(notification_outbox::ActiveModel {
                status: Set(OutboxStatus::Delivered),
                delivered_at: Set(Some(Utc::now().into())),
                ..Default::default()
            })
            .filter(notification_outbox::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Record a failed attempt.
    ///
    /// `next_attempt_at` of `None` abandons the row.
    pub async fn record_failure(
        &self,
        id: &str,
        attempts: i32,
        error: &str,
        next_attempt_at: Option<DateTimeWithTimeZone>,
    ) -> AppResult<()> {
        let mut update = notification_outbox::ActiveModel {
            attempts: Set(attempts),
            last_error: Set(Some(error.to_string())),
            ..Default::default()
        };

        match next_attempt_at {
            Some(at) => update.next_attempt_at = Set(at),
            None => update.status = Set(OutboxStatus::Abandoned),
        }

        NotificationOutbox::update_many()
            .set(update)
            .filter(notification_outbox::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_insert_many_empty_is_noop() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        NotificationOutboxRepository::insert_many(&db, vec![])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_find_pending_by_no_ids() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = NotificationOutboxRepository::new(db);
        let rows = repo.find_pending_by_ids(&[]).await.unwrap();

        assert!(rows.is_empty());
    }
}
