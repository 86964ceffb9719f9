//! Notification repository.

use std::sync::Arc;

use crate::entities::{Notification, notification};
use matchup_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DeleteResult, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, UpdateResult, sea_query::OnConflict,
};

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a notification by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<notification::Model>> {
        Notification::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a notification unless one with the same ID exists.
    ///
    /// Notifications reuse the ID of the outbox row they came from, so a
    /// redelivered row never produces a second notification.
    pub async fn create_if_absent<C: ConnectionTrait>(
        conn: &C,
        model: notification::ActiveModel,
    ) -> AppResult<bool> {
        let rows = Notification::insert(model)
            .on_conflict(
                OnConflict::column(notification::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows > 0)
    }

    /// Get notifications for a receiver (paginated, newest first).
    pub async fn find_by_receiver(
        &self,
        receiver_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        let mut query = Notification::find()
            .filter(notification::Column::ReceiverId.eq(receiver_id))
            .order_by_desc(notification::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(notification::Column::Id.lt(id));
        }

        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark one of the receiver's notifications as read.
    pub async fn mark_as_read(&self, id: &str, receiver_id: &str) -> AppResult<u64> {
        let result: UpdateResult = Notification::update_many()
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::ReceiverId.eq(receiver_id))
            .col_expr(notification::Column::IsRead, true.into())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Mark all notifications as read for a receiver.
    pub async fn mark_all_as_read(&self, receiver_id: &str) -> AppResult<u64> {
        let result: UpdateResult = Notification::update_many()
            .filter(notification::Column::ReceiverId.eq(receiver_id))
            .filter(notification::Column::IsRead.eq(false))
            .col_expr(notification::Column::IsRead, true.into())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Count unread notifications for a receiver.
    pub async fn count_unread(&self, receiver_id: &str) -> AppResult<u64> {
        Notification::find()
            .filter(notification::Column::ReceiverId.eq(receiver_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete one of the receiver's notifications.
    pub async fn delete(&self, id: &str, receiver_id: &str) -> AppResult<u64> {
        let result: DeleteResult = Notification::delete_many()
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::ReceiverId.eq(receiver_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Delete all notifications for a receiver.
    pub async fn delete_all_for_receiver(&self, receiver_id: &str) -> AppResult<u64> {
        let result: DeleteResult = Notification::delete_many()
            .filter(notification::Column::ReceiverId.eq(receiver_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_mark_all_as_read_returns_rows() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 3,
                }])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let rows = repo.mark_all_as_read("receiver").await.unwrap();

        assert_eq!(rows, 3);
    }

    #[tokio::test]
    async fn test_delete_other_receivers_row_is_noop() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let rows = repo.delete("n1", "someone-else").await.unwrap();

        assert_eq!(rows, 0);
    }
}
