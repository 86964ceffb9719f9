//! Chat room and message repository.

use std::sync::Arc;

use crate::entities::{ChatMessage, ChatRoom, chat_message, chat_room};
use matchup_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::OnConflict,
};

/// Repository for chat rooms and their messages.
#[derive(Clone)]
pub struct ChatRepository {
    db: Arc<DatabaseConnection>,
}

impl ChatRepository {
    /// Create a new chat repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get reference to the database connection.
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    // ==================== Rooms ====================

    /// Find a room by ID.
    pub async fn find_room_by_id(&self, id: &str) -> AppResult<Option<chat_room::Model>> {
        ChatRoom::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the room for a `(match, counterpart)` pair.
    pub async fn find_room_by_pair_in<C: ConnectionTrait>(
        conn: &C,
        match_id: &str,
        counterpart_actor_id: &str,
    ) -> AppResult<Option<chat_room::Model>> {
        ChatRoom::find()
            .filter(chat_room::Column::MatchId.eq(match_id))
            .filter(chat_room::Column::CounterpartActorId.eq(counterpart_actor_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a room unless the `(match, counterpart)` pair already has one.
    pub async fn insert_room_if_absent<C: ConnectionTrait>(
        conn: &C,
        model: chat_room::ActiveModel,
    ) -> AppResult<bool> {
        let rows = ChatRoom::insert(model)
            .on_conflict(
                OnConflict::columns([
                    chat_room::Column::MatchId,
                    chat_room::Column::CounterpartActorId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows > 0)
    }

    /// Rooms in which the actor participates and has not left.
    pub async fn find_open_rooms_for_actor(
        &self,
        actor_id: &str,
    ) -> AppResult<Vec<chat_room::Model>> {
        ChatRoom::find()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(chat_room::Column::HostActorId.eq(actor_id))
                            .add(chat_room::Column::HostLeft.eq(false)),
                    )
                    .add(
                        Condition::all()
                            .add(chat_room::Column::CounterpartActorId.eq(actor_id))
                            .add(chat_room::Column::CounterpartLeft.eq(false)),
                    ),
            )
            .order_by_desc(chat_room::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Set the left flag of one side of a room.
    pub async fn set_left(&self, room_id: &str, host_side: bool) -> AppResult<()> {
        let column = if host_side {
            chat_room::Column::HostLeft
        } else {
            chat_room::Column::CounterpartLeft
        };

        ChatRoom::update_many()
            .col_expr(column, true.into())
            .filter(chat_room::Column::Id.eq(room_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Clear both left flags.
    pub async fn reopen<C: ConnectionTrait>(conn: &C, room_id: &str) -> AppResult<()> {
        ChatRoom::update_many()
            .col_expr(chat_room::Column::HostLeft, false.into())
            .col_expr(chat_room::Column::CounterpartLeft, false.into())
            .filter(chat_room::Column::Id.eq(room_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    // ==================== Messages ====================

    /// Create a new message.
    pub async fn create_message<C: ConnectionTrait>(
        conn: &C,
        model: chat_message::ActiveModel,
    ) -> AppResult<chat_message::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Messages of a room, newest first, optionally older than `until_id`.
    pub async fn find_messages(
        &self,
        room_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<chat_message::Model>> {
        let mut query = ChatMessage::find()
            .filter(chat_message::Column::RoomId.eq(room_id))
            .order_by_desc(chat_message::Column::CreatedAt)
            .order_by_desc(chat_message::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(chat_message::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Latest message of a room, if any.
    pub async fn find_latest_message(
        &self,
        room_id: &str,
    ) -> AppResult<Option<chat_message::Model>> {
        ChatMessage::find()
            .filter(chat_message::Column::RoomId.eq(room_id))
            .order_by_desc(chat_message::Column::CreatedAt)
            .order_by_desc(chat_message::Column::Id)
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

    fn create_test_room(id: &str) -> chat_room::Model {
        chat_room::Model {
            id: id.to_string(),
            match_id: "match".to_string(),
            host_actor_id: "host".to_string(),
            counterpart_actor_id: "guest".to_string(),
            host_left: false,
            counterpart_left: true,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_room_by_id() {
        let room = create_test_room("r1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[room.clone()]])
                .into_connection(),
        );

        let repo = ChatRepository::new(db);
        let result = repo.find_room_by_id("r1").await.unwrap();

        assert_eq!(result, Some(room));
    }

    #[test]
    fn test_room_participant_helpers() {
        let room = create_test_room("r1");

        assert!(room.is_participant("host"));
        assert!(room.is_participant("guest"));
        assert!(!room.is_participant("stranger"));
        assert_eq!(room.other_participant("host"), "guest");
        assert_eq!(room.other_participant("guest"), "host");
        assert!(!room.has_left("host"));
        assert!(room.has_left("guest"));
        assert!(room.has_left("stranger"));
    }
}
