//! Chat room entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Two-party conversation tied to a match.
///
/// Unique on `(match_id, counterpart_actor_id)`. The host is always the
/// other participant.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chat_room")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub match_id: String,

    #[sea_orm(indexed)]
    pub host_actor_id: String,

    #[sea_orm(indexed)]
    pub counterpart_actor_id: String,

    #[sea_orm(default_value = false)]
    pub host_left: bool,

    #[sea_orm(default_value = false)]
    pub counterpart_left: bool,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether `actor_id` is one of the two participants.
    #[must_use]
    pub fn is_participant(&self, actor_id: &str) -> bool {
        self.host_actor_id == actor_id || self.counterpart_actor_id == actor_id
    }

    /// The participant that is not `actor_id`.
    #[must_use]
    pub fn other_participant(&self, actor_id: &str) -> &str {
        if self.host_actor_id == actor_id {
            &self.counterpart_actor_id
        } else {
            &self.host_actor_id
        }
    }

    /// Whether `actor_id` has left the room.
    #[must_use]
    pub fn has_left(&self, actor_id: &str) -> bool {
        if self.host_actor_id == actor_id {
            self.host_left
        } else if self.counterpart_actor_id == actor_id {
            self.counterpart_left
        } else {
            true
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::chat_message::Entity")]
    Messages,
}

impl Related<super::chat_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
