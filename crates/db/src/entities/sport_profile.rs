//! Sport-specific profile entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-sport display profile of an actor.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sport_profile")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning actor.
    #[sea_orm(indexed)]
    pub actor_id: String,

    /// Sport key, e.g. `boxing`, `futsal`.
    pub sport: String,

    /// Name shown on cards and in chat.
    pub nickname: String,

    #[sea_orm(nullable)]
    pub avatar_url: Option<String>,

    /// Weight class or similar attribute, sport dependent.
    #[sea_orm(nullable)]
    pub attribute: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::actor::Entity",
        from = "Column::ActorId",
        to = "super::actor::Column::Id"
    )]
    Actor,
}

impl Related<super::actor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Actor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
