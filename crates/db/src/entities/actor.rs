//! Actor entity (a person or a team that can request, apply, or decide).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    /// An individual player.
    #[sea_orm(string_value = "person")]
    Person,
    /// A team acting as a single party.
    #[sea_orm(string_value = "team")]
    Team,
}

/// Generic account record owned by the directory.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "actor")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub kind: ActorKind,

    /// Display name shown when no sport-specific profile exists.
    pub display_name: String,

    #[sea_orm(nullable)]
    pub avatar_url: Option<String>,

    /// Legacy "current group" pointer.
    ///
    /// Derived from `membership`; rebuilt by the membership materializer and
    /// never written from client input.
    #[sea_orm(nullable, indexed)]
    pub current_group_id: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sport_profile::Entity")]
    SportProfiles,
}

impl Related<super::sport_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SportProfiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
