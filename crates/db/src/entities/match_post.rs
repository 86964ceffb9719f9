//! Match post entity (a sparring or match listing).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a match post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchStatus {
    /// Accepting applications.
    #[sea_orm(string_value = "open")]
    Open,
    /// No longer accepting applications.
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// A match listing hosted by an actor.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "match_post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub host_actor_id: String,

    /// Sport key; selects the applicant's sport profile on display.
    pub sport: String,

    pub title: String,

    #[sea_orm(nullable)]
    pub scheduled_at: Option<DateTimeWithTimeZone>,

    pub status: MatchStatus,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::match_application::Entity")]
    Applications,
}

impl Related<super::match_application::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Applications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
