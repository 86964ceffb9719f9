//! Membership entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a member within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "UPPERCASE")]
#[derive(Default)]
pub enum MemberRole {
    /// Can decide on join requests alongside the owner.
    #[sea_orm(string_value = "leader")]
    Leader,
    /// Regular member.
    #[sea_orm(string_value = "member")]
    #[default]
    Member,
}

impl MemberRole {
    /// Whether this role carries decision authority over join requests.
    #[must_use]
    pub const fn can_decide_requests(&self) -> bool {
        matches!(self, Self::Leader)
    }
}

/// Durable relationship between an actor and a group.
///
/// Unique on `(group_id, member_actor_id)`; this table is the authoritative
/// answer to "is member".
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "membership")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub group_id: String,

    #[sea_orm(indexed)]
    pub member_actor_id: String,

    pub role: MemberRole,

    pub joined_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id",
        on_delete = "Cascade"
    )]
    Group,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
