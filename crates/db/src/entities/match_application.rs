//! Match application entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status of a match application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "UPPERCASE")]
#[derive(Default)]
pub enum ApplicationStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl ApplicationStatus {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        }
    }
}

/// An actor's application to a match post, made under one sport profile.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "match_application")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub match_id: String,

    #[sea_orm(indexed)]
    pub applicant_actor_id: String,

    /// Profile the applicant applied with. Not a foreign key; the profile may
    /// disappear later and display falls back to the account.
    pub applicant_profile_id: String,

    pub status: ApplicationStatus,

    #[sea_orm(column_type = "Text", nullable)]
    pub message: Option<String>,

    /// Weight or similar attribute copied from the profile at apply time.
    #[sea_orm(nullable)]
    pub attribute_snapshot: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub decided_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub decided_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::match_post::Entity",
        from = "Column::MatchId",
        to = "super::match_post::Column::Id",
        on_delete = "Restrict"
    )]
    MatchPost,
}

impl Related<super::match_post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MatchPost.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
