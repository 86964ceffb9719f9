//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    #[sea_orm(string_value = "join_request")]
    JoinRequest,
    #[sea_orm(string_value = "join_approved")]
    JoinApproved,
    #[sea_orm(string_value = "join_rejected")]
    JoinRejected,
    #[sea_orm(string_value = "match_apply")]
    MatchApply,
    #[sea_orm(string_value = "match_accepted")]
    MatchAccepted,
    #[sea_orm(string_value = "match_rejected")]
    MatchRejected,
    #[sea_orm(string_value = "chat_open")]
    ChatOpen,
}

impl NotificationKind {
    /// Wire name, also used as the event type on the side channel.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::JoinRequest => "JOIN_REQUEST",
            Self::JoinApproved => "JOIN_APPROVED",
            Self::JoinRejected => "JOIN_REJECTED",
            Self::MatchApply => "MATCH_APPLY",
            Self::MatchAccepted => "MATCH_ACCEPTED",
            Self::MatchRejected => "MATCH_REJECTED",
            Self::ChatOpen => "CHAT_OPEN",
        }
    }
}

/// A notification addressed to one receiver.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub receiver_id: String,

    #[sea_orm(nullable)]
    pub sender_id: Option<String>,

    pub kind: NotificationKind,

    /// Request, application, or room this notification points at.
    pub target_id: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub body: String,

    /// Client route opened when the notification is tapped.
    pub redirect_target: String,

    /// Names, titles, and message excerpt captured at send time.
    #[sea_orm(column_type = "Json")]
    pub metadata: Json,

    #[sea_orm(default_value = false)]
    pub is_read: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
