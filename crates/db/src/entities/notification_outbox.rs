//! Notification outbox entity.
//!
//! Rows are written in the same transaction as the state change that
//! triggered them and turned into notifications after commit.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::notification::NotificationKind;

/// Delivery state of an outbox row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    /// Gave up after the retry budget was spent.
    #[sea_orm(string_value = "abandoned")]
    Abandoned,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_outbox")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub receiver_id: String,

    #[sea_orm(nullable)]
    pub sender_id: Option<String>,

    pub kind: NotificationKind,

    pub target_id: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub body: String,

    /// Client route opened when the notification is tapped.
    pub redirect_target: String,

    #[sea_orm(column_type = "Json")]
    pub metadata: Json,

    pub status: OutboxStatus,

    /// Failed delivery attempts so far.
    pub attempts: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub last_error: Option<String>,

    #[sea_orm(indexed)]
    pub next_attempt_at: DateTimeWithTimeZone,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub delivered_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
