//! Create notification and notification outbox tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Notification::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notification::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Notification::ReceiverId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notification::SenderId).string_len(32))
                    .col(
                        ColumnDef::new(Notification::Kind)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notification::TargetId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notification::Title)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notification::Body).text().not_null())
                    .col(
                        ColumnDef::new(Notification::RedirectTarget)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notification::Metadata).json().not_null())
                    .col(
                        ColumnDef::new(Notification::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notification::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (receiver_id, is_read) (for unread count)
        manager
            .create_index(
                Index::create()
                    .name("idx_notification_receiver_is_read")
                    .table(Notification::Table)
                    .col(Notification::ReceiverId)
                    .col(Notification::IsRead)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notification_created_at")
                    .table(Notification::Table)
                    .col(Notification::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NotificationOutbox::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NotificationOutbox::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::ReceiverId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(NotificationOutbox::SenderId).string_len(32))
                    .col(
                        ColumnDef::new(NotificationOutbox::Kind)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::TargetId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::Title)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(ColumnDef::new(NotificationOutbox::Body).text().not_null())
                    .col(
                        ColumnDef::new(NotificationOutbox::RedirectTarget)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(ColumnDef::new(NotificationOutbox::Metadata).json().not_null())
                    .col(
                        ColumnDef::new(NotificationOutbox::Status)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(NotificationOutbox::LastError).text())
                    .col(
                        ColumnDef::new(NotificationOutbox::NextAttemptAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::DeliveredAt)
                            .timestamp_with_time_zone(),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (status, next_attempt_at) (for the retry sweep)
        manager
            .create_index(
                Index::create()
                    .name("idx_notification_outbox_due")
                    .table(NotificationOutbox::Table)
                    .col(NotificationOutbox::Status)
                    .col(NotificationOutbox::NextAttemptAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NotificationOutbox::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Notification::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Notification {
    Table,
    Id,
    ReceiverId,
    SenderId,
    Kind,
    TargetId,
    Title,
    Body,
    RedirectTarget,
    Metadata,
    IsRead,
    CreatedAt,
}

#[derive(Iden)]
enum NotificationOutbox {
    Table,
    Id,
    ReceiverId,
    SenderId,
    Kind,
    TargetId,
    Title,
    Body,
    RedirectTarget,
    Metadata,
    Status,
    Attempts,
    LastError,
    NextAttemptAt,
    CreatedAt,
    DeliveredAt,
}
