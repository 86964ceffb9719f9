//! Create chat room and chat message tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChatRoom::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatRoom::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChatRoom::MatchId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(ChatRoom::HostActorId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChatRoom::CounterpartActorId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChatRoom::HostLeft)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ChatRoom::CounterpartLeft)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ChatRoom::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_room_match")
                            .from(ChatRoom::Table, ChatRoom::MatchId)
                            .to(MatchPost::Table, MatchPost::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_chat_room_pair")
                    .table(ChatRoom::Table)
                    .col(ChatRoom::MatchId)
                    .col(ChatRoom::CounterpartActorId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chat_room_host_actor_id")
                    .table(ChatRoom::Table)
                    .col(ChatRoom::HostActorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chat_room_counterpart_actor_id")
                    .table(ChatRoom::Table)
                    .col(ChatRoom::CounterpartActorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChatMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatMessage::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChatMessage::RoomId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(ChatMessage::SenderId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChatMessage::Text).text().not_null())
                    .col(
                        ColumnDef::new(ChatMessage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_message_room")
                            .from(ChatMessage::Table, ChatMessage::RoomId)
                            .to(ChatRoom::Table, ChatRoom::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (room_id, created_at) (for latest message and history)
        manager
            .create_index(
                Index::create()
                    .name("idx_chat_message_room_created_at")
                    .table(ChatMessage::Table)
                    .col(ChatMessage::RoomId)
                    .col(ChatMessage::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChatMessage::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChatRoom::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ChatRoom {
    Table,
    Id,
    MatchId,
    HostActorId,
    CounterpartActorId,
    HostLeft,
    CounterpartLeft,
    CreatedAt,
}

#[derive(Iden)]
enum ChatMessage {
    Table,
    Id,
    RoomId,
    SenderId,
    Text,
    CreatedAt,
}

#[derive(Iden)]
enum MatchPost {
    Table,
    Id,
}
