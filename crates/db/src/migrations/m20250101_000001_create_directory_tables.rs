//! Create actor, sport profile, group, and match post tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Actor::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Actor::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Actor::Kind).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Actor::DisplayName)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Actor::AvatarUrl).string_len(512))
                    .col(ColumnDef::new(Actor::CurrentGroupId).string_len(32))
                    .col(
                        ColumnDef::new(Actor::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_actor_current_group_id")
                    .table(Actor::Table)
                    .col(Actor::CurrentGroupId)
                    .to_owned(),
            )
            .await?;

        // Profiles reference actors without a foreign key; a profile can
        // outlive its account during cleanup and display must tolerate it.
        manager
            .create_table(
                Table::create()
                    .table(SportProfile::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SportProfile::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SportProfile::ActorId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SportProfile::Sport)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SportProfile::Nickname)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SportProfile::AvatarUrl).string_len(512))
                    .col(ColumnDef::new(SportProfile::Attribute).string_len(64))
                    .col(
                        ColumnDef::new(SportProfile::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sport_profile_actor_sport")
                    .table(SportProfile::Table)
                    .col(SportProfile::ActorId)
                    .col(SportProfile::Sport)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Group::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Group::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Group::OwnerId).string_len(32).not_null())
                    .col(ColumnDef::new(Group::Kind).string_len(20).not_null())
                    .col(ColumnDef::new(Group::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Group::Description).text())
                    .col(
                        ColumnDef::new(Group::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Group::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_owner_id")
                    .table(Group::Table)
                    .col(Group::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MatchPost::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MatchPost::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MatchPost::HostActorId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(MatchPost::Sport).string_len(32).not_null())
                    .col(ColumnDef::new(MatchPost::Title).string_len(256).not_null())
                    .col(ColumnDef::new(MatchPost::ScheduledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(MatchPost::Status).string_len(20).not_null())
                    .col(
                        ColumnDef::new(MatchPost::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_match_post_host_actor_id")
                    .table(MatchPost::Table)
                    .col(MatchPost::HostActorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MatchPost::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Group::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SportProfile::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Actor::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Actor {
    Table,
    Id,
    Kind,
    DisplayName,
    AvatarUrl,
    CurrentGroupId,
    CreatedAt,
}

#[derive(Iden)]
enum SportProfile {
    Table,
    Id,
    ActorId,
    Sport,
    Nickname,
    AvatarUrl,
    Attribute,
    CreatedAt,
}

#[derive(Iden)]
enum Group {
    Table,
    Id,
    OwnerId,
    Kind,
    Name,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum MatchPost {
    Table,
    Id,
    HostActorId,
    Sport,
    Title,
    ScheduledAt,
    Status,
    CreatedAt,
}
