//! Create join request, match application, and membership tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(JoinRequest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JoinRequest::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(JoinRequest::RequesterId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(JoinRequest::GroupId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(JoinRequest::Status)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(JoinRequest::Message).text())
                    .col(
                        ColumnDef::new(JoinRequest::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(JoinRequest::DecidedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(JoinRequest::DecidedBy).string_len(32))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_join_request_group")
                            .from(JoinRequest::Table, JoinRequest::GroupId)
                            .to(Group::Table, Group::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (group_id, status) (for the pending inbox)
        manager
            .create_index(
                Index::create()
                    .name("idx_join_request_group_status")
                    .table(JoinRequest::Table)
                    .col(JoinRequest::GroupId)
                    .col(JoinRequest::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_join_request_requester_id")
                    .table(JoinRequest::Table)
                    .col(JoinRequest::RequesterId)
                    .to_owned(),
            )
            .await?;

        // At most one pending request per (requester, group). Decided rows
        // stay as history and do not block a new request.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS uq_join_request_pending \
                 ON join_request (requester_id, group_id) WHERE status = 'pending'",
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MatchApplication::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MatchApplication::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MatchApplication::MatchId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MatchApplication::ApplicantActorId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MatchApplication::ApplicantProfileId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MatchApplication::Status)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(MatchApplication::Message).text())
                    .col(ColumnDef::new(MatchApplication::AttributeSnapshot).string_len(64))
                    .col(
                        ColumnDef::new(MatchApplication::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MatchApplication::DecidedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(MatchApplication::DecidedBy).string_len(32))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_match_application_match")
                            .from(MatchApplication::Table, MatchApplication::MatchId)
                            .to(MatchPost::Table, MatchPost::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_match_application_match_status")
                    .table(MatchApplication::Table)
                    .col(MatchApplication::MatchId)
                    .col(MatchApplication::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_match_application_applicant")
                    .table(MatchApplication::Table)
                    .col(MatchApplication::ApplicantActorId)
                    .to_owned(),
            )
            .await?;

        // One live (pending or accepted) application per applicant and match.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS uq_match_application_active \
                 ON match_application (match_id, applicant_actor_id) WHERE status <> 'rejected'",
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Membership::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Membership::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Membership::GroupId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Membership::MemberActorId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Membership::Role).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Membership::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_membership_group")
                            .from(Membership::Table, Membership::GroupId)
                            .to(Group::Table, Group::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_membership_pair")
                    .table(Membership::Table)
                    .col(Membership::GroupId)
                    .col(Membership::MemberActorId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_membership_member_actor_id")
                    .table(Membership::Table)
                    .col(Membership::MemberActorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Membership::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MatchApplication::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(JoinRequest::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum JoinRequest {
    Table,
    Id,
    RequesterId,
    GroupId,
    Status,
    Message,
    CreatedAt,
    DecidedAt,
    DecidedBy,
}

#[derive(Iden)]
enum MatchApplication {
    Table,
    Id,
    MatchId,
    ApplicantActorId,
    ApplicantProfileId,
    Status,
    Message,
    AttributeSnapshot,
    CreatedAt,
    DecidedAt,
    DecidedBy,
}

#[derive(Iden)]
enum Membership {
    Table,
    Id,
    GroupId,
    MemberActorId,
    Role,
    JoinedAt,
}

#[derive(Iden)]
enum Group {
    Table,
    Id,
}

#[derive(Iden)]
enum MatchPost {
    Table,
    Id,
}
