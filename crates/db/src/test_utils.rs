//! Test utilities for database operations.
//!
//! Provides an in-memory `SQLite` database carrying the real schema plus a
//! few fixture builders for directory rows.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, DbErr, Set};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::entities::{actor, group, match_post, membership, sport_profile};
use crate::migrations::Migrator;

/// Open a fresh in-memory `SQLite` database and run all migrations.
///
/// The pool holds a single connection so every query sees the same memory
/// database. Work inside a transaction must therefore go through the
/// transaction handle.
pub async fn setup_sqlite() -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let conn = Database::connect(opt).await?;
    Migrator::up(&conn, None).await?;

    info!("Prepared in-memory test database");
    Ok(conn)
}

/// Insert a person actor.
pub async fn insert_actor(
    db: &DatabaseConnection,
    id: &str,
    display_name: &str,
) -> Result<actor::Model, DbErr> {
    actor::ActiveModel {
        id: Set(id.to_string()),
        kind: Set(actor::ActorKind::Person),
        display_name: Set(display_name.to_string()),
        avatar_url: Set(None),
        current_group_id: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
}

/// Insert a sport profile for an actor.
pub async fn insert_sport_profile(
    db: &DatabaseConnection,
    id: &str,
    actor_id: &str,
    sport: &str,
    nickname: &str,
) -> Result<sport_profile::Model, DbErr> {
    sport_profile::ActiveModel {
        id: Set(id.to_string()),
        actor_id: Set(actor_id.to_string()),
        sport: Set(sport.to_string()),
        nickname: Set(nickname.to_string()),
        avatar_url: Set(None),
        attribute: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
}

/// Insert a team group owned by `owner_id`.
pub async fn insert_group(
    db: &DatabaseConnection,
    id: &str,
    owner_id: &str,
    name: &str,
) -> Result<group::Model, DbErr> {
    group::ActiveModel {
        id: Set(id.to_string()),
        owner_id: Set(owner_id.to_string()),
        kind: Set(group::GroupKind::Team),
        name: Set(name.to_string()),
        description: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
    .insert(db)
    .await
}

/// Insert a membership directly, bypassing the workflow.
pub async fn insert_membership(
    db: &DatabaseConnection,
    id: &str,
    group_id: &str,
    member_actor_id: &str,
    role: membership::MemberRole,
) -> Result<membership::Model, DbErr> {
    membership::ActiveModel {
        id: Set(id.to_string()),
        group_id: Set(group_id.to_string()),
        member_actor_id: Set(member_actor_id.to_string()),
        role: Set(role),
        joined_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
}

/// Insert an open match post.
pub async fn insert_match(
    db: &DatabaseConnection,
    id: &str,
    host_actor_id: &str,
    sport: &str,
    title: &str,
) -> Result<match_post::Model, DbErr> {
    match_post::ActiveModel {
        id: Set(id.to_string()),
        host_actor_id: Set(host_actor_id.to_string()),
        sport: Set(sport.to_string()),
        title: Set(title.to_string()),
        scheduled_at: Set(None),
        status: Set(match_post::MatchStatus::Open),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
}
