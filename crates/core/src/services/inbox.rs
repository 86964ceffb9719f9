//! Inbox service.
//!
//! Read side of chat: one summary per room the viewer has not left, with
//! counterpart display data and a preview of the latest message.

use std::collections::HashMap;

use crate::services::conversation::{
    AccountLookup, CounterpartProfile, PrefetchedProfiles, ProfileQuery, SportProfileLookup,
    resolve_profile,
};
use crate::services::directory::DirectoryService;
use matchup_common::AppResult;
use matchup_db::entities::{match_application::ApplicationStatus, match_post};
use matchup_db::repositories::{ChatRepository, MatchApplicationRepository, MatchPostRepository};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;
use tracing::warn;

/// Preview shown for a room without messages.
pub const EMPTY_ROOM_PREVIEW: &str = "No messages yet";

/// One row of the conversation list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub room_id: String,
    pub match_id: String,
    pub match_title: Option<String>,
    pub viewer_is_host: bool,
    pub counterpart: CounterpartProfile,
    pub last_message: String,
    pub last_message_at: Option<DateTimeWithTimeZone>,
    pub last_sender_id: Option<String>,
    pub last_activity_at: DateTimeWithTimeZone,
}

/// Inbox service for business logic.
#[derive(Clone)]
pub struct InboxService {
    chat_repo: ChatRepository,
    match_repo: MatchPostRepository,
    application_repo: MatchApplicationRepository,
    directory: DirectoryService,
}

impl InboxService {
    /// Create a new inbox service.
    #[must_use]
    pub const fn new(
        chat_repo: ChatRepository,
        match_repo: MatchPostRepository,
        application_repo: MatchApplicationRepository,
        directory: DirectoryService,
    ) -> Self {
        Self {
            chat_repo,
            match_repo,
            application_repo,
            directory,
        }
    }

    /// List the viewer's conversations, most recently active first.
    ///
    /// Only loading the room list itself can fail. Every other lookup
    /// degrades: a missing match drops the title, a missing profile falls
    /// back through the resolver chain, a failed preview shows the
    /// empty-room text.
    pub async fn list_conversations(&self, viewer_id: &str) -> AppResult<Vec<ConversationSummary>> {
        let rooms = self.chat_repo.find_open_rooms_for_actor(viewer_id).await?;
        if rooms.is_empty() {
            return Ok(vec![]);
        }

        let match_ids = unique(rooms.iter().map(|r| r.match_id.clone()));
        let matches: HashMap<String, match_post::Model> = self
            .match_repo
            .find_by_ids(&match_ids)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to prefetch matches for inbox");
                vec![]
            })
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();

        // Profile each applicant used, newest live application wins.
        let mut applicant_profiles: HashMap<(String, String), String> = HashMap::new();
        let applications = self
            .application_repo
            .find_by_matches(&match_ids)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to prefetch applications for inbox");
                vec![]
            });
        for application in applications {
            if application.status == ApplicationStatus::Rejected {
                continue;
            }
            applicant_profiles
                .entry((application.match_id, application.applicant_actor_id))
                .or_insert(application.applicant_profile_id);
        }

        let counterpart_ids = unique(rooms.iter().map(|r| r.other_participant(viewer_id).to_string()));
        let mut profiles = self
            .directory
            .get_profiles(&applicant_profiles.values().cloned().collect::<Vec<_>>())
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to prefetch applicant profiles for inbox");
                vec![]
            });
        profiles.extend(
            self.directory
                .get_profiles_for_actors(&counterpart_ids)
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Failed to prefetch counterpart profiles for inbox");
                    vec![]
                }),
        );
        let prefetched = PrefetchedProfiles::new(profiles);
        let sport_lookup = SportProfileLookup::new(self.directory.clone());
        let account_lookup = AccountLookup::new(self.directory.clone());

        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            let viewer_is_host = room.host_actor_id == viewer_id;
            let counterpart_id = room.other_participant(viewer_id).to_string();
            let match_post = matches.get(&room.match_id);

            // The host's counterpart applied with a specific profile.
            let profile_id = if viewer_is_host {
                applicant_profiles
                    .get(&(room.match_id.clone(), counterpart_id.clone()))
                    .map(String::as_str)
            } else {
                None
            };

            let query = ProfileQuery {
                actor_id: &counterpart_id,
                profile_id,
                sport: match_post.map(|m| m.sport.as_str()),
            };
            let counterpart =
                resolve_profile(&[&prefetched, &sport_lookup, &account_lookup], &query).await;

            let latest = match self.chat_repo.find_latest_message(&room.id).await {
                Ok(latest) => latest,
                Err(e) => {
                    warn!(room_id = %room.id, error = %e, "Failed to load latest message");
                    None
                }
            };

            let last_activity_at = latest
                .as_ref()
                .map_or(room.created_at, |m| m.created_at.max(room.created_at));

            summaries.push(ConversationSummary {
                room_id: room.id,
                match_id: room.match_id,
                match_title: match_post.map(|m| m.title.clone()),
                viewer_is_host,
                counterpart,
                last_message: latest
                    .as_ref()
                    .map_or_else(|| EMPTY_ROOM_PREVIEW.to_string(), |m| m.text.clone()),
                last_message_at: latest.as_ref().map(|m| m.created_at),
                last_sender_id: latest.map(|m| m.sender_id),
                last_activity_at,
            });
        }

        summaries.sort_by(|a, b| {
            b.last_activity_at
                .cmp(&a.last_activity_at)
                .then_with(|| b.room_id.cmp(&a.room_id))
        });

        Ok(summaries)
    }
}

fn unique(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = ids.collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::conversation::{ConversationService, ProfileSource};
    use matchup_db::repositories::{ActorRepository, SportProfileRepository};
    use matchup_db::test_utils::{insert_actor, insert_match, insert_sport_profile, setup_sqlite};
    use sea_orm::DatabaseConnection;
    use std::sync::Arc;

    async fn services() -> (Arc<DatabaseConnection>, ConversationService, InboxService) {
        let db = Arc::new(setup_sqlite().await.unwrap());
        insert_actor(&db, "host", "Host Gym").await.unwrap();
        insert_actor(&db, "a1", "First").await.unwrap();
        insert_actor(&db, "a2", "Second").await.unwrap();
        insert_sport_profile(&db, "p-host", "host", "boxing", "Coach Park")
            .await
            .unwrap();
        insert_match(&db, "m1", "host", "boxing", "Morning rounds")
            .await
            .unwrap();

        let directory = DirectoryService::new(
            ActorRepository::new(Arc::clone(&db)),
            SportProfileRepository::new(Arc::clone(&db)),
        );
        let conversations = ConversationService::new(
            ChatRepository::new(Arc::clone(&db)),
            MatchPostRepository::new(Arc::clone(&db)),
            MatchApplicationRepository::new(Arc::clone(&db)),
            directory.clone(),
            500,
        );
        let inbox = InboxService::new(
            ChatRepository::new(Arc::clone(&db)),
            MatchPostRepository::new(Arc::clone(&db)),
            MatchApplicationRepository::new(Arc::clone(&db)),
            directory,
        );

        (db, conversations, inbox)
    }

    #[tokio::test]
    async fn test_empty_inbox() {
        let (_db, _conversations, inbox) = services().await;
        assert!(inbox.list_conversations("host").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_room_without_messages_uses_preview() {
        let (_db, conversations, inbox) = services().await;
        conversations.ensure_room("m1", "host", "a1").await.unwrap();

        let list = inbox.list_conversations("a1").await.unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].last_message, EMPTY_ROOM_PREVIEW);
        assert!(list[0].last_message_at.is_none());
        assert!(!list[0].viewer_is_host);
        assert_eq!(list[0].counterpart.name, "Coach Park");
        assert_eq!(list[0].counterpart.source, ProfileSource::Prefetched);
        assert_eq!(list[0].match_title.as_deref(), Some("Morning rounds"));
    }

    #[tokio::test]
    async fn test_latest_activity_first() {
        let (_db, conversations, inbox) = services().await;
        let older = conversations.ensure_room("m1", "host", "a1").await.unwrap();
        let newer = conversations.ensure_room("m1", "host", "a2").await.unwrap();

        let list = inbox.list_conversations("host").await.unwrap();
        let order: Vec<_> = list.iter().map(|c| c.room_id.as_str()).collect();
        assert_eq!(order, vec![newer.id.as_str(), older.id.as_str()]);

        conversations
            .send_message(&older.id, "a1", "See you at six")
            .await
            .unwrap();

        let list = inbox.list_conversations("host").await.unwrap();
        assert_eq!(list[0].room_id, older.id);
        assert_eq!(list[0].last_message, "See you at six");
        assert_eq!(list[0].last_sender_id.as_deref(), Some("a1"));
        assert_eq!(list[0].counterpart.name, "First");
        assert_eq!(list[0].counterpart.source, ProfileSource::Account);
        assert!(list[0].viewer_is_host);
    }
}
