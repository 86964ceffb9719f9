//! Conversation service.
//!
//! Resolves who a viewer is talking to about a match, provisions the
//! per-pair chat room, and carries chat messages.

use std::collections::HashMap;

use crate::services::directory::{DirectoryService, UNKNOWN_NAME};
use crate::services::event_publisher::EventPublisherService;
use async_trait::async_trait;
use chrono::Utc;
use matchup_common::{AppError, AppResult, IdGenerator};
use matchup_db::{
    entities::{
        chat_message, chat_room, match_application::ApplicationStatus, match_post, sport_profile,
    },
    repositories::{ChatRepository, MatchApplicationRepository, MatchPostRepository},
};
use sea_orm::{ConnectionTrait, Set, TransactionTrait};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Where a counterpart's display data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfileSource {
    Prefetched,
    SportProfile,
    Account,
    Placeholder,
}

/// Display data for the other side of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartProfile {
    pub actor_id: String,
    pub profile_id: Option<String>,
    pub name: String,
    pub avatar_url: Option<String>,
    pub source: ProfileSource,
}

impl CounterpartProfile {
    /// Placeholder rendered when every strategy came up empty.
    #[must_use]
    pub fn placeholder(actor_id: &str) -> Self {
        Self {
            actor_id: actor_id.to_string(),
            profile_id: None,
            name: UNKNOWN_NAME.to_string(),
            avatar_url: None,
            source: ProfileSource::Placeholder,
        }
    }

    fn from_sport_profile(profile: sport_profile::Model, source: ProfileSource) -> Self {
        Self {
            actor_id: profile.actor_id,
            profile_id: Some(profile.id),
            name: profile.nickname,
            avatar_url: profile.avatar_url,
            source,
        }
    }
}

/// What is known about the counterpart before resolution.
#[derive(Debug, Clone, Copy)]
pub struct ProfileQuery<'a> {
    pub actor_id: &'a str,
    /// Profile the counterpart used, when the relationship recorded one.
    pub profile_id: Option<&'a str>,
    pub sport: Option<&'a str>,
}

/// Result of one resolution strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(CounterpartProfile),
    NotFound,
}

/// One step of the counterpart fallback chain.
#[async_trait]
pub trait ProfileStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn resolve(&self, query: &ProfileQuery<'_>) -> AppResult<Resolution>;
}

/// Profiles already loaded by a batch query.
#[derive(Debug, Clone, Default)]
pub struct PrefetchedProfiles {
    by_id: HashMap<String, sport_profile::Model>,
    by_actor_sport: HashMap<(String, String), sport_profile::Model>,
}

impl PrefetchedProfiles {
    #[must_use]
    pub fn new(profiles: Vec<sport_profile::Model>) -> Self {
        let mut prefetched = Self::default();
        for profile in profiles {
            prefetched
                .by_actor_sport
                .entry((profile.actor_id.clone(), profile.sport.clone()))
                .or_insert_with(|| profile.clone());
            prefetched.by_id.insert(profile.id.clone(), profile);
        }
        prefetched
    }
}

#[async_trait]
impl ProfileStrategy for PrefetchedProfiles {
    fn name(&self) -> &'static str {
        "prefetched"
    }

    async fn resolve(&self, query: &ProfileQuery<'_>) -> AppResult<Resolution> {
        let hit = match (query.profile_id, query.sport) {
            (Some(id), _) => self.by_id.get(id),
            (None, Some(sport)) => self
                .by_actor_sport
                .get(&(query.actor_id.to_string(), sport.to_string())),
            (None, None) => None,
        };

        Ok(hit.map_or(Resolution::NotFound, |p| {
            Resolution::Found(CounterpartProfile::from_sport_profile(
                p.clone(),
                ProfileSource::Prefetched,
            ))
        }))
    }
}

/// Point lookup of the sport profile by its ID, or by actor and sport.
pub struct SportProfileLookup {
    directory: DirectoryService,
}

impl SportProfileLookup {
    #[must_use]
    pub const fn new(directory: DirectoryService) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl ProfileStrategy for SportProfileLookup {
    fn name(&self) -> &'static str {
        "sport_profile"
    }

    async fn resolve(&self, query: &ProfileQuery<'_>) -> AppResult<Resolution> {
        let profile = match (query.profile_id, query.sport) {
            (Some(id), _) => self.directory.get_profile(id).await?,
            (None, Some(sport)) => {
                self.directory
                    .get_profile_for_sport(query.actor_id, sport)
                    .await?
            }
            (None, None) => None,
        };

        Ok(profile.map_or(Resolution::NotFound, |p| {
            Resolution::Found(CounterpartProfile::from_sport_profile(
                p,
                ProfileSource::SportProfile,
            ))
        }))
    }
}

/// Generic account record of the actor.
pub struct AccountLookup {
    directory: DirectoryService,
}

impl AccountLookup {
    #[must_use]
    pub const fn new(directory: DirectoryService) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl ProfileStrategy for AccountLookup {
    fn name(&self) -> &'static str {
        "account"
    }

    async fn resolve(&self, query: &ProfileQuery<'_>) -> AppResult<Resolution> {
        Ok(self
            .directory
            .get_actor(query.actor_id)
            .await?
            .map_or(Resolution::NotFound, |actor| {
                Resolution::Found(CounterpartProfile {
                    actor_id: actor.id,
                    profile_id: None,
                    name: actor.display_name,
                    avatar_url: actor.avatar_url,
                    source: ProfileSource::Account,
                })
            }))
    }
}

/// Run strategies in order; the first hit wins, otherwise a placeholder.
///
/// A failing strategy counts as a miss so one broken lookup never hides the
/// conversation.
pub async fn resolve_profile(
    strategies: &[&dyn ProfileStrategy],
    query: &ProfileQuery<'_>,
) -> CounterpartProfile {
    for strategy in strategies {
        match strategy.resolve(query).await {
            Ok(Resolution::Found(profile)) => return profile,
            Ok(Resolution::NotFound) => {
                debug!(strategy = strategy.name(), actor_id = %query.actor_id, "Profile not found");
            }
            Err(e) => {
                warn!(strategy = strategy.name(), actor_id = %query.actor_id, error = %e, "Profile lookup failed");
            }
        }
    }

    CounterpartProfile::placeholder(query.actor_id)
}

/// Counterpart of a viewer within a match.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCounterpart {
    pub match_id: String,
    pub counterpart_actor_id: String,
    pub profile: CounterpartProfile,
    pub room_id: Option<String>,
    pub viewer_is_host: bool,
}

/// Conversation service for business logic.
#[derive(Clone)]
pub struct ConversationService {
    chat_repo: ChatRepository,
    match_repo: MatchPostRepository,
    application_repo: MatchApplicationRepository,
    directory: DirectoryService,
    event_publisher: Option<EventPublisherService>,
    max_message_length: usize,
}

impl ConversationService {
    /// Create a new conversation service.
    #[must_use]
    pub const fn new(
        chat_repo: ChatRepository,
        match_repo: MatchPostRepository,
        application_repo: MatchApplicationRepository,
        directory: DirectoryService,
        max_message_length: usize,
    ) -> Self {
        Self {
            chat_repo,
            match_repo,
            application_repo,
            directory,
            event_publisher: None,
            max_message_length,
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    // ==================== Resolution ====================

    /// Determine the viewer's counterpart in a match.
    ///
    /// A host sees the accepted applicant, or the latest pending one when
    /// nobody was accepted yet. An applicant sees the host.
    pub async fn resolve_counterpart(
        &self,
        match_id: &str,
        viewer_id: &str,
    ) -> AppResult<ResolvedCounterpart> {
        let match_post = self.match_repo.get_by_id(match_id).await?;

        let (counterpart_actor_id, profile_id, viewer_is_host) =
            if match_post.host_actor_id == viewer_id {
                let application = match self
                    .application_repo
                    .find_latest_for_match(match_id, ApplicationStatus::Accepted)
                    .await?
                {
                    Some(application) => Some(application),
                    None => {
                        self.application_repo
                            .find_latest_for_match(match_id, ApplicationStatus::Pending)
                            .await?
                    }
                };

                let application = application.ok_or_else(|| {
                    AppError::NotFound(format!("No applicant for match {match_id} yet"))
                })?;
                (
                    application.applicant_actor_id,
                    Some(application.applicant_profile_id),
                    true,
                )
            } else {
                self.require_engaged_applicant(&match_post, viewer_id).await?;
                (match_post.host_actor_id.clone(), None, false)
            };

        let query = ProfileQuery {
            actor_id: &counterpart_actor_id,
            profile_id: profile_id.as_deref(),
            sport: Some(&match_post.sport),
        };
        let sport_lookup = SportProfileLookup::new(self.directory.clone());
        let account_lookup = AccountLookup::new(self.directory.clone());
        let profile = resolve_profile(&[&sport_lookup, &account_lookup], &query).await;

        let applicant_id = if viewer_is_host {
            counterpart_actor_id.as_str()
        } else {
            viewer_id
        };
        let room = ChatRepository::find_room_by_pair_in(self.chat_repo.db(), match_id, applicant_id)
            .await?;

        Ok(ResolvedCounterpart {
            match_id: match_id.to_string(),
            counterpart_actor_id,
            profile,
            room_id: room.map(|r| r.id),
            viewer_is_host,
        })
    }

    /// The viewer must hold a live application to the match or already
    /// have a room in it.
    async fn require_engaged_applicant(
        &self,
        match_post: &match_post::Model,
        viewer_id: &str,
    ) -> AppResult<()> {
        for status in [ApplicationStatus::Accepted, ApplicationStatus::Pending] {
            if self
                .application_repo
                .find_latest_for_pair(&match_post.id, viewer_id, status)
                .await?
                .is_some()
            {
                return Ok(());
            }
        }

        if ChatRepository::find_room_by_pair_in(self.chat_repo.db(), &match_post.id, viewer_id)
            .await?
            .is_some()
        {
            return Ok(());
        }

        Err(AppError::NotAuthorized(
            "You are not part of this match".to_string(),
        ))
    }

    // ==================== Rooms ====================

    /// Get or create the room for `(match, counterpart)`.
    pub async fn ensure_room(
        &self,
        match_id: &str,
        host_actor_id: &str,
        counterpart_actor_id: &str,
    ) -> AppResult<chat_room::Model> {
        let match_post = self.match_repo.get_by_id(match_id).await?;
        if match_post.host_actor_id != host_actor_id {
            return Err(AppError::Validation(
                "Host does not match the match record".to_string(),
            ));
        }

        let txn = self.chat_repo.db().begin().await?;
        let (room, created) = Self::ensure_room_in(&txn, &match_post, counterpart_actor_id).await?;
        txn.commit().await?;

        if created {
            self.publish_room_changed(&room.counterpart_actor_id, &room.id)
                .await;
        }

        Ok(room)
    }

    /// Get or create the room on the caller's connection or transaction.
    ///
    /// Returns the room and whether it was created by this call.
    pub async fn ensure_room_in<C: ConnectionTrait>(
        conn: &C,
        match_post: &match_post::Model,
        counterpart_actor_id: &str,
    ) -> AppResult<(chat_room::Model, bool)> {
        if match_post.host_actor_id == counterpart_actor_id {
            return Err(AppError::Validation(
                "A host cannot open a room with themselves".to_string(),
            ));
        }

        let model = chat_room::ActiveModel {
            id: Set(IdGenerator::new().generate()),
            match_id: Set(match_post.id.clone()),
            host_actor_id: Set(match_post.host_actor_id.clone()),
            counterpart_actor_id: Set(counterpart_actor_id.to_string()),
            host_left: Set(false),
            counterpart_left: Set(false),
            created_at: Set(Utc::now().into()),
        };

        let created = ChatRepository::insert_room_if_absent(conn, model).await?;
        let room = ChatRepository::find_room_by_pair_in(conn, &match_post.id, counterpart_actor_id)
            .await?
            .ok_or_else(|| {
                AppError::ConsistencyFailure(format!(
                    "Chat room for match {} missing after insert",
                    match_post.id
                ))
            })?;

        if created {
            info!(room_id = %room.id, match_id = %room.match_id, "Chat room created");
        }

        Ok((room, created))
    }

    /// Hide a room from the viewer's inbox. History is kept.
    pub async fn leave_room(&self, room_id: &str, viewer_id: &str) -> AppResult<()> {
        let room = self.get_room_for_participant(room_id, viewer_id).await?;
        let host_side = room.host_actor_id == viewer_id;

        self.chat_repo.set_left(&room.id, host_side).await?;
        self.publish_room_changed(viewer_id, &room.id).await;

        Ok(())
    }

    async fn get_room_for_participant(
        &self,
        room_id: &str,
        viewer_id: &str,
    ) -> AppResult<chat_room::Model> {
        let room = self
            .chat_repo
            .find_room_by_id(room_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Chat room not found: {room_id}")))?;

        if !room.is_participant(viewer_id) {
            return Err(AppError::NotAuthorized(
                "You are not a participant of this room".to_string(),
            ));
        }

        Ok(room)
    }

    // ==================== Messages ====================

    /// Send a message into an existing room.
    ///
    /// Clears both left flags so the room shows up again for either side.
    pub async fn send_message(
        &self,
        room_id: &str,
        sender_id: &str,
        text: &str,
    ) -> AppResult<chat_message::Model> {
        let text = self.validate_text(text)?;
        let room = self.get_room_for_participant(room_id, sender_id).await?;

        let txn = self.chat_repo.db().begin().await?;
        let message = Self::append_in(&txn, &room, sender_id, &text).await?;
        txn.commit().await?;

        self.after_send(&room, &message).await;
        Ok(message)
    }

    /// Send a message about a match, provisioning the room when an
    /// applicant writes first.
    pub async fn send_match_message(
        &self,
        match_id: &str,
        sender_id: &str,
        text: &str,
    ) -> AppResult<chat_message::Model> {
        let text = self.validate_text(text)?;
        let match_post = self.match_repo.get_by_id(match_id).await?;

        if match_post.host_actor_id == sender_id {
            return Err(AppError::NotEligible(
                "Hosts reply from within a conversation".to_string(),
            ));
        }
        self.require_engaged_applicant(&match_post, sender_id).await?;

        let txn = self.chat_repo.db().begin().await?;
        let (room, created) = Self::ensure_room_in(&txn, &match_post, sender_id).await?;
        let message = Self::append_in(&txn, &room, sender_id, &text).await?;
        txn.commit().await?;

        if created {
            self.publish_room_changed(&room.host_actor_id, &room.id).await;
        }
        self.after_send(&room, &message).await;

        Ok(message)
    }

    /// Messages of a room, newest first.
    pub async fn list_messages(
        &self,
        room_id: &str,
        viewer_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<chat_message::Model>> {
        self.get_room_for_participant(room_id, viewer_id).await?;

        let limit = limit.clamp(1, 100);
        self.chat_repo.find_messages(room_id, limit, until_id).await
    }

    fn validate_text(&self, text: &str) -> AppResult<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Message must not be empty".to_string()));
        }

        if text.chars().count() > self.max_message_length {
            return Err(AppError::Validation(format!(
                "Message must be at most {} characters",
                self.max_message_length
            )));
        }

        Ok(text.to_string())
    }

    async fn append_in<C: ConnectionTrait>(
        conn: &C,
        room: &chat_room::Model,
        sender_id: &str,
        text: &str,
    ) -> AppResult<chat_message::Model> {
        let message = ChatRepository::create_message(
            conn,
            chat_message::ActiveModel {
                id: Set(IdGenerator::new().generate()),
                room_id: Set(room.id.clone()),
                sender_id: Set(sender_id.to_string()),
                text: Set(text.to_string()),
                created_at: Set(Utc::now().into()),
            },
        )
        .await?;

        if room.host_left || room.counterpart_left {
            ChatRepository::reopen(conn, &room.id).await?;
        }

        Ok(message)
    }

    async fn after_send(&self, room: &chat_room::Model, message: &chat_message::Model) {
        let recipient = room.other_participant(&message.sender_id);

        if room.has_left(recipient) {
            self.publish_room_changed(recipient, &room.id).await;
        }

        if let Some(ref publisher) = self.event_publisher {
            if let Err(e) = publisher
                .publish_chat_message(recipient, &room.id, &message.id, &message.sender_id)
                .await
            {
                warn!(room_id = %room.id, error = %e, "Failed to publish chat message event");
            }
        }
    }

    async fn publish_room_changed(&self, actor_id: &str, room_id: &str) {
        if let Some(ref publisher) = self.event_publisher {
            if let Err(e) = publisher.publish_room_changed(actor_id, room_id).await {
                warn!(room_id = %room_id, error = %e, "Failed to publish room event");
            }
        }
    }
}
