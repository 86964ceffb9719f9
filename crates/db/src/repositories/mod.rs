//! Database repositories.

pub mod actor;
pub mod chat;
pub mod group;
pub mod join_request;
pub mod match_application;
pub mod match_post;
pub mod membership;
pub mod notification;
pub mod notification_outbox;
pub mod sport_profile;

pub use actor::ActorRepository;
pub use chat::ChatRepository;
pub use group::GroupRepository;
pub use join_request::JoinRequestRepository;
pub use match_application::MatchApplicationRepository;
pub use match_post::MatchPostRepository;
pub use membership::MembershipRepository;
pub use notification::NotificationRepository;
pub use notification_outbox::NotificationOutboxRepository;
pub use sport_profile::SportProfileRepository;
