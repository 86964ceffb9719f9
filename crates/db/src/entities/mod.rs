//! Database entities.

pub mod actor;
pub mod chat_message;
pub mod chat_room;
pub mod group;
pub mod join_request;
pub mod match_application;
pub mod match_post;
pub mod membership;
pub mod notification;
pub mod notification_outbox;
pub mod sport_profile;

pub use actor::Entity as Actor;
pub use chat_message::Entity as ChatMessage;
pub use chat_room::Entity as ChatRoom;
pub use group::Entity as Group;
pub use join_request::Entity as JoinRequest;
pub use match_application::Entity as MatchApplication;
pub use match_post::Entity as MatchPost;
pub use membership::Entity as Membership;
pub use notification::Entity as Notification;
pub use notification_outbox::Entity as NotificationOutbox;
pub use sport_profile::Entity as SportProfile;
