//! Business logic services.

#![allow(missing_docs)]

pub mod conversation;
pub mod directory;
pub mod event_publisher;
pub mod inbox;
pub mod membership;
pub mod notification;
pub mod request_ledger;

pub use conversation::{
    AccountLookup, ConversationService, CounterpartProfile, PrefetchedProfiles, ProfileQuery,
    ProfileSource, ProfileStrategy, Resolution, ResolvedCounterpart, SportProfileLookup,
    resolve_profile,
};
pub use directory::{DirectoryService, UNKNOWN_NAME};
pub use event_publisher::{EventPublisher, EventPublisherService, NoOpEventPublisher};
pub use inbox::{ConversationSummary, EMPTY_ROOM_PREVIEW, InboxService};
pub use membership::MembershipService;
pub use notification::{
    DeliveryReport, NotificationDraft, NotificationService, NotificationTrigger, excerpt,
};
pub use request_ledger::{
    ApplicationDecision, JoinDecision, RequestLedgerService, SubmitApplicationInput,
    SubmitJoinRequestInput,
};
