//! Background work and the real-time side channel for matchup.
//!
//! - **Pub/Sub**: per-actor change events over Redis
//! - **Scheduler**: notification retries and membership reconciliation

pub mod pubsub;
pub mod scheduler;

pub use pubsub::{PubSubEvent, RedisPubSub, channels as pubsub_channels};
pub use scheduler::{
    JobExecutor, ScheduledJob, SchedulerConfig, WorkflowJobExecutor, run_scheduler,
};
