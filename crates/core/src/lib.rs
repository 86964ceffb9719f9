//! Core business logic for matchup.
//!
//! Request ledger, membership materializer, notifier, conversation resolver
//! and inbox aggregator. Transport and scheduling live in the api and queue
//! crates.

pub mod services;

pub use services::*;
