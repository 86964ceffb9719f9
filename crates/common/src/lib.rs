//! Common utilities and shared types for matchup.
//!
//! This crate provides foundational components used across all matchup crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: The workflow error taxonomy via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Retry**: Exponential backoff for background delivery via [`RetryPolicy`]
//!
//! # Example
//!
//! ```no_run
//! use matchup_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id = IdGenerator::new().generate();
//!     println!("{} -> {}", config.server.port, id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod retry;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use retry::RetryPolicy;
