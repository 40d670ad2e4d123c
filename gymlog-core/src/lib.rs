//! # gymlog-core
//!
//! Core library for gymlog - a gym session log keeper.
//!
//! This library provides:
//! - Domain types for users and gym logs
//! - Database storage layer with SQLite
//! - A repository façade with async reads, fire-and-forget writes and
//!   observable queries
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use gymlog_core::{Config, GymLog, GymLogRepository, User};
//!
//! # async fn run() -> gymlog_core::Result<()> {
//! let config = Config::load()?;
//! let repo = GymLogRepository::shared(&config).await?;
//!
//! let user_id = repo.insert_user(User::new("alice", "secret")).await?;
//! let mut logs = repo.observe_logs_by_user_id(user_id).await?;
//!
//! // Fire and forget; the observer above picks the insert up.
//! drop(repo.insert_gym_log(GymLog::new(user_id, "Squat", 100.0, 5)));
//! let latest = logs.changed().await?;
//! assert_eq!(latest.len(), 1);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use live::LiveQuery;
pub use repository::GymLogRepository;
pub use types::*;
pub use worker::{PendingCall, Worker};

// Public modules
pub mod config;
pub mod db;
pub mod error;
pub mod live;
pub mod logging;
pub mod repository;
pub mod types;
pub mod worker;
