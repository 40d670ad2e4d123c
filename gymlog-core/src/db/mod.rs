//! Database layer for gymlog
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Table accessors for users and gym logs
//! - Row-change notifications that drive observable queries

pub mod repo;
pub mod schema;

pub use repo::{Database, GymLogs, Users};
