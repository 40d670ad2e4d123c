//! Core domain types for gymlog
//!
//! | Term | Definition |
//! |------|------------|
//! | **User** | An account that owns gym logs; usernames are unique |
//! | **GymLog** | One exercise entry: exercise name, weight, reps, time |
//!
//! Both records get their `id` from storage. Construct new records with
//! `id = 0` and use the id returned by the insert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================
// User
// ============================================

/// An account that owns gym logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Storage-assigned identifier (0 until inserted)
    pub id: i64,
    /// Unique login name
    pub username: String,
    /// Credential as stored by the schema; never interpreted here
    pub password: String,
    /// Whether this account has admin rights
    pub is_admin: bool,
}

impl User {
    /// Create a new, not yet persisted user
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: 0,
            username: username.into(),
            password: password.into(),
            is_admin: false,
        }
    }

    /// Mark this user as an admin
    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

// ============================================
// GymLog
// ============================================

/// A single exercise-session entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GymLog {
    /// Storage-assigned identifier (0 until inserted)
    pub id: i64,
    /// Owning user's id
    pub user_id: i64,
    /// Exercise name (e.g., "Bench Press")
    pub exercise: String,
    /// Weight lifted
    pub weight: f64,
    /// Repetitions performed
    pub reps: i32,
    /// When the entry was recorded
    pub logged_at: DateTime<Utc>,
}

impl GymLog {
    /// Create a new, not yet persisted log entry stamped with the current time
    pub fn new(user_id: i64, exercise: impl Into<String>, weight: f64, reps: i32) -> Self {
        Self {
            id: 0,
            user_id,
            exercise: exercise.into(),
            weight,
            reps,
            logged_at: Utc::now(),
        }
    }
}

impl fmt::Display for GymLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  {:<20} {:>7.1} x {:<3} ({})",
            self.logged_at.format("%Y-%m-%d %H:%M"),
            self.exercise,
            self.weight,
            self.reps,
            self.id
        )
    }
}

// ============================================
// Tables
// ============================================

/// Tables that observable queries can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    GymLogs,
}

impl Table {
    /// SQLite table name
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::GymLogs => "gym_logs",
        }
    }

    /// Parse a SQLite table name, returning None for tables nobody observes
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "users" => Some(Table::Users),
            "gym_logs" => Some(Table::GymLogs),
            _ => None,
        }
    }
}
