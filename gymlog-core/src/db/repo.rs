//! Database repository layer
//!
//! Provides the database handle and the two table accessors, [`GymLogs`] and
//! [`Users`]. Everything here is synchronous; the async façade lives in
//! [`crate::repository`].

use crate::config::ObserverConfig;
use crate::error::Result;
use crate::types::{GymLog, Table, User};
use chrono::{DateTime, Utc};
use rusqlite::hooks::Action;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

/// Database handle with connection pooling (single connection for now)
///
/// Every row change on the connection is reported on the invalidation
/// channel, regardless of which code path issued the statement.
pub struct Database {
    conn: Mutex<Connection>,
    invalidations: broadcast::Sender<Table>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, &ObserverConfig::default())
    }

    /// Open or create a database at the given path with explicit observer tuning
    pub fn open_with(path: &Path, observers: &ObserverConfig) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        tracing::debug!(path = %path.display(), "Opened database");
        Ok(Self::with_connection(conn, observers.channel_capacity))
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with(&ObserverConfig::default())
    }

    /// Open an in-memory database with explicit observer tuning
    pub fn open_in_memory_with(observers: &ObserverConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self::with_connection(conn, observers.channel_capacity))
    }

    fn with_connection(conn: Connection, capacity: usize) -> Self {
        let (invalidations, _) = broadcast::channel(capacity.max(1));

        let tx = invalidations.clone();
        conn.update_hook(Some(
            move |_: Action, _: &str, table: &str, _: i64| {
                if let Some(table) = Table::from_name(table) {
                    // No receivers just means nobody is observing yet.
                    let _ = tx.send(table);
                }
            },
        ));

        Self {
            conn: Mutex::new(conn),
            invalidations,
        }
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.connection();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    ///
    /// Writes made through this guard still notify observers.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to table-change notifications
    pub fn invalidations(&self) -> broadcast::Receiver<Table> {
        self.invalidations.subscribe()
    }

    /// Accessor for the `gym_logs` table
    pub fn gym_logs(&self) -> GymLogs<'_> {
        GymLogs { db: self }
    }

    /// Accessor for the `users` table
    pub fn users(&self) -> Users<'_> {
        Users { db: self }
    }
}

fn parse_timestamp(row: &Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            let index = row.as_ref().column_index(column).unwrap_or_default();
            rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e))
        })
}

// ============================================
// GymLog operations
// ============================================

/// Queries and inserts against the `gym_logs` table.
pub struct GymLogs<'a> {
    db: &'a Database,
}

impl GymLogs<'_> {
    /// Insert a log entry, returning its storage-assigned id
    ///
    /// The `id` field of `log` is ignored.
    pub fn insert(&self, log: &GymLog) -> Result<i64> {
        let conn = self.db.connection();
        conn.execute(
            r#"
            INSERT INTO gym_logs (user_id, exercise, weight, reps, logged_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                log.user_id,
                log.exercise,
                log.weight,
                log.reps,
                log.logged_at.to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get every log entry in insertion order
    pub fn all(&self) -> Result<Vec<GymLog>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare("SELECT * FROM gym_logs ORDER BY id ASC")?;

        let logs = stmt
            .query_map([], Self::row_to_gym_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(logs)
    }

    /// Get a user's log entries in insertion order
    pub fn by_user_id(&self, user_id: i64) -> Result<Vec<GymLog>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare("SELECT * FROM gym_logs WHERE user_id = ? ORDER BY id ASC")?;

        let logs = stmt
            .query_map([user_id], Self::row_to_gym_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(logs)
    }

    fn row_to_gym_log(row: &Row) -> rusqlite::Result<GymLog> {
        Ok(GymLog {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            exercise: row.get("exercise")?,
            weight: row.get("weight")?,
            reps: row.get("reps")?,
            logged_at: parse_timestamp(row, "logged_at")?,
        })
    }
}

// ============================================
// User operations
// ============================================

/// Queries and inserts against the `users` table.
pub struct Users<'a> {
    db: &'a Database,
}

const INSERT_USER: &str = r#"
    INSERT INTO users (username, password, is_admin)
    VALUES (?1, ?2, ?3)
"#;

impl Users<'_> {
    /// Insert a user, returning its storage-assigned id
    pub fn insert(&self, user: &User) -> Result<i64> {
        let conn = self.db.connection();
        conn.execute(
            INSERT_USER,
            params![user.username, user.password, user.is_admin],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert several users in one transaction
    ///
    /// Either every user is stored or none is. Ids are returned in input order.
    pub fn insert_many(&self, users: &[User]) -> Result<Vec<i64>> {
        let mut conn = self.db.connection();
        let tx = conn.transaction()?;

        let mut ids = Vec::with_capacity(users.len());
        for user in users {
            tx.execute(
                INSERT_USER,
                params![user.username, user.password, user.is_admin],
            )?;
            ids.push(tx.last_insert_rowid());
        }

        tx.commit()?;
        Ok(ids)
    }

    /// Get a user by username
    pub fn by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.db.connection();
        conn.query_row(
            "SELECT * FROM users WHERE username = ?",
            [username],
            Self::row_to_user,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Get a user by ID
    pub fn by_id(&self, id: i64) -> Result<Option<User>> {
        let conn = self.db.connection();
        conn.query_row("SELECT * FROM users WHERE id = ?", [id], Self::row_to_user)
            .optional()
            .map_err(Into::into)
    }

    /// List all users ordered by id
    pub fn all(&self) -> Result<Vec<User>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare("SELECT * FROM users ORDER BY id ASC")?;

        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get("id")?,
            username: row.get("username")?,
            password: row.get("password")?,
            is_admin: row.get("is_admin")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn test_user_insert_and_lookup() {
        let db = test_db();

        let id = db.users().insert(&User::new("alice", "pw").admin()).unwrap();
        assert!(id > 0);

        let by_name = db.users().by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert!(by_name.is_admin);

        let by_id = db.users().by_id(id).unwrap().unwrap();
        assert_eq!(by_id, by_name);

        assert!(db.users().by_username("bob").unwrap().is_none());
        assert!(db.users().by_id(id + 100).unwrap().is_none());
    }

    #[test]
    fn test_insert_many_is_atomic() {
        let db = test_db();

        let ids = db
            .users()
            .insert_many(&[User::new("a", "1"), User::new("b", "2")])
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids[0] < ids[1]);

        // Duplicate username rolls back the whole batch
        let result = db
            .users()
            .insert_many(&[User::new("c", "3"), User::new("a", "4")]);
        assert!(matches!(result, Err(Error::Database(_))));
        assert!(db.users().by_username("c").unwrap().is_none());
        assert_eq!(db.users().all().unwrap().len(), 2);
    }

    #[test]
    fn test_gym_log_insert_and_query() {
        let db = test_db();
        let seven = db.users().insert(&User::new("seven", "pw")).unwrap();
        let nine = db.users().insert(&User::new("nine", "pw")).unwrap();

        let first = GymLog::new(seven, "Squat", 100.0, 5);
        let first_id = db.gym_logs().insert(&first).unwrap();
        db.gym_logs()
            .insert(&GymLog::new(nine, "Bench", 60.0, 8))
            .unwrap();
        db.gym_logs()
            .insert(&GymLog::new(seven, "Row", 50.5, 10))
            .unwrap();

        let all = db.gym_logs().all().unwrap();
        assert_eq!(all.len(), 3);

        let sevens = db.gym_logs().by_user_id(seven).unwrap();
        assert_eq!(sevens.len(), 2);
        assert_eq!(sevens[0].id, first_id);
        assert_eq!(sevens[0].exercise, "Squat");
        assert_eq!(sevens[0].logged_at, first.logged_at);
        assert_eq!(sevens[1].weight, 50.5);
    }

    #[test]
    fn test_gym_log_requires_existing_user() {
        let db = test_db();
        let result = db.gym_logs().insert(&GymLog::new(42, "Curl", 10.0, 12));
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[test]
    fn test_writes_publish_invalidations() {
        let db = test_db();
        let mut rx = db.invalidations();

        db.users().insert(&User::new("alice", "pw")).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Table::Users);

        db.connection()
            .execute("UPDATE users SET password = 'new' WHERE username = 'alice'", [])
            .unwrap();
        assert_eq!(rx.try_recv().unwrap(), Table::Users);
        assert!(rx.try_recv().is_err());
    }
}
