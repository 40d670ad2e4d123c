//! Repository façade over users and gym logs
//!
//! [`GymLogRepository`] is the single entry point the presentation layer uses.
//! Reads are async and run on the blocking pool; writes are dispatched
//! immediately and return a [`PendingCall`] the caller may await or drop.
//! Observable reads return a [`LiveQuery`] that is re-pushed whenever the
//! tables it reads change.

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::live::{self, LiveQuery};
use crate::types::{GymLog, Table, User};
use crate::worker::{PendingCall, Worker};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::OnceCell;

const USERS: &[Table] = &[Table::Users];
const GYM_LOGS: &[Table] = &[Table::GymLogs];

static SHARED: OnceCell<SharedRepository> = OnceCell::const_new();

/// The process-wide repository and the runtime its worker and observers run on.
///
/// The runtime lives in the static, so the instance keeps working after the
/// caller's runtime shuts down.
struct SharedRepository {
    repo: Arc<GymLogRepository>,
    _runtime: Runtime,
}

/// Access point for reading and writing users and gym logs.
pub struct GymLogRepository {
    worker: Worker,
    /// Every log, loaded at construction and refreshed on each log write
    all_logs: LiveQuery<Vec<GymLog>>,
}

impl GymLogRepository {
    /// Get the process-wide repository, building it on first use
    ///
    /// The first successful call opens the configured database, runs
    /// migrations and loads the log cache; concurrent first callers wait for
    /// that single construction. Later calls return the same instance and
    /// ignore `config`. A failed construction is not memoized.
    ///
    /// The instance runs on a dedicated background runtime owned by the
    /// process, so it can be used from any runtime, including ones started
    /// after the first caller's runtime is gone.
    pub async fn shared(config: &Config) -> Result<Arc<Self>> {
        SHARED
            .get_or_try_init(|| Self::build_shared(config.clone()))
            .await
            .map(|shared| Arc::clone(&shared.repo))
            .map_err(|e| {
                tracing::warn!(error = %e, "Failed to initialize repository");
                e
            })
    }

    async fn build_shared(config: Config) -> Result<SharedRepository> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("gymlog-db")
            .enable_all()
            .build()?;

        // Opened inside the background runtime so the worker binds to it.
        let built = runtime
            .spawn(async move { Self::open(&config).await })
            .await;

        match built {
            Ok(Ok(repo)) => Ok(SharedRepository {
                repo: Arc::new(repo),
                _runtime: runtime,
            }),
            Ok(Err(e)) => {
                runtime.shutdown_background();
                Err(e)
            }
            Err(e) => {
                runtime.shutdown_background();
                Err(e.into())
            }
        }
    }

    /// Open a new, non-shared repository on the configured database
    pub async fn open(config: &Config) -> Result<Self> {
        let path = config.resolved_database_path();
        let observers = config.observers.clone();

        tracing::info!(path = %path.display(), "Opening repository");

        let db = tokio::task::spawn_blocking(move || {
            let db = Database::open_with(&path, &observers)?;
            db.migrate()?;
            Ok::<_, Error>(db)
        })
        .await??;

        Self::with_database(db).await
    }

    /// Build a repository over an already opened and migrated database
    pub async fn with_database(db: Database) -> Result<Self> {
        let worker = Worker::new(Arc::new(db));
        let all_logs = live::observe(&worker, "all_logs", GYM_LOGS, |db| db.gym_logs().all()).await?;

        tracing::debug!(cached = all_logs.get().len(), "Log cache loaded");
        Ok(Self { worker, all_logs })
    }

    /// The underlying database handle
    pub fn database(&self) -> &Arc<Database> {
        self.worker.database()
    }

    // ============================================
    // Gym logs
    // ============================================

    /// Fetch every log entry in insertion order
    ///
    /// An empty table is `Ok(vec![])`; failures are `Err` and are logged.
    pub async fn all_logs(&self) -> Result<Vec<GymLog>> {
        self.worker
            .call("all_logs", |db| db.gym_logs().all())
            .await
    }

    /// Current contents of the log cache without touching the database
    pub fn cached_logs(&self) -> Vec<GymLog> {
        self.all_logs.get()
    }

    /// Observe the log cache
    pub fn observe_all_logs(&self) -> LiveQuery<Vec<GymLog>> {
        self.all_logs.subscribe()
    }

    /// Insert a log entry
    ///
    /// The insert starts immediately. Await the result for the new id, or
    /// drop it to fire and forget.
    pub fn insert_gym_log(&self, log: GymLog) -> PendingCall<i64> {
        self.worker
            .submit("insert_gym_log", move |db| db.gym_logs().insert(&log))
    }

    /// Observe a user's log entries in insertion order
    pub async fn observe_logs_by_user_id(&self, user_id: i64) -> Result<LiveQuery<Vec<GymLog>>> {
        live::observe(&self.worker, "logs_by_user_id", GYM_LOGS, move |db| {
            db.gym_logs().by_user_id(user_id)
        })
        .await
    }

    /// Fetch a user's log entries in insertion order
    #[deprecated(note = "use `observe_logs_by_user_id` instead")]
    pub async fn logs_by_user_id(&self, user_id: i64) -> Result<Vec<GymLog>> {
        self.worker
            .call("logs_by_user_id", move |db| db.gym_logs().by_user_id(user_id))
            .await
    }

    // ============================================
    // Users
    // ============================================

    /// Insert a single user
    pub fn insert_user(&self, user: User) -> PendingCall<i64> {
        self.worker
            .submit("insert_user", move |db| db.users().insert(&user))
    }

    /// Insert one or more users in a single transaction
    pub fn insert_users(&self, users: impl IntoIterator<Item = User>) -> PendingCall<Vec<i64>> {
        let users: Vec<User> = users.into_iter().collect();
        self.worker
            .submit("insert_users", move |db| db.users().insert_many(&users))
    }

    /// Observe the user with the given username (`None` while absent)
    pub async fn observe_user_by_username(&self, username: &str) -> Result<LiveQuery<Option<User>>> {
        let username = username.to_string();
        live::observe(&self.worker, "user_by_username", USERS, move |db| {
            db.users().by_username(&username)
        })
        .await
    }

    /// Observe the user with the given id (`None` while absent)
    pub async fn observe_user_by_id(&self, user_id: i64) -> Result<LiveQuery<Option<User>>> {
        live::observe(&self.worker, "user_by_id", USERS, move |db| {
            db.users().by_id(user_id)
        })
        .await
    }

    /// List every user ordered by id
    pub async fn all_users(&self) -> Result<Vec<User>> {
        self.worker.call("all_users", |db| db.users().all()).await
    }

    /// Look up a user by username, failing if there is none
    pub async fn require_user(&self, username: &str) -> Result<User> {
        let name = username.to_string();
        self.worker
            .call("user_by_username", move |db| db.users().by_username(&name))
            .await?
            .ok_or_else(|| Error::UserNotFound(username.to_string()))
    }
}
