//! Background dispatch of blocking database work
//!
//! All storage calls run on tokio's blocking pool via the runtime handle that
//! was current when the [`Worker`] was created, so callers on any thread can
//! submit work without being inside the runtime themselves.

use crate::db::Database;
use crate::error::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Shared execution context: the database plus the runtime that runs its calls.
#[derive(Clone)]
pub struct Worker {
    db: Arc<Database>,
    runtime: Handle,
}

impl Worker {
    /// Bind a database to the current tokio runtime
    ///
    /// Panics if called outside a runtime, like [`Handle::current`].
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_handle(db, Handle::current())
    }

    /// Bind a database to an explicit runtime handle
    pub fn with_handle(db: Arc<Database>, runtime: Handle) -> Self {
        Self { db, runtime }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Start `op` on the blocking pool immediately
    ///
    /// Failures are logged from inside the task, so they are reported even if
    /// the returned handle is dropped.
    pub fn submit<T, F>(&self, op: &'static str, f: F) -> PendingCall<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let handle = self.runtime.spawn_blocking(move || {
            let result = f(&db);
            if let Err(e) = &result {
                tracing::warn!(op, error = %e, "Database operation failed");
            }
            result
        });
        PendingCall { op, handle }
    }

    /// Run `op` on the blocking pool and wait for its result
    pub async fn call<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        self.submit(op, f).await
    }
}

/// Handle to a database call (read or write) already running on the blocking pool.
///
/// Awaiting it yields the call's result. Dropping it leaves the call running;
/// that is how fire-and-forget writes are issued.
pub struct PendingCall<T> {
    op: &'static str,
    handle: JoinHandle<Result<T>>,
}

impl<T> Future for PendingCall<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let op = self.op;
        Pin::new(&mut self.handle).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(op, error = %e, "Database worker did not complete");
                Err(Error::from(e))
            }
        })
    }
}
