//! Observable query results
//!
//! A [`LiveQuery`] holds the latest result of a query and is re-pushed by a
//! background task whenever one of the tables the query reads changes. The
//! task re-runs the query on the [`Worker`] and only publishes values that
//! differ from the current one. It stops once every handle is dropped.

use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::Table;
use crate::worker::Worker;
use std::sync::Arc;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch};

/// Push-updating handle to a query result.
#[derive(Debug, Clone)]
pub struct LiveQuery<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> LiveQuery<T> {
    /// Current value
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next pushed value and return it
    pub async fn changed(&mut self) -> Result<T> {
        self.rx.changed().await.map_err(|_| Error::Closed)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Wait until the value satisfies `predicate`, checking the current value first
    pub async fn wait_for(&mut self, predicate: impl FnMut(&T) -> bool) -> Result<T> {
        let value = self.rx.wait_for(predicate).await.map_err(|_| Error::Closed)?;
        Ok(T::clone(&value))
    }

    /// Another handle over the same query
    pub fn subscribe(&self) -> Self {
        self.clone()
    }

    /// The underlying watch receiver
    pub fn into_receiver(self) -> watch::Receiver<T> {
        self.rx
    }
}

/// Run `query` once, then keep it fresh for as long as a handle is alive.
///
/// The subscription to table changes is taken before the first run so no
/// write can slip in between the initial load and the refresh loop.
pub(crate) async fn observe<T, F>(
    worker: &Worker,
    op: &'static str,
    tables: &'static [Table],
    query: F,
) -> Result<LiveQuery<T>>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(&Database) -> Result<T> + Send + Sync + 'static,
{
    let invalidations = worker.database().invalidations();
    let query = Arc::new(query);

    let initial = {
        let query = Arc::clone(&query);
        worker.call(op, move |db| query(db)).await?
    };

    let (tx, rx) = watch::channel(initial);
    worker
        .runtime()
        .spawn(refresh(worker.clone(), op, tables, invalidations, tx, query));

    Ok(LiveQuery { rx })
}

async fn refresh<T, F>(
    worker: Worker,
    op: &'static str,
    tables: &'static [Table],
    mut invalidations: broadcast::Receiver<Table>,
    tx: watch::Sender<T>,
    query: Arc<F>,
) where
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(&Database) -> Result<T> + Send + Sync + 'static,
{
    loop {
        tokio::select! {
            _ = tx.closed() => break,
            received = invalidations.recv() => match received {
                Ok(table) if !tables.contains(&table) => continue,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(op, skipped, "Observer lagged, refreshing");
                }
                Err(RecvError::Closed) => break,
            },
        }

        // One re-run covers every change queued so far.
        loop {
            match invalidations.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }

        let query = Arc::clone(&query);
        match worker.call(op, move |db| query(db)).await {
            Ok(value) => {
                tx.send_if_modified(|current| {
                    if *current == value {
                        false
                    } else {
                        *current = value;
                        true
                    }
                });
            }
            Err(e) => {
                tracing::warn!(op, error = %e, "Failed to refresh observable query");
            }
        }
    }

    tracing::trace!(op, "Observer stopped");
}
