//! Journaled engine state.
//!
//! The engine runs on an in-memory [`MemoryStore`]. [`JournaledStore`] records
//! every change set the store accepts. A mutation runs against a copy of the
//! graph; the copy replaces the live graph only after its change sets are
//! appended to PostgreSQL.

use std::sync::atomic::Ordering;

use grove_engine::{
    AccessCheck, ChangeSet, Container, ContainerId, Membership, MemoryStore, NodeStore, Project,
    ProjectId, PullRequest, PullRequestId, Snippet, SnippetId, Timestamp, Version, VersionGraph,
    VersionId,
};
use tokio::sync::OwnedRwLockWriteGuard;

use crate::db::{self, Pool};
use crate::error::{AppError, Result};
use crate::AppState;

/// The engine type served by this process.
pub type Graph = VersionGraph<JournaledStore>;

/// A [`MemoryStore`] that remembers the change sets it applied.
#[derive(Debug, Clone, Default)]
pub struct JournaledStore {
    inner: MemoryStore,
    pending: Vec<ChangeSet>,
}

impl JournaledStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            pending: Vec::new(),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Drain the change sets applied since the last call.
    pub fn take_pending(&mut self) -> Vec<ChangeSet> {
        std::mem::take(&mut self.pending)
    }
}

impl AccessCheck for JournaledStore {
    fn is_member(&self, project: &ProjectId, user: &str) -> bool {
        self.inner.is_member(project, user)
    }
}

impl NodeStore for JournaledStore {
    fn project(&self, id: &ProjectId) -> Option<&Project> {
        self.inner.project(id)
    }

    fn projects_of(&self, user: &str) -> Vec<&Project> {
        self.inner.projects_of(user)
    }

    fn version(&self, id: &VersionId) -> Option<&Version> {
        self.inner.version(id)
    }

    fn versions_of(&self, project: &ProjectId) -> Vec<&Version> {
        self.inner.versions_of(project)
    }

    fn membership(&self, version: &VersionId) -> Option<&Membership> {
        self.inner.membership(version)
    }

    fn container(&self, id: &ContainerId) -> Option<&Container> {
        self.inner.container(id)
    }

    fn snippet(&self, id: &SnippetId) -> Option<&Snippet> {
        self.inner.snippet(id)
    }

    fn pull_request(&self, id: &PullRequestId) -> Option<&PullRequest> {
        self.inner.pull_request(id)
    }

    fn pull_requests_of(&self, project: &ProjectId) -> Vec<&PullRequest> {
        self.inner.pull_requests_of(project)
    }

    fn apply(&mut self, changes: &ChangeSet) -> grove_engine::error::Result<()> {
        self.inner.apply(changes)?;
        self.pending.push(changes.clone());
        Ok(())
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> Timestamp {
    Timestamp::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Rebuild the store from the newest snapshot plus the journal after it.
///
/// Returns the graph and the last journal sequence it reflects.
pub async fn restore(pool: &Pool) -> Result<(Graph, i64)> {
    let (mut store, mut seq) = match db::latest_snapshot(pool).await? {
        Some(snapshot) => {
            tracing::info!(
                covers_seq = snapshot.covers_seq,
                taken_at = %snapshot.created_at,
                "Loading snapshot"
            );
            (
                MemoryStore::from_snapshot(snapshot.state)?,
                snapshot.covers_seq,
            )
        }
        None => (MemoryStore::new(), 0),
    };

    let entries = db::change_sets_after(pool, seq).await?;
    tracing::info!(count = entries.len(), after = seq, "Replaying journal");
    for entry in entries {
        store.apply(&entry.changes)?;
        seq = entry.seq;
    }

    Ok((VersionGraph::new(JournaledStore::new(store)), seq))
}

impl AppState {
    /// Run a read-only engine operation.
    pub async fn read<T>(
        &self,
        op: impl FnOnce(&Graph) -> grove_engine::error::Result<T>,
    ) -> Result<T> {
        let graph = self.graph.read().await;
        Ok(op(&*graph)?)
    }

    /// Run a mutating engine operation and journal what it applied.
    ///
    /// The operation runs on a copy of the graph. The copy becomes the live
    /// graph only once its change sets are in the journal, so a failed append
    /// leaves memory as it was. The append runs in its own task and holds the
    /// write lock until it finishes, even if the request is dropped.
    pub async fn mutate<T, F>(&self, op: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut Graph, Timestamp) -> grove_engine::error::Result<T> + Send,
    {
        let mut live = self.graph.clone().write_owned().await;

        let Some(pool) = self.pool.clone() else {
            let outcome = op(&mut *live, now_millis());
            live.store_mut().take_pending();
            return Ok(outcome?);
        };

        if self.writes_suspended.load(Ordering::Acquire) {
            self.resync(&mut live, &pool).await?;
        }

        let mut staged = (*live).clone();
        let value = op(&mut staged, now_millis())?;
        let pending = staged.store_mut().take_pending();
        if pending.is_empty() {
            return Ok(value);
        }

        let state = self.clone();
        tokio::spawn(async move { state.publish(live, staged, pending, pool).await }).await??;
        Ok(value)
    }

    /// Journal `pending`, then make `staged` the live graph.
    async fn publish(
        &self,
        mut live: OwnedRwLockWriteGuard<Graph>,
        staged: Graph,
        pending: Vec<ChangeSet>,
        pool: Pool,
    ) -> Result<()> {
        let appended = pending.len();
        let last_seq = match db::append_change_sets(&pool, &pending).await {
            Ok(last) => last,
            Err(e) => {
                tracing::error!("Journal append failed: {:?}", e);
                // The commit may have landed before the error surfaced.
                let _ = self.resync(&mut live, &pool).await;
                return Err(e.into());
            }
        };
        *live = staged;

        let Some(last_seq) = last_seq else {
            return Ok(());
        };
        self.journal_seq.store(last_seq, Ordering::Relaxed);
        tracing::debug!(appended, seq = last_seq, "Journaled change sets");

        let since = last_seq - self.snapshot_seq.load(Ordering::Relaxed);
        if since >= i64::from(self.config.snapshot_interval) {
            let snapshot = live.store().inner().export_state();
            match db::save_snapshot(&pool, last_seq, &snapshot).await {
                Ok(()) => {
                    self.snapshot_seq.store(last_seq, Ordering::Relaxed);
                    tracing::info!(covers_seq = last_seq, "Snapshot saved");
                }
                // The journal stays authoritative; retry on the next mutation.
                Err(e) => tracing::warn!("Snapshot failed: {:?}", e),
            }
        }

        Ok(())
    }

    /// Replace the live graph with the journaled state.
    ///
    /// Writes stay suspended until a rebuild succeeds.
    async fn resync(&self, live: &mut Graph, pool: &Pool) -> Result<()> {
        match restore(pool).await {
            Ok((fresh, seq)) => {
                *live = fresh;
                self.journal_seq.store(seq, Ordering::Relaxed);
                self.snapshot_seq.store(seq, Ordering::Relaxed);
                if self.writes_suspended.swap(false, Ordering::AcqRel) {
                    tracing::info!(seq, "Journal reachable again, writes resumed");
                }
                Ok(())
            }
            Err(e) => {
                if !self.writes_suspended.swap(true, Ordering::AcqRel) {
                    tracing::error!("Rebuild from journal failed, suspending writes: {:?}", e);
                }
                Err(AppError::WritesSuspended)
            }
        }
    }
}
