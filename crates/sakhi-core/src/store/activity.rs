//! Activity log store with transparent local fallback.

use serde::Serialize;

use super::remote::ActivityApi;
use super::{LocalStore, StoreResult};
use crate::models::{sort_for_display, ActivityDraft, ActivityLogEntry};

/// Outcome of an outbox replay pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Entries successfully replayed to the remote store
    pub pushed: usize,
    /// Entries still waiting in the outbox
    pub remaining: usize,
}

/// Persists and retrieves activity log entries.
///
/// Reads try the remote store first and silently fall back to local storage
/// on any failure; writes fall back only on missing configuration or a
/// classified schema error, exactly once, and never fail silently.
pub struct ActivityStore<R: ActivityApi, L: LocalStore> {
    remote: Option<R>,
    local: L,
}

impl<R: ActivityApi, L: LocalStore> ActivityStore<R, L> {
    /// Create a store. `remote` is `None` when the backend is unconfigured.
    pub const fn new(remote: Option<R>, local: L) -> Self {
        Self { remote, local }
    }

    pub const fn is_remote_configured(&self) -> bool {
        self.remote.is_some()
    }

    /// List a profile's entries, date descending (ties by insertion order).
    ///
    /// The caller cannot tell which backend served the result; the fallback
    /// is reported only through the log.
    pub async fn list_activities(&self, user_id: &str) -> StoreResult<Vec<ActivityLogEntry>> {
        if let Some(remote) = &self.remote {
            match remote.list_activities(user_id).await {
                Ok(mut entries) => {
                    sort_for_display(&mut entries);
                    return Ok(entries);
                }
                Err(error) => {
                    tracing::warn!(
                        "Remote activity list failed, falling back to local storage: {error}"
                    );
                }
            }
        } else {
            tracing::warn!("Remote store not configured, loading activities from local storage");
        }

        let mut entries = self.local.load_activities(user_id)?;
        sort_for_display(&mut entries);
        Ok(entries)
    }

    /// Log a new activity.
    ///
    /// Attempts the remote insert when configured; a fallback-eligible
    /// rejection is written to local storage instead (exactly one attempt,
    /// no remote retry). If neither backend accepts the entry the error
    /// propagates.
    pub async fn log_activity(
        &self,
        user_id: &str,
        draft: ActivityDraft,
    ) -> StoreResult<ActivityLogEntry> {
        let entry = ActivityLogEntry::from_draft(user_id, draft);

        if let Some(remote) = &self.remote {
            match remote.insert_activity(&entry).await {
                Ok(stored) => return Ok(stored),
                Err(error) if error.is_fallback_eligible() => {
                    tracing::warn!(
                        "Remote activity insert rejected, saving to local storage: {error}"
                    );
                }
                Err(error) => return Err(error),
            }
        } else {
            tracing::warn!("Remote store not configured, saving activity to local storage");
        }

        self.write_local(user_id, entry)
    }

    /// Replay locally written entries to the remote store.
    ///
    /// Entries carry client-generated ids and the remote insert ignores
    /// duplicates, so a partial replay can be resumed safely. Stops at the
    /// first failure and reports what is left.
    pub async fn sync_pending(&self, user_id: &str) -> StoreResult<SyncReport> {
        let mut outbox = self.local.load_outbox(user_id)?;

        let Some(remote) = &self.remote else {
            return Ok(SyncReport {
                pushed: 0,
                remaining: outbox.len(),
            });
        };

        let mut pushed = 0;
        while let Some(entry) = outbox.first().cloned() {
            match remote.insert_activity(&entry).await {
                Ok(_) => {
                    outbox.remove(0);
                    self.local.save_outbox(user_id, &outbox)?;
                    pushed += 1;
                }
                Err(error) => {
                    tracing::warn!("Outbox replay stopped: {error}");
                    break;
                }
            }
        }

        Ok(SyncReport {
            pushed,
            remaining: outbox.len(),
        })
    }

    /// Count of entries awaiting replay.
    pub fn pending_count(&self, user_id: &str) -> StoreResult<usize> {
        Ok(self.local.load_outbox(user_id)?.len())
    }

    fn write_local(&self, user_id: &str, entry: ActivityLogEntry) -> StoreResult<ActivityLogEntry> {
        let mut entries = self.local.load_activities(user_id)?;
        entries.insert(0, entry.clone());
        self.local.save_activities(user_id, &entries)?;

        let mut outbox = self.local.load_outbox(user_id)?;
        outbox.push(entry.clone());
        self.local.save_outbox(user_id, &outbox)?;

        Ok(entry)
    }
}
