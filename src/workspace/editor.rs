//! Single-key edit buffer.
//!
//! The session holds one open key at a time. `original` is the last value
//! known to match the remote store and `working` is the user's buffer; the
//! dirty flag is always computed from the two, never stored.
//!
//! Remote responses are matched against a generation counter captured when
//! the request was sent. Opening another key or resetting bumps the counter,
//! so a late response for an earlier request is dropped instead of
//! overwriting the current buffer.

use crate::workspace::confirm::{Confirm, ConfirmRequest};

use kvdesk_core::client::{DEFAULT_HISTORY_LIMIT, clamp_history_limit};
use kvdesk_core::format::ContentFormat;
use kvdesk_core::keys::{validate_key, validate_value};
use kvdesk_core::types::KeyRevision;
use kvdesk_core::{RemoteStore, StoreError, StoreResult};

use parking_lot::Mutex;
use std::sync::Arc;

/// Where the session is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorPhase {
    Empty,
    Loading,
    Clean,
    Dirty,
}

/// Result of a `load` that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The buffer now holds the requested key
    Loaded,
    /// The user kept their unsaved edits; nothing changed
    Declined,
    /// A newer load or a reset happened first; the response was dropped
    Superseded,
}

/// Result of a `save` whose write succeeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The buffer's original value now matches what was written
    Saved,
    /// Another key was opened while the write was in flight
    Detached,
}

/// Read-only copy of the session state.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSnapshot {
    pub phase: EditorPhase,
    pub conn_id: Option<String>,
    pub key: Option<String>,
    pub original: String,
    pub working: String,
    pub is_dirty: bool,
    pub format: ContentFormat,
    pub ttl: i64,
    pub history: Vec<KeyRevision>,
    pub preview: Option<KeyRevision>,
}

#[derive(Default)]
struct EditorState {
    conn_id: Option<String>,
    key: Option<String>,
    original: String,
    working: String,
    format: ContentFormat,
    ttl: i64,
    history: Vec<KeyRevision>,
    preview: Option<i64>,
    generation: u64,
    /// Generation of the load in flight, if any
    pending: Option<u64>,
}

impl EditorState {
    fn is_dirty(&self) -> bool {
        self.key.is_some() && self.working != self.original
    }

    fn phase(&self) -> EditorPhase {
        match (&self.key, self.pending) {
            (None, _) => EditorPhase::Empty,
            (Some(_), Some(_)) => EditorPhase::Loading,
            (Some(_), None) if self.is_dirty() => EditorPhase::Dirty,
            (Some(_), None) => EditorPhase::Clean,
        }
    }

    /// Clear everything except the generation, which moves forward.
    fn clear(&mut self) {
        let generation = self.generation + 1;
        *self = EditorState {
            generation,
            ..EditorState::default()
        };
    }

    fn begin_load(&mut self, conn_id: &str, key: &str) -> u64 {
        self.clear();
        self.conn_id = Some(conn_id.to_string());
        self.key = Some(key.to_string());
        self.pending = Some(self.generation);
        self.generation
    }

    fn holds(&self, conn_id: &str, key: &str) -> bool {
        self.conn_id.as_deref() == Some(conn_id) && self.key.as_deref() == Some(key)
    }

    fn require_open(&self) -> StoreResult<(String, String)> {
        match (&self.conn_id, &self.key) {
            (Some(conn), Some(key)) if self.pending.is_none() => Ok((conn.clone(), key.clone())),
            (Some(_), Some(key)) => Err(StoreError::InvalidState(format!("{} is still loading", key))),
            _ => Err(StoreError::InvalidState("no key is open".to_string())),
        }
    }
}

/// The open key's edit buffer plus its fetched history.
pub struct EditorSession {
    store: Arc<dyn RemoteStore>,
    confirm: Arc<dyn Confirm>,
    history_limit: usize,
    state: Mutex<EditorState>,
}

impl EditorSession {
    pub fn new(store: Arc<dyn RemoteStore>, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            store,
            confirm,
            history_limit: DEFAULT_HISTORY_LIMIT,
            state: Mutex::new(EditorState::default()),
        }
    }

    /// Number of revisions requested by `load_history`, clamped to the
    /// service's bounds.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = clamp_history_limit(limit);
        self
    }

    pub fn phase(&self) -> EditorPhase {
        self.state.lock().phase()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().is_dirty()
    }

    pub fn open_key(&self) -> Option<String> {
        self.state.lock().key.clone()
    }

    pub fn conn_id(&self) -> Option<String> {
        self.state.lock().conn_id.clone()
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        let s = self.state.lock();
        let preview = s
            .preview
            .and_then(|rev| s.history.iter().find(|r| r.revision == rev).cloned());
        EditorSnapshot {
            phase: s.phase(),
            conn_id: s.conn_id.clone(),
            key: s.key.clone(),
            original: s.original.clone(),
            working: s.working.clone(),
            is_dirty: s.is_dirty(),
            format: s.format,
            ttl: s.ttl,
            history: s.history.clone(),
            preview,
        }
    }

    /// Ask before throwing away unsaved edits. `true` means go ahead.
    async fn guard_unsaved(&self) -> bool {
        let dirty_key = {
            let s = self.state.lock();
            if s.is_dirty() { s.key.clone() } else { None }
        };
        let Some(key) = dirty_key else {
            return true;
        };
        let accepted = self
            .confirm
            .confirm(ConfirmRequest::discard_changes(&key))
            .await;
        if !accepted {
            log::info!("Kept unsaved changes to {}", key);
        }
        accepted
    }

    /// Open `key`, asking first if the current buffer has unsaved edits.
    pub async fn load(&self, conn_id: &str, key: &str) -> StoreResult<LoadOutcome> {
        validate_key(key)?;
        if !self.guard_unsaved().await {
            return Ok(LoadOutcome::Declined);
        }
        self.fetch(conn_id, key).await
    }

    /// Replace the buffer with the remote value of `key`, no questions asked.
    async fn fetch(&self, conn_id: &str, key: &str) -> StoreResult<LoadOutcome> {
        let ticket = self.state.lock().begin_load(conn_id, key);
        let result = self.store.get_value(conn_id, key).await;

        let mut s = self.state.lock();
        if s.pending != Some(ticket) {
            log::debug!("Dropping stale load of {} (generation {})", key, ticket);
            return Ok(LoadOutcome::Superseded);
        }
        s.pending = None;
        match result {
            Ok(kv) => {
                s.format = ContentFormat::detect(&kv.value);
                s.ttl = kv.ttl;
                s.working = kv.value.clone();
                s.original = kv.value;
                log::debug!("Loaded {} as {}", key, s.format.display_name());
                Ok(LoadOutcome::Loaded)
            }
            Err(e) => {
                s.clear();
                Err(e)
            }
        }
    }

    /// Replace the working buffer.
    pub fn set_content(&self, value: impl Into<String>) -> StoreResult<()> {
        let mut s = self.state.lock();
        s.require_open()?;
        s.working = value.into();
        Ok(())
    }

    /// Override the detected format.
    pub fn set_format(&self, format: ContentFormat) -> StoreResult<()> {
        let mut s = self.state.lock();
        s.require_open()?;
        s.format = format;
        Ok(())
    }

    /// TTL in seconds sent with the next save; 0 means no expiry.
    pub fn set_ttl(&self, ttl: i64) -> StoreResult<()> {
        if ttl < 0 {
            return Err(StoreError::Validation("ttl cannot be negative".to_string()));
        }
        let mut s = self.state.lock();
        s.require_open()?;
        s.ttl = ttl;
        Ok(())
    }

    /// Put the working buffer back to the last saved value.
    pub fn revert(&self) -> StoreResult<()> {
        let mut s = self.state.lock();
        s.require_open()?;
        s.working = s.original.clone();
        Ok(())
    }

    /// Parse problems in the working buffer for the current format, if any.
    pub fn check(&self) -> Option<String> {
        let s = self.state.lock();
        s.format.check(&s.working)
    }

    /// Write the working buffer.
    ///
    /// A clean buffer is written anyway. On failure the buffer is left
    /// exactly as it was.
    pub async fn save(&self) -> StoreResult<SaveOutcome> {
        let (conn_id, key, value, ttl, generation) = {
            let s = self.state.lock();
            let (conn_id, key) = s.require_open()?;
            (conn_id, key, s.working.clone(), s.ttl, s.generation)
        };
        validate_value(&value)?;

        let ttl = (ttl > 0).then_some(ttl);
        self.store.put_value(&conn_id, &key, &value, ttl).await?;

        let mut s = self.state.lock();
        if s.generation != generation || !s.holds(&conn_id, &key) {
            log::debug!("Save of {} finished after the buffer moved on", key);
            return Ok(SaveOutcome::Detached);
        }
        s.original = value;
        log::info!("Saved {}", key);
        Ok(SaveOutcome::Saved)
    }

    /// Delete `key` remotely and empty the session, unsaved edits included.
    pub async fn delete_key(&self, conn_id: &str, key: &str) -> StoreResult<u64> {
        validate_key(key)?;
        let deleted = self.store.delete_key(conn_id, key).await?;
        log::info!("Deleted {}", key);
        self.reset();
        Ok(deleted)
    }

    /// Fetch recent revisions of `key`, newest first.
    ///
    /// The list is kept only if `key` is still the open key.
    pub async fn load_history(&self, conn_id: &str, key: &str) -> StoreResult<Vec<KeyRevision>> {
        validate_key(key)?;
        let history = self
            .store
            .get_history(conn_id, key, self.history_limit)
            .await?;
        let mut s = self.state.lock();
        if s.holds(conn_id, key) {
            s.history = history.clone();
            s.preview = None;
        }
        Ok(history)
    }

    /// Show a fetched revision alongside the buffer.
    pub fn preview_revision(&self, revision: i64) -> StoreResult<KeyRevision> {
        let mut s = self.state.lock();
        let found = s
            .history
            .iter()
            .find(|r| r.revision == revision)
            .cloned()
            .ok_or_else(|| {
                StoreError::NotFound(format!("revision {} is not in the loaded history", revision))
            })?;
        s.preview = Some(revision);
        Ok(found)
    }

    pub fn clear_preview(&self) {
        self.state.lock().preview = None;
    }

    /// Write the value `key` had at `revision` as a new revision, then reload
    /// the buffer and its history.
    ///
    /// A revision the store no longer has is reported as a remote failure.
    pub async fn rollback_to_revision(
        &self,
        conn_id: &str,
        key: &str,
        revision: i64,
    ) -> StoreResult<()> {
        validate_key(key)?;
        self.store
            .rollback(conn_id, key, revision)
            .await
            .map_err(StoreError::not_found_as_remote)?;
        log::info!("Rolled back {} to revision {}", key, revision);

        if self.fetch(conn_id, key).await? == LoadOutcome::Loaded {
            self.load_history(conn_id, key).await?;
        }
        Ok(())
    }

    /// Close the buffer, asking first if it has unsaved edits.
    ///
    /// Returns `false` if the user kept the edits.
    pub async fn close(&self) -> bool {
        if !self.guard_unsaved().await {
            return false;
        }
        self.reset();
        true
    }

    /// Empty the session. Never asks and never calls the store.
    pub fn reset(&self) {
        let mut s = self.state.lock();
        if let Some(key) = s.key.as_deref() {
            log::debug!("Closing {}", key);
        }
        s.clear();
    }

    /// Follow a rename of the open key, keeping the buffer.
    pub(crate) fn rebind(&self, from: &str, to: &str) -> bool {
        let mut s = self.state.lock();
        if s.key.as_deref() != Some(from) {
            return false;
        }
        s.key = Some(to.to_string());
        s.history.clear();
        s.preview = None;
        true
    }
}
