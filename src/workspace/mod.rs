//! The workspace: connections, the key tree and the editor, wired together.
//!
//! [`Workspace`] owns one of each component and applies the rules that span
//! them. Changing the active connection resets the editor without asking and
//! reloads the tree. Mutations refresh the nearest cached directory, and
//! deleting the open key empties the editor.

pub mod browser;
pub mod confirm;
pub mod editor;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use browser::{Browser, SelectOutcome, TreeNode, TreeView};
pub use confirm::{AutoConfirm, ChannelConfirm, Confirm, ConfirmRequest, PendingConfirmation};
pub use editor::{EditorPhase, EditorSession, EditorSnapshot, LoadOutcome, SaveOutcome};
pub use registry::{ConnectionRegistry, ConnectionUpdate};

use crate::settings::AppSettings;

use kvdesk_core::client::DEFAULT_HISTORY_LIMIT;
use kvdesk_core::keys::{join_key, key_name, parent_dir, validate_key, validate_key_name, validate_value};
use kvdesk_core::types::{Connection, Credentials, KeyRevision};
use kvdesk_core::{RemoteStore, StoreError, StoreResult};

use std::sync::Arc;

/// Tunables taken from the app settings.
#[derive(Clone, Copy, Debug)]
pub struct WorkspaceOptions {
    pub include_ttl: bool,
    pub history_limit: usize,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            include_ttl: true,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl From<&AppSettings> for WorkspaceOptions {
    fn from(settings: &AppSettings) -> Self {
        Self {
            include_ttl: settings.include_ttl,
            history_limit: settings.history_limit,
        }
    }
}

pub struct Workspace {
    store: Arc<dyn RemoteStore>,
    registry: ConnectionRegistry,
    browser: Browser,
    editor: EditorSession,
}

impl Workspace {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        confirm: Arc<dyn Confirm>,
        options: WorkspaceOptions,
    ) -> Self {
        let registry = ConnectionRegistry::new(store.clone());
        let browser =
            Browser::new(store.clone(), registry.subscribe()).with_include_ttl(options.include_ttl);
        let editor =
            EditorSession::new(store.clone(), confirm).with_history_limit(options.history_limit);
        Self {
            store,
            registry,
            browser,
            editor,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    pub fn editor(&self) -> &EditorSession {
        &self.editor
    }

    fn active_connection(&self) -> StoreResult<String> {
        self.registry
            .active_id()
            .ok_or_else(|| StoreError::Remote("no active connection".to_string()))
    }

    /// Empty the editor (no prompt) and the tree.
    fn clear_views(&self) {
        self.editor.reset();
        self.browser.clear();
    }

    /// Follow up on a registry call that may have cleared the active id.
    fn cascade_if_changed(&self, before: Option<String>) {
        if before.is_some() && self.registry.active_id() != before {
            log::info!("Active connection dropped, clearing tree and editor");
            self.clear_views();
        }
    }

    // ── connections ─────────────────────────────────────────────────────────

    pub async fn refresh_connections(&self) -> StoreResult<Vec<Connection>> {
        let before = self.registry.active_id();
        let result = self.registry.refresh().await;
        self.cascade_if_changed(before);
        result
    }

    pub async fn add_connection(
        &self,
        name: &str,
        endpoints: Vec<String>,
        credentials: Option<Credentials>,
    ) -> StoreResult<Connection> {
        self.registry.add(name, endpoints, credentials).await
    }

    pub async fn update_connection(
        &self,
        id: &str,
        update: ConnectionUpdate,
    ) -> StoreResult<Connection> {
        self.registry.update(id, update).await
    }

    pub async fn connect(&self, id: &str) -> StoreResult<Connection> {
        self.registry.connect(id).await
    }

    pub async fn disconnect(&self, id: &str) -> StoreResult<Connection> {
        let before = self.registry.active_id();
        let result = self.registry.disconnect(id).await;
        self.cascade_if_changed(before);
        result
    }

    pub async fn remove_connection(&self, id: &str) -> StoreResult<()> {
        let before = self.registry.active_id();
        let result = self.registry.remove(id).await;
        self.cascade_if_changed(before);
        result
    }

    /// Switch the connection being browsed.
    ///
    /// The editor is reset without the unsaved-changes prompt; front ends
    /// should make the dirty state visible before offering a switch. The tree
    /// is cleared and, for a new connection, its root is loaded.
    pub async fn set_active(&self, id: Option<&str>) -> StoreResult<Vec<TreeNode>> {
        if self.registry.active_id().as_deref() == id {
            return Ok(self.browser.children(kvdesk_core::keys::ROOT));
        }
        self.registry.set_active(id)?;
        self.clear_views();
        match id {
            Some(_) => self.browser.load_root().await,
            None => Ok(Vec::new()),
        }
    }

    /// Make `id` active again if the registry knows it as connected.
    /// Returns whether it was restored.
    pub async fn restore_active(&self, id: &str) -> StoreResult<bool> {
        let connected = self.registry.get(id).is_some_and(|c| c.is_connected());
        if !connected {
            log::debug!("Last active connection {} is not connected", id);
            return Ok(false);
        }
        self.set_active(Some(id)).await?;
        Ok(true)
    }

    // ── tree ────────────────────────────────────────────────────────────────

    pub async fn load_root(&self) -> StoreResult<Vec<TreeNode>> {
        self.browser.load_root().await
    }

    pub async fn expand(&self, path: &str) -> StoreResult<Vec<TreeNode>> {
        self.browser.expand(path).await
    }

    pub fn collapse(&self, path: &str) -> bool {
        self.browser.collapse(path)
    }

    pub async fn refresh(&self, path: &str) -> StoreResult<()> {
        self.browser.refresh(path).await
    }

    pub async fn select(&self, path: &str) -> StoreResult<SelectOutcome> {
        self.browser.select(path, &self.editor).await
    }

    pub async fn batch_delete(&self, paths: &[String]) -> StoreResult<u64> {
        self.browser.batch_delete(paths, &self.editor).await
    }

    /// Delete everything currently marked in batch mode.
    pub async fn batch_delete_marked(&self) -> StoreResult<u64> {
        let marked = self.browser.marked();
        self.browser.batch_delete(&marked, &self.editor).await
    }

    /// Refresh after a mutation, reporting but not failing on errors.
    async fn refresh_after_mutation(&self, key: &str) {
        if let Err(e) = self.browser.refresh_nearest_ancestor(key).await {
            log::warn!("Failed to refresh tree around {}: {}", key, e);
        }
    }

    /// Create `name` under directory `parent`.
    ///
    /// A name ending in `/` creates an empty directory marker. Fails with a
    /// conflict if the key already exists.
    pub async fn create_key(
        &self,
        parent: &str,
        name: &str,
        value: &str,
        ttl: Option<i64>,
    ) -> StoreResult<String> {
        validate_key_name(name)?;
        let key = join_key(parent, name);
        validate_key(&key)?;
        let value = if key.ends_with('/') { "" } else { value };
        validate_value(value)?;
        let conn_id = self.active_connection()?;

        self.store
            .create_key(&conn_id, &key, value, ttl.filter(|t| *t > 0))
            .await?;
        log::info!("Created {}", key);
        self.refresh_after_mutation(&key).await;
        Ok(key)
    }

    /// Atomically rename `from` to `to` via the store.
    ///
    /// If `from` is open in the editor, the buffer follows the rename with
    /// its edits intact.
    pub async fn rename_key(&self, from: &str, to: &str, overwrite: bool) -> StoreResult<()> {
        validate_key(from)?;
        validate_key(to)?;
        validate_key_name(key_name(to))?;
        let conn_id = self.active_connection()?;

        self.store.rename_key(&conn_id, from, to, overwrite).await?;
        log::info!("Renamed {} to {}", from, to);

        if self.editor.rebind(from, to) && self.browser.selected().as_deref() == Some(from) {
            self.browser.set_selected(Some(to.to_string()));
        }
        self.refresh_after_mutation(from).await;
        if parent_dir(from) != parent_dir(to) {
            self.refresh_after_mutation(to).await;
        }
        Ok(())
    }

    pub async fn copy_key(&self, from: &str, to: &str, overwrite: bool) -> StoreResult<()> {
        validate_key(from)?;
        validate_key(to)?;
        validate_key_name(key_name(to))?;
        let conn_id = self.active_connection()?;

        self.store.copy_key(&conn_id, from, to, overwrite).await?;
        log::info!("Copied {} to {}", from, to);
        self.refresh_after_mutation(to).await;
        Ok(())
    }

    /// Delete `key`. Deleting the open key empties the editor, unsaved edits
    /// included.
    pub async fn delete_key(&self, key: &str) -> StoreResult<u64> {
        validate_key(key)?;
        let conn_id = self.active_connection()?;
        let deleted = if self.editor.open_key().as_deref() == Some(key) {
            self.editor.delete_key(&conn_id, key).await?
        } else {
            let deleted = self.store.delete_key(&conn_id, key).await?;
            log::info!("Deleted {}", key);
            deleted
        };
        if self.browser.selected().as_deref() == Some(key) {
            self.browser.set_selected(None);
        }
        self.refresh_after_mutation(key).await;
        Ok(deleted)
    }

    // ── editor ──────────────────────────────────────────────────────────────

    fn open_key(&self) -> StoreResult<(String, String)> {
        match (self.editor.conn_id(), self.editor.open_key()) {
            (Some(conn_id), Some(key)) => Ok((conn_id, key)),
            _ => Err(StoreError::InvalidState("no key is open".to_string())),
        }
    }

    /// Save the open buffer and refresh the directory of the key written,
    /// even if the editor has moved to another key meanwhile.
    pub async fn save(&self) -> StoreResult<SaveOutcome> {
        let (_, key) = self.open_key()?;
        let outcome = self.editor.save().await?;
        self.refresh_after_mutation(&key).await;
        Ok(outcome)
    }

    pub async fn delete_open_key(&self) -> StoreResult<u64> {
        let (_, key) = self.open_key()?;
        self.delete_key(&key).await
    }

    /// Close the editor, asking first if there are unsaved edits.
    pub async fn close_key(&self) -> bool {
        let closed = self.editor.close().await;
        if closed {
            self.browser.set_selected(None);
        }
        closed
    }

    pub async fn load_history(&self) -> StoreResult<Vec<KeyRevision>> {
        let (conn_id, key) = self.open_key()?;
        self.editor.load_history(&conn_id, &key).await
    }

    pub async fn rollback(&self, revision: i64) -> StoreResult<()> {
        let (conn_id, key) = self.open_key()?;
        self.editor
            .rollback_to_revision(&conn_id, &key, revision)
            .await?;
        self.refresh_after_mutation(&key).await;
        Ok(())
    }
}
