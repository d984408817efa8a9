//! Lazily loaded view of the active connection's key namespace.
//!
//! The cache is an arena keyed by full path: `nodes` holds every loaded node
//! and `children` maps each expanded directory to its child paths in listing
//! order. A directory is expanded exactly when it has a `children` entry, so
//! collapsing drops the entry and every node below it.

use crate::workspace::editor::{EditorSession, LoadOutcome};

use kvdesk_core::keys::{ROOT, ancestors, dir_prefix, is_dir_key, key_name, validate_key};
use kvdesk_core::types::KeyItem;
use kvdesk_core::{RemoteStore, StoreError, StoreResult};

use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;

/// One cached entry of the namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNode {
    pub path: String,
    pub label: String,
    pub is_dir: bool,
    /// Inline value as listed; leaves only
    pub value: Option<String>,
    pub ttl: i64,
}

/// Directory paths are cached with a trailing `/`, whatever shape the
/// listing used, so they line up with `parent_dir` and `ancestors`.
impl From<KeyItem> for TreeNode {
    fn from(item: KeyItem) -> Self {
        let is_dir = item.is_dir || is_dir_key(&item.key);
        let path = if is_dir { dir_prefix(&item.key) } else { item.key };
        TreeNode {
            label: key_name(&path).to_string(),
            value: if is_dir { None } else { item.value },
            ttl: item.ttl,
            is_dir,
            path,
        }
    }
}

/// A node together with the visible part of its subtree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeView {
    pub node: TreeNode,
    pub expanded: bool,
    pub children: Vec<TreeView>,
}

/// Result of selecting a path in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The leaf is now open in the editor and selected
    Opened,
    /// The user kept unsaved edits; selection unchanged
    Declined,
    /// A later selection won the race; selection unchanged
    Superseded,
    /// Directories are expanded, not opened
    Directory,
}

#[derive(Default)]
struct TreeCache {
    nodes: HashMap<String, TreeNode>,
    children: HashMap<String, Vec<String>>,
}

impl TreeCache {
    fn is_expanded(&self, path: &str) -> bool {
        self.children.contains_key(path)
    }

    /// Whether `path` is reachable from the root through expanded directories.
    fn is_attached(&self, path: &str) -> bool {
        path == ROOT || self.nodes.contains_key(path)
    }

    /// Cached spelling of a directory path: `/foo` means the cached `/foo/`
    /// unless a leaf `/foo` is cached.
    fn dir_path(&self, path: &str) -> String {
        if path == ROOT || path.ends_with('/') || self.nodes.contains_key(path) {
            return path.to_string();
        }
        let dir = dir_prefix(path);
        if self.nodes.contains_key(&dir) {
            dir
        } else {
            path.to_string()
        }
    }

    /// Drop everything below `dir`, keeping `dir` itself.
    fn collapse(&mut self, dir: &str) -> bool {
        let Some(children) = self.children.remove(dir) else {
            return false;
        };
        for child in children {
            self.remove_subtree(&child);
        }
        true
    }

    fn remove_subtree(&mut self, path: &str) {
        self.collapse(path);
        self.nodes.remove(path);
    }

    /// Replace the direct children of `dir` with a fresh listing.
    ///
    /// Children that disappeared lose their subtrees; surviving directories
    /// keep whatever is expanded below them.
    fn replace_children(&mut self, dir: &str, items: Vec<KeyItem>) {
        let mut fresh: Vec<String> = Vec::with_capacity(items.len());
        let mut seen = HashSet::new();
        for item in items {
            let node = TreeNode::from(item);
            if !seen.insert(node.path.clone()) {
                continue;
            }
            fresh.push(node.path.clone());
            self.nodes.insert(node.path.clone(), node);
        }

        if let Some(old) = self.children.remove(dir) {
            for gone in old.iter().filter(|p| !seen.contains(*p)) {
                self.remove_subtree(gone);
            }
        }
        self.children.insert(dir.to_string(), fresh);
    }

    /// Forget `path` and unlink it from its parent's listing.
    fn unlink(&mut self, path: &str) {
        self.remove_subtree(path);
        let parent = kvdesk_core::keys::parent_dir(path);
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|p| p != path);
        }
    }

    fn children_of(&self, dir: &str) -> Vec<TreeNode> {
        self.children
            .get(dir)
            .map(|paths| {
                paths
                    .iter()
                    .filter_map(|p| self.nodes.get(p).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn view(&self, dir: &str, term: &str) -> Vec<TreeView> {
        let Some(paths) = self.children.get(dir) else {
            return Vec::new();
        };
        paths
            .iter()
            .filter_map(|p| self.nodes.get(p))
            .filter_map(|node| {
                let children = self.view(&node.path, term);
                let matches = term.is_empty() || node.label.to_lowercase().contains(term);
                (matches || !children.is_empty()).then(|| TreeView {
                    node: node.clone(),
                    expanded: self.is_expanded(&node.path),
                    children,
                })
            })
            .collect()
    }
}

#[derive(Default)]
struct BrowserState {
    conn_id: Option<String>,
    cache: TreeCache,
    /// Bumped whenever the whole tree is replaced or dropped
    epoch: u64,
    next_ticket: u64,
    /// Listing requests in flight, by directory
    inflight: HashMap<String, u64>,
    selected: Option<String>,
    /// Paths marked for deletion while batch mode is armed
    batch: Option<BTreeSet<String>>,
}

impl BrowserState {
    fn begin_listing(&mut self, dir: &str) -> (u64, u64) {
        self.next_ticket += 1;
        self.inflight.insert(dir.to_string(), self.next_ticket);
        (self.epoch, self.next_ticket)
    }

    /// Consume the in-flight marker for `dir` if `ticket` is still current.
    fn finish_listing(&mut self, dir: &str, epoch: u64, ticket: u64) -> bool {
        if self.epoch != epoch || self.inflight.get(dir) != Some(&ticket) {
            return false;
        }
        self.inflight.remove(dir);
        self.cache.is_attached(dir)
    }
}

/// Client-side tree over the active connection's keys.
///
/// Every refresh is an explicit pull; nothing here assumes the store pushes
/// change notifications.
pub struct Browser {
    store: Arc<dyn RemoteStore>,
    active: watch::Receiver<Option<String>>,
    include_ttl: bool,
    state: Mutex<BrowserState>,
}

impl Browser {
    pub fn new(store: Arc<dyn RemoteStore>, active: watch::Receiver<Option<String>>) -> Self {
        Self {
            store,
            active,
            include_ttl: true,
            state: Mutex::new(BrowserState::default()),
        }
    }

    pub fn with_include_ttl(mut self, include_ttl: bool) -> Self {
        self.include_ttl = include_ttl;
        self
    }

    fn active_connection(&self) -> StoreResult<String> {
        self.active
            .borrow()
            .clone()
            .ok_or_else(|| StoreError::Remote("no active connection".to_string()))
    }

    /// Connection the cached tree belongs to, which must still be active.
    fn tree_connection(&self) -> StoreResult<String> {
        let active = self.active_connection()?;
        if self.state.lock().conn_id.as_deref() != Some(active.as_str()) {
            return Err(StoreError::InvalidState(
                "tree is not loaded for the active connection".to_string(),
            ));
        }
        Ok(active)
    }

    /// Drop the whole tree, selection and batch marks included.
    pub fn clear(&self) {
        let mut s = self.state.lock();
        let epoch = s.epoch + 1;
        *s = BrowserState {
            epoch,
            next_ticket: s.next_ticket,
            ..BrowserState::default()
        };
        log::debug!("Tree cleared");
    }

    /// List the namespace root and replace the entire cache with it.
    pub async fn load_root(&self) -> StoreResult<Vec<TreeNode>> {
        let conn_id = self.active_connection()?;
        let (epoch, ticket) = {
            let mut s = self.state.lock();
            if s.conn_id.as_deref() != Some(conn_id.as_str()) {
                s.cache = TreeCache::default();
                s.selected = None;
                s.batch = None;
            }
            s.epoch += 1;
            s.inflight.clear();
            s.conn_id = Some(conn_id.clone());
            s.begin_listing(ROOT)
        };

        let items = self
            .store
            .list_children(&conn_id, ROOT, self.include_ttl)
            .await?;

        let mut s = self.state.lock();
        if !s.finish_listing(ROOT, epoch, ticket) {
            log::debug!("Dropping stale root listing for {}", conn_id);
            return Ok(s.cache.children_of(ROOT));
        }
        s.cache = TreeCache::default();
        s.cache.replace_children(ROOT, items);
        if let Some(selected) = s.selected.clone() {
            if !s.cache.is_attached(&selected) {
                s.selected = None;
            }
        }
        log::debug!("Loaded root of {}", conn_id);
        Ok(s.cache.children_of(ROOT))
    }

    /// Query the immediate children of directory `path` and replace its
    /// cached children. Re-expanding re-queries.
    pub async fn expand(&self, path: &str) -> StoreResult<Vec<TreeNode>> {
        let conn_id = self.tree_connection()?;
        let (path, epoch, ticket) = {
            let mut s = self.state.lock();
            let path = s.cache.dir_path(path);
            if path != ROOT {
                match s.cache.nodes.get(&path) {
                    None => {
                        return Err(StoreError::NotFound(format!("{} is not in the tree", path)));
                    }
                    Some(node) if !node.is_dir => {
                        return Err(StoreError::InvalidState(format!(
                            "{} is not a directory",
                            path
                        )));
                    }
                    Some(_) => {}
                }
            }
            let (epoch, ticket) = s.begin_listing(&path);
            (path, epoch, ticket)
        };

        let items = self
            .store
            .list_children(&conn_id, &path, self.include_ttl)
            .await?;

        let mut s = self.state.lock();
        if !s.finish_listing(&path, epoch, ticket) {
            log::debug!("Dropping stale listing of {}", path);
            return Ok(s.cache.children_of(&path));
        }
        s.cache.replace_children(&path, items);
        log::debug!("Expanded {}", path);
        Ok(s.cache.children_of(&path))
    }

    /// Discard the cached children of `path`. Returns whether it was expanded.
    pub fn collapse(&self, path: &str) -> bool {
        let mut s = self.state.lock();
        let prefix = s.cache.dir_path(path);
        let path = prefix.as_str();
        s.inflight.retain(|dir, _| !dir.starts_with(path));
        let collapsed = s.cache.collapse(path);
        if let Some(selected) = s.selected.clone() {
            if selected != path && selected.starts_with(path) {
                s.selected = None;
            }
        }
        if let Some(batch) = s.batch.as_mut() {
            batch.retain(|p| p == path || !p.starts_with(path));
        }
        collapsed
    }

    /// Re-query `path` if it is expanded; otherwise nothing to do.
    pub async fn refresh(&self, path: &str) -> StoreResult<()> {
        let path = self.state.lock().cache.dir_path(path);
        if !self.is_expanded(&path) {
            return Ok(());
        }
        self.expand(&path).await.map(|_| ())
    }

    /// Refresh the deepest expanded directory above `key`.
    pub async fn refresh_nearest_ancestor(&self, key: &str) -> StoreResult<()> {
        let nearest = ancestors(key)
            .into_iter()
            .rev()
            .find(|dir| self.is_expanded(dir));
        match nearest {
            Some(dir) => self.refresh(&dir).await,
            None => Ok(()),
        }
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.state.lock().cache.is_expanded(path)
    }

    pub fn node(&self, path: &str) -> Option<TreeNode> {
        let s = self.state.lock();
        s.cache.nodes.get(&s.cache.dir_path(path)).cloned()
    }

    /// Cached children of `dir`, empty if it is not expanded.
    pub fn children(&self, dir: &str) -> Vec<TreeNode> {
        self.state.lock().cache.children_of(dir)
    }

    pub fn connection(&self) -> Option<String> {
        self.state.lock().conn_id.clone()
    }

    pub fn selected(&self) -> Option<String> {
        self.state.lock().selected.clone()
    }

    /// The cached tree with only nodes whose label, or some descendant's
    /// label, contains `term` (case-insensitive). An empty term keeps all.
    ///
    /// Only cached nodes are searched; this never calls the store.
    pub fn filter(&self, term: &str) -> Vec<TreeView> {
        let term = term.trim().to_lowercase();
        self.state.lock().cache.view(ROOT, &term)
    }

    /// Open a leaf in the editor. Selection moves only if the editor
    /// actually opened it.
    pub async fn select(&self, path: &str, editor: &EditorSession) -> StoreResult<SelectOutcome> {
        let conn_id = self.tree_connection()?;
        let node = self
            .node(path)
            .ok_or_else(|| StoreError::NotFound(format!("{} is not in the tree", path)))?;
        if node.is_dir {
            return Ok(SelectOutcome::Directory);
        }

        let outcome = match editor.load(&conn_id, path).await {
            Ok(LoadOutcome::Loaded) => SelectOutcome::Opened,
            Ok(LoadOutcome::Declined) => SelectOutcome::Declined,
            Ok(LoadOutcome::Superseded) => SelectOutcome::Superseded,
            Err(e) => {
                // a failed load leaves the editor empty
                if editor.open_key().is_none() {
                    self.state.lock().selected = None;
                }
                return Err(e);
            }
        };
        if outcome == SelectOutcome::Opened {
            self.state.lock().selected = Some(path.to_string());
        }
        Ok(outcome)
    }

    pub(crate) fn set_selected(&self, path: Option<String>) {
        self.state.lock().selected = path;
    }

    // ── batch mode ──────────────────────────────────────────────────────────

    /// Arm or disarm multi-select. Disarming drops all marks. Returns the
    /// new armed state.
    pub fn toggle_batch(&self) -> bool {
        let mut s = self.state.lock();
        s.batch = match s.batch.take() {
            Some(_) => None,
            None => Some(BTreeSet::new()),
        };
        s.batch.is_some()
    }

    pub fn is_batch_armed(&self) -> bool {
        self.state.lock().batch.is_some()
    }

    /// Flip the mark on `path`. Returns whether it is now marked.
    pub fn toggle_mark(&self, path: &str) -> StoreResult<bool> {
        let mut s = self.state.lock();
        if !s.cache.nodes.contains_key(path) {
            return Err(StoreError::NotFound(format!("{} is not in the tree", path)));
        }
        let batch = s
            .batch
            .as_mut()
            .ok_or_else(|| StoreError::InvalidState("batch mode is not armed".to_string()))?;
        if batch.remove(path) {
            Ok(false)
        } else {
            batch.insert(path.to_string());
            Ok(true)
        }
    }

    pub fn marked(&self) -> Vec<String> {
        self.state
            .lock()
            .batch
            .as_ref()
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Delete `paths` in one request.
    ///
    /// On success every expanded directory above a deleted path is
    /// re-queried, shallowest first, and the editor is reset if its open key
    /// was deleted. Batch mode is disarmed afterwards.
    pub async fn batch_delete(&self, paths: &[String], editor: &EditorSession) -> StoreResult<u64> {
        if paths.is_empty() {
            return Err(StoreError::Validation("no keys selected for deletion".to_string()));
        }
        paths.iter().try_for_each(|p| validate_key(p))?;
        let conn_id = self.tree_connection()?;

        let deleted = self.store.batch_delete(&conn_id, paths).await?;
        log::info!("Batch deleted {} of {} keys", deleted, paths.len());

        if let Some(open) = editor.open_key() {
            if paths.contains(&open) {
                editor.reset();
            }
        }

        let dirs: BTreeSet<(usize, String)> = {
            let mut s = self.state.lock();
            for path in paths {
                s.cache.unlink(path);
                if s.selected.as_deref() == Some(path.as_str()) {
                    s.selected = None;
                }
            }
            s.batch = None;
            paths
                .iter()
                .flat_map(|p| ancestors(p))
                .map(|dir| (dir.matches('/').count(), dir))
                .collect()
        };

        for (_, dir) in dirs {
            if let Err(e) = self.refresh(&dir).await {
                log::warn!("Failed to refresh {} after batch delete: {}", dir, e);
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::confirm::AutoConfirm;
    use crate::workspace::test_support::{GatedStore, connected_store};
    use kvdesk_core::{ErrorKind, MemoryStore};

    async fn seeded() -> (Arc<MemoryStore>, String, Browser) {
        let (store, conn) = connected_store().await;
        store.seed(&conn, "/app/config.json", "{}");
        store.seed(&conn, "/app/db/host", "localhost");
        store.seed(&conn, "/app/db/port", "5432");
        store.seed(&conn, "/top", "x");
        // the receiver keeps the last value after the sender is gone
        let (_, rx) = watch::channel(Some(conn.clone()));
        let browser = Browser::new(store.clone(), rx);
        (store, conn, browser)
    }

    fn paths(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.path.as_str()).collect()
    }

    #[tokio::test]
    async fn load_root_needs_active_connection() {
        let store = Arc::new(MemoryStore::new());
        let (_tx, rx) = watch::channel(None);
        let browser = Browser::new(store.clone(), rx);
        let err = browser.load_root().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert_eq!(store.request_count(), 0);
    }

    #[tokio::test]
    async fn load_root_lists_immediate_children() {
        let (_, _, browser) = seeded().await;
        let root = browser.load_root().await.unwrap();
        assert_eq!(paths(&root), vec!["/app/", "/top"]);
        assert!(root[0].is_dir);
        assert_eq!(root[0].label, "app");
        assert_eq!(root[1].value.as_deref(), Some("x"));
        assert!(!browser.is_expanded("/app/"));
    }

    #[tokio::test]
    async fn expand_collapse_expand_requeries_without_duplicates() {
        let (store, conn, browser) = seeded().await;
        browser.load_root().await.unwrap();
        let first = browser.expand("/app/").await.unwrap();
        assert_eq!(paths(&first), vec!["/app/config.json", "/app/db/"]);

        assert!(browser.collapse("/app/"));
        assert!(browser.children("/app/").is_empty());
        assert!(browser.node("/app/config.json").is_none());

        store.seed(&conn, "/app/new", "n");
        let before = store.request_count();
        let second = browser.expand("/app/").await.unwrap();
        assert_eq!(store.request_count(), before + 1);
        assert_eq!(paths(&second), vec!["/app/config.json", "/app/db/", "/app/new"]);

        // expanding again replaces rather than appends
        let third = browser.expand("/app/").await.unwrap();
        assert_eq!(third, second);
    }

    #[tokio::test]
    async fn refresh_drops_vanished_subtrees_and_keeps_surviving_ones() {
        let (store, conn, browser) = seeded().await;
        store.seed(&conn, "/app/cache/ttl", "60");
        browser.load_root().await.unwrap();
        browser.expand("/app/").await.unwrap();
        browser.expand("/app/db/").await.unwrap();
        browser.expand("/app/cache/").await.unwrap();

        store
            .batch_delete(&conn, &["/app/cache/ttl".to_string()])
            .await
            .unwrap();
        browser.refresh("/app/").await.unwrap();

        assert!(browser.is_expanded("/app/db/"));
        assert_eq!(browser.children("/app/db/").len(), 2);
        assert!(!browser.is_expanded("/app/cache/"));
        assert!(browser.node("/app/cache/ttl").is_none());
    }

    #[tokio::test]
    async fn expand_rejects_leaves_and_unknown_paths() {
        let (_, _, browser) = seeded().await;
        browser.load_root().await.unwrap();
        assert_eq!(browser.expand("/top").await.unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(browser.expand("/nope/").await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn directory_items_get_a_trailing_slash() {
        let node = TreeNode::from(KeyItem {
            key: "/foo".to_string(),
            value: None,
            is_dir: true,
            ttl: 0,
        });
        assert_eq!(node.path, "/foo/");
        assert_eq!(node.label, "foo");
        assert!(node.is_dir);
    }

    #[tokio::test]
    async fn slashless_directory_listing_still_refreshes_nearest_ancestor() {
        let (store, conn, browser) = seeded().await;
        let listed = store.list_children(&conn, "/", false).await.unwrap();
        assert_eq!(listed[0].key, "/app");

        browser.load_root().await.unwrap();
        browser.expand("/app").await.unwrap();
        assert!(browser.is_expanded("/app/"));
        assert_eq!(browser.node("/app").map(|n| n.path).as_deref(), Some("/app/"));

        store.seed(&conn, "/app/new", "n");
        let requests = store.request_count();
        browser.refresh_nearest_ancestor("/app/new").await.unwrap();
        assert_eq!(store.request_count(), requests + 1);
        assert_eq!(
            paths(&browser.children("/app/")),
            vec!["/app/config.json", "/app/db/", "/app/new"]
        );

        assert!(browser.collapse("/app"));
        assert!(!browser.is_expanded("/app/"));
    }

    #[tokio::test]
    async fn filter_is_local_and_keeps_ancestors_of_matches() {
        let (store, _, browser) = seeded().await;
        browser.load_root().await.unwrap();
        browser.expand("/app/").await.unwrap();
        browser.expand("/app/db/").await.unwrap();

        let requests = store.request_count();
        let view = browser.filter("PORT");
        assert_eq!(store.request_count(), requests);

        assert_eq!(view.len(), 1);
        assert_eq!(view[0].node.path, "/app/");
        assert_eq!(view[0].children.len(), 1);
        assert_eq!(view[0].children[0].node.path, "/app/db/");
        assert_eq!(view[0].children[0].children[0].node.path, "/app/db/port");

        assert_eq!(browser.filter("").len(), 2);
        assert!(browser.filter("zzz").is_empty());
    }

    #[tokio::test]
    async fn filter_cannot_find_unexpanded_nodes() {
        let (_, _, browser) = seeded().await;
        browser.load_root().await.unwrap();
        assert!(browser.filter("host").is_empty());
    }

    #[tokio::test]
    async fn select_moves_only_when_editor_opens() {
        let (store, conn, browser) = seeded().await;
        store.seed(&conn, "/b", "B");
        browser.load_root().await.unwrap();
        let editor = EditorSession::new(store.clone(), Arc::new(AutoConfirm(false)));

        assert_eq!(browser.select("/top", &editor).await.unwrap(), SelectOutcome::Opened);
        assert_eq!(browser.selected().as_deref(), Some("/top"));

        editor.set_content("edited").unwrap();
        assert_eq!(browser.select("/b", &editor).await.unwrap(), SelectOutcome::Declined);
        assert_eq!(browser.selected().as_deref(), Some("/top"));
        assert_eq!(editor.open_key().as_deref(), Some("/top"));

        assert_eq!(browser.select("/app/", &editor).await.unwrap(), SelectOutcome::Directory);
        assert_eq!(browser.selected().as_deref(), Some("/top"));
    }

    #[tokio::test]
    async fn failed_open_clears_selection() {
        let (store, conn, browser) = seeded().await;
        store.seed(&conn, "/gone", "g");
        browser.load_root().await.unwrap();
        let editor = EditorSession::new(store.clone(), Arc::new(AutoConfirm(true)));
        browser.select("/top", &editor).await.unwrap();

        store.delete_key(&conn, "/gone").await.unwrap();
        let err = browser.select("/gone", &editor).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(editor.open_key(), None);
        assert_eq!(browser.selected(), None);
    }

    #[tokio::test]
    async fn batch_marks_require_armed_mode() {
        let (_, _, browser) = seeded().await;
        browser.load_root().await.unwrap();
        assert_eq!(
            browser.toggle_mark("/top").unwrap_err().kind(),
            ErrorKind::InvalidState
        );
        assert!(browser.toggle_batch());
        assert!(browser.toggle_mark("/top").unwrap());
        assert_eq!(browser.marked(), vec!["/top".to_string()]);
        assert!(!browser.toggle_mark("/top").unwrap());
        browser.toggle_mark("/top").unwrap();
        assert!(!browser.toggle_batch());
        assert!(browser.marked().is_empty());
    }

    #[tokio::test]
    async fn batch_delete_refreshes_ancestors_and_resets_editor() {
        let (store, conn, browser) = seeded().await;
        browser.load_root().await.unwrap();
        browser.expand("/app/").await.unwrap();
        browser.expand("/app/db/").await.unwrap();
        let editor = EditorSession::new(store.clone(), Arc::new(AutoConfirm(false)));
        browser.select("/app/db/host", &editor).await.unwrap();
        editor.set_content("dirty").unwrap();

        browser.toggle_batch();
        let targets = vec!["/app/db/host".to_string(), "/app/db/port".to_string()];
        let deleted = browser.batch_delete(&targets, &editor).await.unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(editor.open_key(), None);
        assert_eq!(browser.selected(), None);
        assert!(!browser.is_batch_armed());
        assert!(!store.contains_key(&conn, "/app/db/host"));
        // the directory is gone remotely, so the refreshed parent no longer lists it
        assert_eq!(paths(&browser.children("/app/")), vec!["/app/config.json"]);
        assert_eq!(paths(&browser.children("/")), vec!["/app/", "/top"]);
    }

    #[tokio::test]
    async fn failed_batch_delete_changes_nothing() {
        let (store, conn, browser) = seeded().await;
        browser.load_root().await.unwrap();
        let editor = EditorSession::new(store.clone(), Arc::new(AutoConfirm(true)));
        store.disconnect(&conn).await.unwrap();

        let err = browser
            .batch_delete(&["/top".to_string()], &editor)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert!(browser.node("/top").is_some());

        let err = browser.batch_delete(&[], &editor).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn collapse_during_listing_drops_the_response() {
        let (memory, conn) = connected_store().await;
        memory.seed(&conn, "/app/a", "1");
        let store = Arc::new(GatedStore::new(memory));
        let (_tx, rx) = watch::channel(Some(conn.clone()));
        let browser = Browser::new(store.clone(), rx);
        browser.load_root().await.unwrap();

        let release = store.hold_list("/app/");
        let expand = browser.expand("/app/");
        let collapse = async {
            browser.collapse("/app/");
            release.send(()).await.unwrap();
        };
        let (expanded, _) = tokio::join!(expand, collapse);

        assert!(expanded.unwrap().is_empty());
        assert!(!browser.is_expanded("/app/"));
    }
}
