//! In-process versioned key-value store.
//!
//! Behaves like the real service: every write bumps a global revision, every
//! key carries a per-key version and an optional lease, history survives until
//! compaction, and key operations require a connected connection.

use crate::api::{AddConnectionRequest, UpdateConnectionRequest};
use crate::client::{RemoteStore, StoreFuture, clamp_history_limit};
use crate::error::{StoreError, StoreResult};
use crate::keys::{dir_prefix, validate_connection_name, validate_endpoints, validate_key, validate_value};
use crate::types::{Connection, ConnectionStatus, KeyItem, KeyRevision, KeyValue};

use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Clone)]
struct StoredValue {
    mod_revision: i64,
    value: String,
    version: i64,
}

#[derive(Clone, Copy)]
struct Lease {
    ttl: i64,
    granted_at: Instant,
}

impl Lease {
    fn grant(ttl: Option<i64>) -> Option<Self> {
        ttl.filter(|t| *t > 0).map(|ttl| Lease {
            ttl,
            granted_at: Instant::now(),
        })
    }

    fn remaining(&self) -> i64 {
        self.ttl - self.granted_at.elapsed().as_secs() as i64
    }
}

struct Entry {
    create_revision: i64,
    current: StoredValue,
    /// Earlier writes, oldest first
    previous: Vec<StoredValue>,
    lease: Option<Lease>,
}

impl Entry {
    fn remaining_ttl(&self) -> i64 {
        self.lease.map(|l| l.remaining().max(0)).unwrap_or(0)
    }

    fn expired(&self) -> bool {
        self.lease.is_some_and(|l| l.remaining() <= 0)
    }

    /// Value as of `revision`, if the key existed then.
    fn value_at(&self, revision: i64) -> Option<&StoredValue> {
        if revision < self.create_revision {
            return None;
        }
        std::iter::once(&self.current)
            .chain(self.previous.iter().rev())
            .find(|w| w.mod_revision <= revision)
    }
}

#[derive(Default)]
struct Namespace {
    revision: i64,
    compacted: i64,
    entries: BTreeMap<String, Entry>,
}

impl Namespace {
    fn next_revision(&mut self) -> i64 {
        self.revision += 1;
        self.revision
    }

    fn purge_expired(&mut self) {
        self.entries.retain(|_, e| !e.expired());
    }

    fn write_at(&mut self, revision: i64, key: &str, value: &str, lease: Option<Lease>) {
        match self.entries.get_mut(key) {
            Some(entry) => {
                let version = entry.current.version + 1;
                let old = std::mem::replace(
                    &mut entry.current,
                    StoredValue {
                        mod_revision: revision,
                        value: value.to_string(),
                        version,
                    },
                );
                entry.previous.push(old);
                entry.lease = lease;
            }
            None => {
                self.entries.insert(
                    key.to_string(),
                    Entry {
                        create_revision: revision,
                        current: StoredValue {
                            mod_revision: revision,
                            value: value.to_string(),
                            version: 1,
                        },
                        previous: Vec::new(),
                        lease,
                    },
                );
            }
        }
    }

    fn put(&mut self, key: &str, value: &str, lease: Option<Lease>) {
        let revision = self.next_revision();
        self.write_at(revision, key, value, lease);
    }
}

#[derive(Default)]
struct MemoryInner {
    connections: Vec<Connection>,
    namespaces: HashMap<String, Namespace>,
    unreachable: HashSet<String>,
}

impl MemoryInner {
    fn connection_mut(&mut self, id: &str) -> StoreResult<&mut Connection> {
        self.connections
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("connection not found: {}", id)))
    }

    /// Namespace of a connected connection, with expired leases dropped.
    fn live_namespace(&mut self, conn_id: &str) -> StoreResult<&mut Namespace> {
        let connected = self
            .connections
            .iter()
            .any(|c| c.id == conn_id && c.is_connected());
        if !connected {
            return Err(StoreError::Remote(
                "invalid connId or not connected".to_string(),
            ));
        }
        let ns = self.namespaces.entry(conn_id.to_string()).or_default();
        ns.purge_expired();
        Ok(ns)
    }
}

/// Versioned store living entirely in memory.
///
/// Used as the collaborator in tests and for offline experiments with the shell.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    requests: AtomicU64,
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of trait calls served so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Make future `connect` calls for `id` fail (or succeed again).
    pub fn set_unreachable(&self, id: &str, unreachable: bool) {
        let mut inner = self.inner.lock();
        if unreachable {
            inner.unreachable.insert(id.to_string());
        } else {
            inner.unreachable.remove(id);
        }
    }

    /// Write a key directly, regardless of connection status.
    pub fn seed(&self, conn_id: &str, key: &str, value: &str) {
        let mut inner = self.inner.lock();
        inner
            .namespaces
            .entry(conn_id.to_string())
            .or_default()
            .put(key, value, None);
    }

    /// Discard history at or below `revision`.
    pub fn compact(&self, conn_id: &str, revision: i64) {
        let mut inner = self.inner.lock();
        let ns = inner.namespaces.entry(conn_id.to_string()).or_default();
        ns.compacted = ns.compacted.max(revision);
        for entry in ns.entries.values_mut() {
            entry.previous.retain(|w| w.mod_revision > revision);
        }
    }

    pub fn current_revision(&self, conn_id: &str) -> i64 {
        self.inner
            .lock()
            .namespaces
            .get(conn_id)
            .map(|ns| ns.revision)
            .unwrap_or(0)
    }

    pub fn contains_key(&self, conn_id: &str, key: &str) -> bool {
        self.inner
            .lock()
            .namespaces
            .get(conn_id)
            .is_some_and(|ns| ns.entries.contains_key(key))
    }

    fn count(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    // ── synchronous operations behind the trait ────────────────────────────

    fn do_create_connection(&self, request: AddConnectionRequest) -> StoreResult<Connection> {
        validate_connection_name(&request.name)?;
        validate_endpoints(&request.endpoints)?;
        let conn = Connection {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name,
            endpoints: request.endpoints,
            username: request.username.filter(|u| !u.is_empty()),
            password: request.password.filter(|p| !p.is_empty()),
            status: ConnectionStatus::Disconnected,
            updated_at: now_secs(),
        };
        let mut inner = self.inner.lock();
        inner.namespaces.entry(conn.id.clone()).or_default();
        inner.connections.push(conn.clone());
        Ok(conn)
    }

    fn do_update_connection(&self, request: UpdateConnectionRequest) -> StoreResult<Connection> {
        if let Some(name) = request.name.as_deref() {
            validate_connection_name(name)?;
        }
        if let Some(endpoints) = request.endpoints.as_deref() {
            validate_endpoints(endpoints)?;
        }
        let mut inner = self.inner.lock();
        let conn = inner.connection_mut(&request.id)?;
        if let Some(name) = request.name {
            conn.name = name;
        }
        if let Some(endpoints) = request.endpoints {
            conn.endpoints = endpoints;
        }
        if let Some(username) = request.username {
            conn.username = Some(username).filter(|u| !u.is_empty());
        }
        if let Some(password) = request.password {
            conn.password = Some(password).filter(|p| !p.is_empty());
        }
        conn.updated_at = now_secs();
        Ok(conn.clone())
    }

    fn do_delete_connection(&self, id: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        let idx = inner
            .connections
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("connection not found: {}", id)))?;
        inner.connections.remove(idx);
        inner.namespaces.remove(id);
        Ok(())
    }

    fn do_connect(&self, id: &str) -> StoreResult<Connection> {
        let mut inner = self.inner.lock();
        let unreachable = inner.unreachable.contains(id);
        let conn = inner.connection_mut(id)?;
        conn.updated_at = now_secs();
        if unreachable {
            conn.status = ConnectionStatus::Error;
            return Err(StoreError::Remote(format!(
                "cannot reach {}",
                conn.endpoints.join(", ")
            )));
        }
        conn.status = ConnectionStatus::Connected;
        Ok(conn.clone())
    }

    fn do_disconnect(&self, id: &str) -> StoreResult<Connection> {
        let mut inner = self.inner.lock();
        let conn = inner.connection_mut(id)?;
        conn.status = ConnectionStatus::Disconnected;
        conn.updated_at = now_secs();
        Ok(conn.clone())
    }

    fn do_list_children(
        &self,
        conn_id: &str,
        prefix: &str,
        include_ttl: bool,
    ) -> StoreResult<Vec<KeyItem>> {
        let prefix = dir_prefix(prefix);
        let mut inner = self.inner.lock();
        let ns = inner.live_namespace(conn_id)?;

        // keyed by segment: a directory hides a leaf of the same name
        let mut children: BTreeMap<String, KeyItem> = BTreeMap::new();
        for (key, entry) in ns.entries.range(prefix.clone()..) {
            let Some(remain) = key.strip_prefix(prefix.as_str()) else {
                break;
            };
            let (segment, is_dir) = match remain.find('/') {
                Some(idx) => (&remain[..idx], true),
                None => (remain, false),
            };
            if segment.is_empty() {
                continue;
            }
            let path = format!("{}{}", prefix, segment);
            if is_dir {
                children.insert(
                    segment.to_string(),
                    KeyItem {
                        key: path,
                        value: None,
                        is_dir: true,
                        ttl: 0,
                    },
                );
            } else {
                children.entry(segment.to_string()).or_insert(KeyItem {
                    key: path,
                    value: Some(entry.current.value.clone()),
                    is_dir: false,
                    ttl: if include_ttl { entry.remaining_ttl() } else { 0 },
                });
            }
        }
        Ok(children.into_values().collect())
    }

    fn do_get_value(&self, conn_id: &str, key: &str) -> StoreResult<KeyValue> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        let ns = inner.live_namespace(conn_id)?;
        let entry = ns
            .entries
            .get(key)
            .ok_or_else(|| StoreError::NotFound(format!("key not found: {}", key)))?;
        Ok(KeyValue {
            key: key.to_string(),
            value: entry.current.value.clone(),
            ttl: entry.remaining_ttl(),
        })
    }

    fn do_put_value(
        &self,
        conn_id: &str,
        key: &str,
        value: &str,
        ttl: Option<i64>,
        create_only: bool,
    ) -> StoreResult<()> {
        validate_key(key)?;
        validate_value(value)?;
        let mut inner = self.inner.lock();
        let ns = inner.live_namespace(conn_id)?;
        if create_only && ns.entries.contains_key(key) {
            return Err(StoreError::Conflict(format!("key already exists: {}", key)));
        }
        ns.put(key, value, Lease::grant(ttl));
        Ok(())
    }

    fn do_delete(&self, conn_id: &str, keys: &[String]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Err(StoreError::Validation(
                "keys array is required and cannot be empty".to_string(),
            ));
        }
        keys.iter().try_for_each(|k| validate_key(k))?;
        let mut inner = self.inner.lock();
        let ns = inner.live_namespace(conn_id)?;
        let deleted = keys
            .iter()
            .filter(|k| ns.entries.remove(k.as_str()).is_some())
            .count() as u64;
        if deleted > 0 {
            ns.next_revision();
        }
        Ok(deleted)
    }

    fn do_move(
        &self,
        conn_id: &str,
        from: &str,
        to: &str,
        overwrite: bool,
        remove_source: bool,
    ) -> StoreResult<()> {
        validate_key(from)?;
        validate_key(to)?;
        if from == to {
            return Err(StoreError::Validation(
                "source and destination are the same key".to_string(),
            ));
        }
        let mut inner = self.inner.lock();
        let ns = inner.live_namespace(conn_id)?;
        let source = ns
            .entries
            .get(from)
            .ok_or_else(|| StoreError::NotFound(format!("source key not found: {}", from)))?;
        let value = source.current.value.clone();
        let lease = source.lease;
        if !overwrite && ns.entries.contains_key(to) {
            return Err(StoreError::Conflict(format!("destination exists: {}", to)));
        }
        let revision = ns.next_revision();
        ns.write_at(revision, to, &value, lease);
        if remove_source {
            ns.entries.remove(from);
        }
        Ok(())
    }

    fn do_get_history(
        &self,
        conn_id: &str,
        key: &str,
        limit: usize,
    ) -> StoreResult<Vec<KeyRevision>> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        let ns = inner.live_namespace(conn_id)?;
        let compacted = ns.compacted;
        let entry = ns
            .entries
            .get(key)
            .ok_or_else(|| StoreError::NotFound(format!("key not found: {}", key)))?;
        let history = std::iter::once(&entry.current)
            .chain(entry.previous.iter().rev().filter(|w| w.mod_revision > compacted))
            .take(clamp_history_limit(limit))
            .map(|w| KeyRevision {
                revision: w.mod_revision,
                value: w.value.clone(),
                mod_revision: w.mod_revision,
                create_time: entry.create_revision,
                version: w.version,
            })
            .collect();
        Ok(history)
    }

    fn do_rollback(&self, conn_id: &str, key: &str, revision: i64) -> StoreResult<()> {
        validate_key(key)?;
        let mut inner = self.inner.lock();
        let ns = inner.live_namespace(conn_id)?;
        if revision <= ns.compacted {
            return Err(StoreError::Remote(format!(
                "required revision {} has been compacted",
                revision
            )));
        }
        if revision > ns.revision {
            return Err(StoreError::Remote(format!(
                "required revision {} is a future revision",
                revision
            )));
        }
        let value = ns
            .entries
            .get(key)
            .and_then(|e| e.value_at(revision))
            .map(|w| w.value.clone())
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "key not found at revision {} (may be compacted)",
                    revision
                ))
            })?;
        ns.put(key, &value, None);
        Ok(())
    }
}

impl RemoteStore for MemoryStore {
    fn list_connections(&self) -> StoreFuture<'_, Vec<Connection>> {
        self.count();
        let list = self.inner.lock().connections.clone();
        futures::future::ready(Ok(list)).boxed()
    }

    fn create_connection(&self, request: AddConnectionRequest) -> StoreFuture<'_, Connection> {
        self.count();
        futures::future::ready(self.do_create_connection(request)).boxed()
    }

    fn update_connection(&self, request: UpdateConnectionRequest) -> StoreFuture<'_, Connection> {
        self.count();
        futures::future::ready(self.do_update_connection(request)).boxed()
    }

    fn delete_connection<'a>(&'a self, id: &'a str) -> StoreFuture<'a, ()> {
        self.count();
        futures::future::ready(self.do_delete_connection(id)).boxed()
    }

    fn connect<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Connection> {
        self.count();
        futures::future::ready(self.do_connect(id)).boxed()
    }

    fn disconnect<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Connection> {
        self.count();
        futures::future::ready(self.do_disconnect(id)).boxed()
    }

    fn list_children<'a>(
        &'a self,
        conn_id: &'a str,
        prefix: &'a str,
        include_ttl: bool,
    ) -> StoreFuture<'a, Vec<KeyItem>> {
        self.count();
        futures::future::ready(self.do_list_children(conn_id, prefix, include_ttl)).boxed()
    }

    fn get_value<'a>(&'a self, conn_id: &'a str, key: &'a str) -> StoreFuture<'a, KeyValue> {
        self.count();
        futures::future::ready(self.do_get_value(conn_id, key)).boxed()
    }

    fn put_value<'a>(
        &'a self,
        conn_id: &'a str,
        key: &'a str,
        value: &'a str,
        ttl: Option<i64>,
    ) -> StoreFuture<'a, ()> {
        self.count();
        futures::future::ready(self.do_put_value(conn_id, key, value, ttl, false)).boxed()
    }

    fn create_key<'a>(
        &'a self,
        conn_id: &'a str,
        key: &'a str,
        value: &'a str,
        ttl: Option<i64>,
    ) -> StoreFuture<'a, ()> {
        self.count();
        futures::future::ready(self.do_put_value(conn_id, key, value, ttl, true)).boxed()
    }

    fn delete_key<'a>(&'a self, conn_id: &'a str, key: &'a str) -> StoreFuture<'a, u64> {
        self.count();
        futures::future::ready(self.do_delete(conn_id, &[key.to_string()])).boxed()
    }

    fn batch_delete<'a>(&'a self, conn_id: &'a str, keys: &'a [String]) -> StoreFuture<'a, u64> {
        self.count();
        futures::future::ready(self.do_delete(conn_id, keys)).boxed()
    }

    fn rename_key<'a>(
        &'a self,
        conn_id: &'a str,
        from: &'a str,
        to: &'a str,
        overwrite: bool,
    ) -> StoreFuture<'a, ()> {
        self.count();
        futures::future::ready(self.do_move(conn_id, from, to, overwrite, true)).boxed()
    }

    fn copy_key<'a>(
        &'a self,
        conn_id: &'a str,
        from: &'a str,
        to: &'a str,
        overwrite: bool,
    ) -> StoreFuture<'a, ()> {
        self.count();
        futures::future::ready(self.do_move(conn_id, from, to, overwrite, false)).boxed()
    }

    fn get_history<'a>(
        &'a self,
        conn_id: &'a str,
        key: &'a str,
        limit: usize,
    ) -> StoreFuture<'a, Vec<KeyRevision>> {
        self.count();
        futures::future::ready(self.do_get_history(conn_id, key, limit)).boxed()
    }

    fn rollback<'a>(&'a self, conn_id: &'a str, key: &'a str, revision: i64) -> StoreFuture<'a, ()> {
        self.count();
        futures::future::ready(self.do_rollback(conn_id, key, revision)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    async fn connected_store() -> (MemoryStore, String) {
        let store = MemoryStore::new();
        let conn = store
            .create_connection(AddConnectionRequest {
                name: "dev".to_string(),
                endpoints: vec!["http://127.0.0.1:2379".to_string()],
                username: None,
                password: None,
            })
            .await
            .unwrap();
        store.connect(&conn.id).await.unwrap();
        (store, conn.id)
    }

    #[tokio::test]
    async fn key_operations_require_connected() {
        let store = MemoryStore::new();
        let conn = store
            .create_connection(AddConnectionRequest {
                name: "dev".to_string(),
                endpoints: vec!["http://127.0.0.1:2379".to_string()],
                username: None,
                password: None,
            })
            .await
            .unwrap();
        assert_eq!(conn.status, ConnectionStatus::Disconnected);
        let err = store.list_children(&conn.id, "/", false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
    }

    #[tokio::test]
    async fn unreachable_connect_marks_error() {
        let (store, id) = connected_store().await;
        store.disconnect(&id).await.unwrap();
        store.set_unreachable(&id, true);
        assert!(store.connect(&id).await.is_err());
        let list = store.list_connections().await.unwrap();
        assert_eq!(list[0].status, ConnectionStatus::Error);
    }

    #[tokio::test]
    async fn list_children_groups_directories() {
        let (store, id) = connected_store().await;
        store.seed(&id, "/foo/bar", "1");
        store.seed(&id, "/foo/baz/qux", "2");
        store.seed(&id, "/top", "3");
        store.seed(&id, "/foo/", "");

        let root = store.list_children(&id, "/", false).await.unwrap();
        let keys: Vec<&str> = root.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["/foo", "/top"]);
        assert!(root[0].is_dir);
        assert_eq!(root[0].value, None);
        assert_eq!(root[1].value.as_deref(), Some("3"));

        let foo = store.list_children(&id, "/foo", false).await.unwrap();
        let keys: Vec<&str> = foo.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["/foo/bar", "/foo/baz"]);
        assert!(foo[1].is_dir);
    }

    #[tokio::test]
    async fn directory_hides_leaf_of_same_name() {
        let (store, id) = connected_store().await;
        store.seed(&id, "/svc", "leaf");
        store.seed(&id, "/svc/port", "80");

        let root = store.list_children(&id, "/", false).await.unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].key, "/svc");
        assert!(root[0].is_dir);
    }

    #[tokio::test]
    async fn versions_and_history_are_most_recent_first() {
        let (store, id) = connected_store().await;
        store.put_value(&id, "/k", "v1", None).await.unwrap();
        store.put_value(&id, "/k", "v2", None).await.unwrap();
        store.put_value(&id, "/k", "v3", None).await.unwrap();

        let history = store.get_history(&id, "/k", 10).await.unwrap();
        let values: Vec<&str> = history.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["v3", "v2", "v1"]);
        assert_eq!(history[0].version, 3);
        assert!(history[0].revision > history[1].revision);
        assert_eq!(history[2].create_time, history[0].create_time);

        let limited = store.get_history(&id, "/k", 2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn rollback_writes_a_new_revision() {
        let (store, id) = connected_store().await;
        store.put_value(&id, "/k", "v1", None).await.unwrap();
        let first = store.current_revision(&id);
        store.put_value(&id, "/k", "v2", None).await.unwrap();

        store.rollback(&id, "/k", first).await.unwrap();
        let value = store.get_value(&id, "/k").await.unwrap();
        assert_eq!(value.value, "v1");

        let history = store.get_history(&id, "/k", 10).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].value, "v1");
        assert_eq!(history[0].version, 3);
    }

    #[tokio::test]
    async fn rollback_to_compacted_revision_fails() {
        let (store, id) = connected_store().await;
        store.put_value(&id, "/k", "v1", None).await.unwrap();
        let first = store.current_revision(&id);
        store.put_value(&id, "/k", "v2", None).await.unwrap();
        store.compact(&id, first);

        let err = store.rollback(&id, "/k", first).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
        let history = store.get_history(&id, "/k", 10).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn rename_and_copy_respect_overwrite() {
        let (store, id) = connected_store().await;
        store.put_value(&id, "/a", "A", None).await.unwrap();
        store.put_value(&id, "/b", "B", None).await.unwrap();

        let err = store.rename_key(&id, "/a", "/b", false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let err = store.copy_key(&id, "/missing", "/c", false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        store.copy_key(&id, "/a", "/c", false).await.unwrap();
        assert!(store.contains_key(&id, "/a"));
        assert_eq!(store.get_value(&id, "/c").await.unwrap().value, "A");

        store.rename_key(&id, "/a", "/b", true).await.unwrap();
        assert!(!store.contains_key(&id, "/a"));
        assert_eq!(store.get_value(&id, "/b").await.unwrap().value, "A");
    }

    #[tokio::test]
    async fn create_key_conflicts_on_existing() {
        let (store, id) = connected_store().await;
        store.create_key(&id, "/new", "x", Some(60)).await.unwrap();
        let err = store.create_key(&id, "/new", "y", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let value = store.get_value(&id, "/new").await.unwrap();
        assert!(value.ttl > 0 && value.ttl <= 60);
    }

    #[tokio::test]
    async fn batch_delete_counts_removed_keys() {
        let (store, id) = connected_store().await;
        store.seed(&id, "/a", "1");
        store.seed(&id, "/b", "2");
        let keys = vec!["/a".to_string(), "/b".to_string(), "/missing".to_string()];
        assert_eq!(store.batch_delete(&id, &keys).await.unwrap(), 2);

        let err = store.batch_delete(&id, &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn get_missing_key_is_not_found() {
        let (store, id) = connected_store().await;
        let err = store.get_value(&id, "/nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
