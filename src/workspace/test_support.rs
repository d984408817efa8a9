//! Store wrappers for exercising interleaved requests.

use kvdesk_core::api::{AddConnectionRequest, UpdateConnectionRequest};
use kvdesk_core::types::{Connection, KeyItem, KeyRevision, KeyValue};
use kvdesk_core::{MemoryStore, RemoteStore, StoreFuture};

use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A fresh store with one connected connection named `dev`.
pub async fn connected_store() -> (Arc<MemoryStore>, String) {
    let store = Arc::new(MemoryStore::new());
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

/// Wraps a [`MemoryStore`] and can hold individual requests until released.
///
/// A held request waits for one message on the returned sender (or for the
/// sender to be dropped) before reaching the inner store.
pub struct GatedStore {
    inner: Arc<MemoryStore>,
    gates: Mutex<HashMap<String, async_channel::Receiver<()>>>,
}

impl GatedStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            gates: Mutex::new(HashMap::new()),
        }
    }

    fn hold(&self, gate: String) -> async_channel::Sender<()> {
        let (tx, rx) = async_channel::bounded(1);
        self.gates.lock().insert(gate, rx);
        tx
    }

    /// Hold the next `get_value` of `key`.
    pub fn hold_get(&self, key: &str) -> async_channel::Sender<()> {
        self.hold(format!("get:{}", key))
    }

    /// Hold the next `put_value` of `key`.
    pub fn hold_put(&self, key: &str) -> async_channel::Sender<()> {
        self.hold(format!("put:{}", key))
    }

    /// Hold the next `list_children` of `prefix`.
    pub fn hold_list(&self, prefix: &str) -> async_channel::Sender<()> {
        self.hold(format!("list:{}", prefix))
    }

    fn take_gate(&self, gate: String) -> Option<async_channel::Receiver<()>> {
        self.gates.lock().remove(&gate)
    }
}

async fn wait(gate: Option<async_channel::Receiver<()>>) {
    if let Some(rx) = gate {
        let _ = rx.recv().await;
    }
}

impl RemoteStore for GatedStore {
    fn list_connections(&self) -> StoreFuture<'_, Vec<Connection>> {
        self.inner.list_connections()
    }

    fn create_connection(&self, request: AddConnectionRequest) -> StoreFuture<'_, Connection> {
        self.inner.create_connection(request)
    }

    fn update_connection(&self, request: UpdateConnectionRequest) -> StoreFuture<'_, Connection> {
        self.inner.update_connection(request)
    }

    fn delete_connection<'a>(&'a self, id: &'a str) -> StoreFuture<'a, ()> {
        self.inner.delete_connection(id)
    }

    fn connect<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Connection> {
        self.inner.connect(id)
    }

    fn disconnect<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Connection> {
        self.inner.disconnect(id)
    }

    fn list_children<'a>(
        &'a self,
        conn_id: &'a str,
        prefix: &'a str,
        include_ttl: bool,
    ) -> StoreFuture<'a, Vec<KeyItem>> {
        let gate = self.take_gate(format!("list:{}", prefix));
        async move {
            wait(gate).await;
            self.inner.list_children(conn_id, prefix, include_ttl).await
        }
        .boxed()
    }

    fn get_value<'a>(&'a self, conn_id: &'a str, key: &'a str) -> StoreFuture<'a, KeyValue> {
        let gate = self.take_gate(format!("get:{}", key));
        async move {
            wait(gate).await;
            self.inner.get_value(conn_id, key).await
        }
        .boxed()
    }

    fn put_value<'a>(
        &'a self,
        conn_id: &'a str,
        key: &'a str,
        value: &'a str,
        ttl: Option<i64>,
    ) -> StoreFuture<'a, ()> {
        let gate = self.take_gate(format!("put:{}", key));
        async move {
            wait(gate).await;
            self.inner.put_value(conn_id, key, value, ttl).await
        }
        .boxed()
    }

    fn create_key<'a>(
        &'a self,
        conn_id: &'a str,
        key: &'a str,
        value: &'a str,
        ttl: Option<i64>,
    ) -> StoreFuture<'a, ()> {
        self.inner.create_key(conn_id, key, value, ttl)
    }

    fn delete_key<'a>(&'a self, conn_id: &'a str, key: &'a str) -> StoreFuture<'a, u64> {
        self.inner.delete_key(conn_id, key)
    }

    fn batch_delete<'a>(&'a self, conn_id: &'a str, keys: &'a [String]) -> StoreFuture<'a, u64> {
        self.inner.batch_delete(conn_id, keys)
    }

    fn rename_key<'a>(
        &'a self,
        conn_id: &'a str,
        from: &'a str,
        to: &'a str,
        overwrite: bool,
    ) -> StoreFuture<'a, ()> {
        self.inner.rename_key(conn_id, from, to, overwrite)
    }

    fn copy_key<'a>(
        &'a self,
        conn_id: &'a str,
        from: &'a str,
        to: &'a str,
        overwrite: bool,
    ) -> StoreFuture<'a, ()> {
        self.inner.copy_key(conn_id, from, to, overwrite)
    }

    fn get_history<'a>(
        &'a self,
        conn_id: &'a str,
        key: &'a str,
        limit: usize,
    ) -> StoreFuture<'a, Vec<KeyRevision>> {
        self.inner.get_history(conn_id, key, limit)
    }

    fn rollback<'a>(&'a self, conn_id: &'a str, key: &'a str, revision: i64) -> StoreFuture<'a, ()> {
        self.inner.rollback(conn_id, key, revision)
    }
}
