//! The remote store boundary.
//!
//! Everything the workspace knows about the remote side goes through
//! [`RemoteStore`]. Two implementations ship here: [`MemoryStore`], a fully
//! in-process versioned store, and (with the `client` feature) [`HttpStore`],
//! which talks to the management service over HTTP.

pub mod memory;

#[cfg(feature = "client")]
pub mod http;

pub use memory::MemoryStore;

#[cfg(feature = "client")]
pub use http::HttpStore;

use crate::api::{AddConnectionRequest, UpdateConnectionRequest};
use crate::error::StoreResult;
use crate::types::{Connection, KeyItem, KeyRevision, KeyValue};
use futures::future::BoxFuture;

/// Object-safe boxed future returned by every [`RemoteStore`] method.
pub type StoreFuture<'a, T> = BoxFuture<'a, StoreResult<T>>;

/// Default number of revisions requested for a key's history.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;
/// Upper bound accepted by the history endpoint.
pub const MAX_HISTORY_LIMIT: usize = 100;

/// Clamp a requested history length into `1..=MAX_HISTORY_LIMIT`.
pub fn clamp_history_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_HISTORY_LIMIT)
}

/// Operations the workspace consumes from the remote collaborator.
///
/// Failures come back as [`crate::error::StoreError`]; only not-found and
/// conflict outcomes are distinguished from generic remote failures.
pub trait RemoteStore: Send + Sync + 'static {
    // ── connections ─────────────────────────────────────────────────────────

    fn list_connections(&self) -> StoreFuture<'_, Vec<Connection>>;

    fn create_connection(&self, request: AddConnectionRequest) -> StoreFuture<'_, Connection>;

    fn update_connection(&self, request: UpdateConnectionRequest) -> StoreFuture<'_, Connection>;

    fn delete_connection<'a>(&'a self, id: &'a str) -> StoreFuture<'a, ()>;

    /// Open the connection; the returned record carries the new status.
    fn connect<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Connection>;

    fn disconnect<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Connection>;

    // ── keys ────────────────────────────────────────────────────────────────

    /// Immediate children of `prefix`. Directories come back flagged `is_dir`
    /// as `prefix + name`, without a trailing `/`.
    fn list_children<'a>(
        &'a self,
        conn_id: &'a str,
        prefix: &'a str,
        include_ttl: bool,
    ) -> StoreFuture<'a, Vec<KeyItem>>;

    fn get_value<'a>(&'a self, conn_id: &'a str, key: &'a str) -> StoreFuture<'a, KeyValue>;

    /// Create or overwrite `key`. A `ttl` of `None` stores it without expiry.
    fn put_value<'a>(
        &'a self,
        conn_id: &'a str,
        key: &'a str,
        value: &'a str,
        ttl: Option<i64>,
    ) -> StoreFuture<'a, ()>;

    /// Create `key`, failing with a conflict if it already exists.
    fn create_key<'a>(
        &'a self,
        conn_id: &'a str,
        key: &'a str,
        value: &'a str,
        ttl: Option<i64>,
    ) -> StoreFuture<'a, ()>;

    /// Delete a single key, returning how many keys were removed.
    fn delete_key<'a>(&'a self, conn_id: &'a str, key: &'a str) -> StoreFuture<'a, u64>;

    /// Delete several keys in one request, returning how many were removed.
    fn batch_delete<'a>(&'a self, conn_id: &'a str, keys: &'a [String]) -> StoreFuture<'a, u64>;

    /// Atomically move `from` to `to`.
    fn rename_key<'a>(
        &'a self,
        conn_id: &'a str,
        from: &'a str,
        to: &'a str,
        overwrite: bool,
    ) -> StoreFuture<'a, ()>;

    fn copy_key<'a>(
        &'a self,
        conn_id: &'a str,
        from: &'a str,
        to: &'a str,
        overwrite: bool,
    ) -> StoreFuture<'a, ()>;

    /// Most-recent-first revisions of `key`, at most `limit` entries.
    fn get_history<'a>(
        &'a self,
        conn_id: &'a str,
        key: &'a str,
        limit: usize,
    ) -> StoreFuture<'a, Vec<KeyRevision>>;

    /// Write the value `key` had at `revision` as a new revision.
    fn rollback<'a>(&'a self, conn_id: &'a str, key: &'a str, revision: i64) -> StoreFuture<'a, ()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_limit_is_clamped() {
        assert_eq!(clamp_history_limit(0), 1);
        assert_eq!(clamp_history_limit(20), 20);
        assert_eq!(clamp_history_limit(500), MAX_HISTORY_LIMIT);
    }
}
