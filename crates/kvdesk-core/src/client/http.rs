use crate::api::{
    AddConnectionRequest, BatchDeleteRequest, BatchDeleteResponse, ErrorResponse, HistoryResponse,
    ListKeysResponse, MoveKeyRequest, PutKeyRequest, RollbackRequest, UpdateConnectionRequest,
};
use crate::client::{RemoteStore, StoreFuture, clamp_history_limit};
use crate::error::{StoreError, StoreResult};
use crate::types::{Connection, KeyItem, KeyRevision, KeyValue};

use futures::FutureExt;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default management service location.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8888/api";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`RemoteStore`] backed by the management service's REST API.
pub struct HttpStore {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a prepared request and decode a JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> StoreResult<T> {
        let resp = self.send(request).await?;
        resp.json::<T>()
            .await
            .map_err(|e| StoreError::Remote(format!("failed to parse response: {}", e)))
    }

    /// Send a prepared request, discarding any success body.
    async fn send_unit(&self, request: reqwest::RequestBuilder) -> StoreResult<()> {
        self.send(request).await.map(|_| ())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> StoreResult<reqwest::Response> {
        let resp = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StoreError::Remote(format!("request timed out after {:?}", self.timeout))
                } else {
                    StoreError::Remote(format!("unable to reach server: {}", e))
                }
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let err = status_error(status, &body);
        log::debug!("request failed: HTTP {}: {}", status, err);
        Err(err)
    }

    async fn move_key(
        &self,
        path: &str,
        conn_id: &str,
        from: &str,
        to: &str,
        overwrite: bool,
    ) -> StoreResult<()> {
        let body = MoveKeyRequest {
            conn_id: conn_id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            overwrite,
        };
        self.send_unit(self.client.post(self.url(path)).json(&body))
            .await
    }

    fn put_request(&self, conn_id: &str, key: &str, value: &str, ttl: Option<i64>) -> PutKeyRequest {
        PutKeyRequest {
            conn_id: conn_id.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            ttl: ttl.filter(|t| *t > 0),
        }
    }
}

/// Map a failed response to a [`StoreError`]. Only not-found and conflict
/// are told apart; the server's `{message, details}` body is used if present.
fn status_error(status: reqwest::StatusCode, body: &str) -> StoreError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.describe())
        .unwrap_or_else(|_| format!("HTTP {} - {}", status, body));
    match status {
        reqwest::StatusCode::NOT_FOUND => StoreError::NotFound(message),
        reqwest::StatusCode::CONFLICT => StoreError::Conflict(message),
        _ => StoreError::Remote(message),
    }
}

impl Default for HttpStore {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }
}

impl RemoteStore for HttpStore {
    fn list_connections(&self) -> StoreFuture<'_, Vec<Connection>> {
        async move {
            self.send_json(self.client.get(self.url("/connections")))
                .await
        }
        .boxed()
    }

    fn create_connection(&self, request: AddConnectionRequest) -> StoreFuture<'_, Connection> {
        async move {
            self.send_json(self.client.post(self.url("/connections")).json(&request))
                .await
        }
        .boxed()
    }

    fn update_connection(&self, request: UpdateConnectionRequest) -> StoreFuture<'_, Connection> {
        async move {
            self.send_json(self.client.put(self.url("/connections")).json(&request))
                .await
        }
        .boxed()
    }

    fn delete_connection<'a>(&'a self, id: &'a str) -> StoreFuture<'a, ()> {
        async move {
            self.send_unit(self.client.delete(self.url("/connections")).query(&[("id", id)]))
                .await
        }
        .boxed()
    }

    fn connect<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Connection> {
        async move {
            log::info!("Connecting {}", id);
            self.send_json(
                self.client
                    .post(self.url("/connections/connect"))
                    .query(&[("id", id)]),
            )
            .await
        }
        .boxed()
    }

    fn disconnect<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Connection> {
        async move {
            self.send_json(
                self.client
                    .post(self.url("/connections/disconnect"))
                    .query(&[("id", id)]),
            )
            .await
        }
        .boxed()
    }

    fn list_children<'a>(
        &'a self,
        conn_id: &'a str,
        prefix: &'a str,
        include_ttl: bool,
    ) -> StoreFuture<'a, Vec<KeyItem>> {
        async move {
            let include_ttl = if include_ttl { "true" } else { "false" };
            let resp: ListKeysResponse = self
                .send_json(self.client.get(self.url("/kv/list")).query(&[
                    ("connId", conn_id),
                    ("prefix", prefix),
                    ("includeTTL", include_ttl),
                ]))
                .await?;
            Ok(resp.children)
        }
        .boxed()
    }

    fn get_value<'a>(&'a self, conn_id: &'a str, key: &'a str) -> StoreFuture<'a, KeyValue> {
        async move {
            self.send_json(
                self.client
                    .get(self.url("/kv"))
                    .query(&[("connId", conn_id), ("key", key)]),
            )
            .await
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
        async move {
            let body = self.put_request(conn_id, key, value, ttl);
            self.send_unit(self.client.put(self.url("/kv")).json(&body))
                .await
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
        async move {
            let body = self.put_request(conn_id, key, value, ttl);
            self.send_unit(self.client.post(self.url("/kv")).json(&body))
                .await
        }
        .boxed()
    }

    /// The service only reports success, so a successful delete counts as one key.
    fn delete_key<'a>(&'a self, conn_id: &'a str, key: &'a str) -> StoreFuture<'a, u64> {
        async move {
            self.send_unit(
                self.client
                    .delete(self.url("/kv"))
                    .query(&[("connId", conn_id), ("key", key)]),
            )
            .await?;
            Ok(1)
        }
        .boxed()
    }

    fn batch_delete<'a>(&'a self, conn_id: &'a str, keys: &'a [String]) -> StoreFuture<'a, u64> {
        async move {
            let body = BatchDeleteRequest {
                conn_id: conn_id.to_string(),
                keys: keys.to_vec(),
            };
            let resp: BatchDeleteResponse = self
                .send_json(self.client.post(self.url("/kv/batch-delete")).json(&body))
                .await?;
            Ok(resp.deleted)
        }
        .boxed()
    }

    fn rename_key<'a>(
        &'a self,
        conn_id: &'a str,
        from: &'a str,
        to: &'a str,
        overwrite: bool,
    ) -> StoreFuture<'a, ()> {
        self.move_key("/kv/rename", conn_id, from, to, overwrite)
            .boxed()
    }

    fn copy_key<'a>(
        &'a self,
        conn_id: &'a str,
        from: &'a str,
        to: &'a str,
        overwrite: bool,
    ) -> StoreFuture<'a, ()> {
        self.move_key("/kv/copy", conn_id, from, to, overwrite)
            .boxed()
    }

    fn get_history<'a>(
        &'a self,
        conn_id: &'a str,
        key: &'a str,
        limit: usize,
    ) -> StoreFuture<'a, Vec<KeyRevision>> {
        async move {
            let limit = clamp_history_limit(limit).to_string();
            let resp: HistoryResponse = self
                .send_json(self.client.get(self.url("/kv/history")).query(&[
                    ("connId", conn_id),
                    ("key", key),
                    ("limit", limit.as_str()),
                ]))
                .await?;
            if let Some(note) = resp.note.as_deref() {
                log::debug!("history for {}: {}", resp.key, note);
            }
            Ok(resp.history)
        }
        .boxed()
    }

    fn rollback<'a>(&'a self, conn_id: &'a str, key: &'a str, revision: i64) -> StoreFuture<'a, ()> {
        async move {
            let body = RollbackRequest {
                conn_id: conn_id.to_string(),
                key: key.to_string(),
                revision,
            };
            self.send_unit(self.client.post(self.url("/kv/rollback")).json(&body))
                .await
        }
        .boxed()
    }
}
