use crate::types::{KeyItem, KeyRevision};
use serde::{Deserialize, Serialize};

// ── API request/response types ──────────────────────────────────────────────

/// POST /connections request (create)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddConnectionRequest {
    pub name: String,
    pub endpoints: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// PUT /connections request (update, identified by `id`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateConnectionRequest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// GET /kv/list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListKeysResponse {
    pub prefix: String,
    #[serde(default)]
    pub children: Vec<KeyItem>,
}

/// PUT /kv and POST /kv request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutKeyRequest {
    pub conn_id: String,
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

/// POST /kv/rename and POST /kv/copy request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveKeyRequest {
    pub conn_id: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub overwrite: bool,
}

/// POST /kv/batch-delete request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteRequest {
    pub conn_id: String,
    pub keys: Vec<String>,
}

/// POST /kv/batch-delete response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDeleteResponse {
    pub deleted: u64,
}

/// GET /kv/history response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub key: String,
    #[serde(default)]
    pub history: Vec<KeyRevision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// POST /kv/rollback request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackRequest {
    pub conn_id: String,
    pub key: String,
    pub revision: i64,
}

/// Generic error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: Option<u16>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Message with details appended when the server supplied them.
    pub fn describe(&self) -> String {
        match self.details.as_deref() {
            Some(details) if !details.is_empty() => format!("{} ({})", self.message, details),
            _ => self.message.clone(),
        }
    }
}
