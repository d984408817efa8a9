use serde::{Deserialize, Serialize};

/// Lifecycle status of a store connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Known but not connected
    #[default]
    Disconnected,
    /// Connected and usable for browsing
    Connected,
    /// Last connect attempt failed
    Error,
}

impl ConnectionStatus {
    /// Get the display name for this status.
    pub fn display_name(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        }
    }
}

/// Optional username/password pair for an authenticated store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// A named reference to a remote key-value store endpoint set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Opaque, stable identifier assigned by the connection service
    pub id: String,
    /// User-friendly label (e.g. "dev")
    pub name: String,
    /// Endpoint URLs, at least one
    pub endpoints: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub status: ConnectionStatus,
    /// Unix seconds of the last change to this record
    #[serde(default)]
    pub updated_at: i64,
}

impl Connection {
    /// Credentials, if a username was configured.
    pub fn credentials(&self) -> Option<Credentials> {
        self.username.as_ref().map(|username| Credentials {
            username: username.clone(),
            password: self.password.clone().unwrap_or_default(),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }
}

/// One immediate child returned by a prefix listing.
///
/// Directory entries are flagged `is_dir`, carry no value preview and are
/// keyed `prefix + name` with no trailing `/`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyItem {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub is_dir: bool,
    /// Remaining lease seconds, 0 when the key does not expire
    #[serde(default)]
    pub ttl: i64,
}

/// Value and TTL of a single key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub ttl: i64,
}

/// Immutable historical snapshot of a key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRevision {
    /// Global store revision this snapshot was read at
    pub revision: i64,
    pub value: String,
    /// Revision of the write that produced this value
    pub mod_revision: i64,
    /// Revision at which the key was created
    pub create_time: i64,
    /// Per-key version counter
    pub version: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ConnectionStatus::Connected).unwrap(),
            "\"connected\""
        );
        let parsed: ConnectionStatus = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(parsed, ConnectionStatus::Error);
    }

    #[test]
    fn connection_parses_service_record() {
        let json = r#"{
            "id": "c1",
            "name": "dev",
            "endpoints": ["http://127.0.0.1:2379"],
            "status": "disconnected",
            "updatedAt": 1700000000
        }"#;
        let conn: Connection = serde_json::from_str(json).unwrap();
        assert_eq!(conn.name, "dev");
        assert_eq!(conn.status, ConnectionStatus::Disconnected);
        assert!(conn.credentials().is_none());
        assert!(!conn.is_connected());
    }

    #[test]
    fn key_item_omits_missing_value() {
        let item = KeyItem {
            key: "/foo/".to_string(),
            value: None,
            is_dir: true,
            ttl: 0,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(!json.contains("value"));
        assert!(json.contains("\"isDir\":true"));
    }
}
