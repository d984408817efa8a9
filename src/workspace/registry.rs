use kvdesk_core::api::{AddConnectionRequest, UpdateConnectionRequest};
use kvdesk_core::keys::{validate_connection_name, validate_endpoints};
use kvdesk_core::types::{Connection, ConnectionStatus, Credentials};
use kvdesk_core::{RemoteStore, StoreError, StoreResult};

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

/// Fields to change on an existing connection. `None` leaves a field as is.
#[derive(Clone, Debug, Default)]
pub struct ConnectionUpdate {
    pub name: Option<String>,
    pub endpoints: Option<Vec<String>>,
    pub credentials: Option<Credentials>,
}

/// Known connections and the single active one.
///
/// The active id is published on a watch channel; the registry is its only
/// writer. An active connection is always a known, connected one.
pub struct ConnectionRegistry {
    store: Arc<dyn RemoteStore>,
    connections: Mutex<Vec<Connection>>,
    active: watch::Sender<Option<String>>,
}

impl ConnectionRegistry {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        let (active, _) = watch::channel(None);
        Self {
            store,
            connections: Mutex::new(Vec::new()),
            active,
        }
    }

    /// Connections in insertion order.
    pub fn list(&self) -> Vec<Connection> {
        self.connections.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<Connection> {
        self.connections.lock().iter().find(|c| c.id == id).cloned()
    }

    pub fn active_id(&self) -> Option<String> {
        self.active.borrow().clone()
    }

    pub fn active(&self) -> Option<Connection> {
        self.active_id().and_then(|id| self.get(&id))
    }

    /// Observe changes to the active connection id.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.active.subscribe()
    }

    fn upsert(&self, conn: Connection) {
        let mut connections = self.connections.lock();
        match connections.iter_mut().find(|c| c.id == conn.id) {
            Some(existing) => *existing = conn,
            None => connections.push(conn),
        }
    }

    fn set_status(&self, id: &str, status: ConnectionStatus) {
        if let Some(conn) = self.connections.lock().iter_mut().find(|c| c.id == id) {
            conn.status = status;
            conn.updated_at = now_secs();
        }
    }

    fn require_known(&self, id: &str) -> StoreResult<()> {
        if self.get(id).is_none() {
            return Err(StoreError::NotFound(format!("connection not found: {}", id)));
        }
        Ok(())
    }

    /// Drop the active selection if it points at `id`. Returns whether it did.
    fn clear_active_if(&self, id: &str) -> bool {
        self.active.send_if_modified(|active| {
            if active.as_deref() == Some(id) {
                *active = None;
                true
            } else {
                false
            }
        })
    }

    /// Re-list connections from the remote service.
    ///
    /// A connection whose last connect failed keeps its local `error` status
    /// while the service still reports it as disconnected. The active
    /// selection is cleared if its connection is gone or no longer connected.
    pub async fn refresh(&self) -> StoreResult<Vec<Connection>> {
        let remote = self.store.list_connections().await?;
        let merged = {
            let mut connections = self.connections.lock();
            let merged: Vec<Connection> = remote
                .into_iter()
                .map(|mut conn| {
                    let failed = connections
                        .iter()
                        .any(|c| c.id == conn.id && c.status == ConnectionStatus::Error);
                    if failed && conn.status == ConnectionStatus::Disconnected {
                        conn.status = ConnectionStatus::Error;
                    }
                    conn
                })
                .collect();
            *connections = merged.clone();
            merged
        };

        if let Some(active) = self.active_id() {
            if !merged.iter().any(|c| c.id == active && c.is_connected()) {
                log::info!("Active connection {} is no longer available", active);
                self.clear_active_if(&active);
            }
        }
        Ok(merged)
    }

    /// Register a new connection. It starts out disconnected.
    pub async fn add(
        &self,
        name: &str,
        endpoints: Vec<String>,
        credentials: Option<Credentials>,
    ) -> StoreResult<Connection> {
        validate_connection_name(name)?;
        validate_endpoints(&endpoints)?;

        let (username, password) = match credentials {
            Some(c) => (Some(c.username), Some(c.password)),
            None => (None, None),
        };
        let mut conn = self
            .store
            .create_connection(AddConnectionRequest {
                name: name.to_string(),
                endpoints,
                username,
                password,
            })
            .await?;
        conn.status = ConnectionStatus::Disconnected;
        log::info!("Added connection {} ({})", conn.name, conn.id);
        self.upsert(conn.clone());
        Ok(conn)
    }

    pub async fn update(&self, id: &str, update: ConnectionUpdate) -> StoreResult<Connection> {
        if let Some(name) = update.name.as_deref() {
            validate_connection_name(name)?;
        }
        if let Some(endpoints) = update.endpoints.as_deref() {
            validate_endpoints(endpoints)?;
        }
        self.require_known(id)?;

        let (username, password) = match update.credentials {
            Some(c) => (Some(c.username), Some(c.password)),
            None => (None, None),
        };
        let conn = self
            .store
            .update_connection(UpdateConnectionRequest {
                id: id.to_string(),
                name: update.name,
                endpoints: update.endpoints,
                username,
                password,
            })
            .await?;
        self.upsert(conn.clone());
        Ok(conn)
    }

    /// Connect through the remote service.
    ///
    /// On failure the record stays in the list with `error` status and the
    /// failure is returned.
    pub async fn connect(&self, id: &str) -> StoreResult<Connection> {
        self.require_known(id)?;
        match self.store.connect(id).await {
            Ok(conn) => {
                log::info!("Connected {} ({})", conn.name, conn.id);
                self.upsert(conn.clone());
                Ok(conn)
            }
            Err(e) => {
                log::warn!("Failed to connect {}: {}", id, e);
                self.set_status(id, ConnectionStatus::Error);
                Err(e)
            }
        }
    }

    /// Disconnect through the remote service. Clears the active selection if
    /// it was this connection, whether or not the call succeeds.
    pub async fn disconnect(&self, id: &str) -> StoreResult<Connection> {
        self.require_known(id)?;
        let result = self.store.disconnect(id).await;
        match &result {
            Ok(conn) => {
                log::info!("Disconnected {} ({})", conn.name, conn.id);
                self.upsert(conn.clone());
            }
            Err(e) => {
                log::warn!("Failed to disconnect {}: {}", id, e);
                self.set_status(id, ConnectionStatus::Error);
            }
        }
        self.clear_active_if(id);
        result
    }

    pub async fn remove(&self, id: &str) -> StoreResult<()> {
        self.require_known(id)?;
        self.store.delete_connection(id).await?;
        self.connections.lock().retain(|c| c.id != id);
        if self.clear_active_if(id) {
            log::info!("Removed active connection {}", id);
        } else {
            log::info!("Removed connection {}", id);
        }
        Ok(())
    }

    /// Choose the connection to browse, or none.
    ///
    /// Only a known, connected connection can become active.
    pub fn set_active(&self, id: Option<&str>) -> StoreResult<()> {
        if let Some(id) = id {
            let conn = self.get(id).ok_or_else(|| {
                StoreError::InvalidState(format!("cannot activate unknown connection {}", id))
            })?;
            if !conn.is_connected() {
                return Err(StoreError::InvalidState(format!(
                    "connection {} is {}, connect it first",
                    conn.name,
                    conn.status.display_name()
                )));
            }
        }
        let id = id.map(str::to_string);
        log::info!("Active connection: {}", id.as_deref().unwrap_or("none"));
        self.active.send_replace(id);
        Ok(())
    }
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
