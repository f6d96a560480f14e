//! In-memory session registry for the web UI.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::error::Error;
use crate::Result;

use super::Session;

/// Sessions keyed by id. Nothing is persisted.
pub struct SessionStore {
    greeting: String,
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            greeting: greeting.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a fresh session seeded with the greeting.
    pub async fn create(&self) -> Arc<Mutex<Session>> {
        let session = Session::new(&self.greeting);
        let id = session.id().to_string();
        let handle = Arc::new(Mutex::new(session));

        self.sessions.write().await.insert(id.clone(), handle.clone());
        info!("Session {} started", id);
        handle
    }

    pub async fn get(&self, id: &str) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownSession(id.to_string()))
    }

    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!("Session {} ended", id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
