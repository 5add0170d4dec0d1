//! Auth session context.
//!
//! A [`Session`] is built once at startup from durable storage and handed to
//! whoever needs the token (the HTTP client, the registration flow). Login
//! replaces the token wholesale and logout clears it; both write through to
//! the store.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::storage::{KeyValueStore, MemoryKeyValueStore, StorageError};

/// Storage key holding the auth token.
pub const TOKEN_KEY: &str = "token";

/// Which screen a caller should start on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartView {
    /// No token: registration / login.
    Register,
    /// Token present: the movie list.
    Movies,
}

/// Cheaply cloneable handle to the current auth token.
#[derive(Clone)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
    store: Arc<dyn KeyValueStore>,
}

impl Session {
    /// Restore the session persisted in `store`.
    pub fn restore(store: Arc<dyn KeyValueStore>) -> Result<Self, StorageError> {
        let token = store.get(TOKEN_KEY)?.filter(|t| !t.is_empty());
        if token.is_some() {
            info!("Restored persisted session");
        }
        Ok(Self {
            token: Arc::new(RwLock::new(token)),
            store,
        })
    }

    /// An empty session backed by memory only.
    pub fn in_memory() -> Self {
        Self {
            token: Arc::new(RwLock::new(None)),
            store: Arc::new(MemoryKeyValueStore::new()),
        }
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub async fn start_view(&self) -> StartView {
        if self.is_authenticated().await {
            StartView::Movies
        } else {
            StartView::Register
        }
    }

    /// Replace the current token and persist it.
    pub async fn establish(&self, token: &str) -> Result<(), StorageError> {
        let mut current = self.token.write().await;
        self.store.set(TOKEN_KEY, token)?;
        *current = Some(token.to_string());
        info!("Session established");
        Ok(())
    }

    /// Drop the current token and remove it from storage.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let mut current = self.token.write().await;
        self.store.remove(TOKEN_KEY)?;
        *current = None;
        info!("Session cleared");
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}
