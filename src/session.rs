//! Authenticated session: durable storage behind a trait, cached in memory.

use chrono::{DateTime, Utc};
use std::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Token and identity always travel together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_identifier: String,
    pub established_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session token must not be empty")]
    EmptyToken,
    #[error("session user identifier must not be empty")]
    EmptyIdentity,
}

#[derive(Debug, thiserror::Error)]
#[error("session storage failure: {0}")]
pub struct StorageError(pub String);

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError(e.to_string())
    }
}

/// Durable backend for the session. Only the [`SessionStore`] talks to it.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<Session>, StorageError>;
    fn save(&self, session: &Session) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Non-durable backend for tests and ephemeral shells.
#[derive(Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        *self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}

/// Single source of truth for "is a user logged in".
pub struct SessionStore {
    storage: Box<dyn SessionStorage>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Wrap a backend. Nothing is read until [`SessionStore::load`].
    pub fn new(storage: impl SessionStorage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            current: RwLock::new(None),
        }
    }

    /// In-memory store, no durability.
    pub fn in_memory() -> Self {
        Self::new(MemorySessionStorage::new())
    }

    /// Populate the cache from durable storage. Any storage error means "no session".
    pub fn load(&self) -> Option<Session> {
        let loaded = match self.storage.load() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "could not read stored session, starting signed out");
                None
            }
        };

        match &loaded {
            Some(s) => info!(user = %s.user_identifier, "restored session"),
            None => info!("no stored session"),
        }

        *self.write() = loaded.clone();
        loaded
    }

    pub fn set_session(
        &self,
        token: impl Into<String>,
        user_identifier: impl Into<String>,
    ) -> Result<Session, SessionError> {
        let token = token.into();
        let user_identifier = user_identifier.into();
        if token.trim().is_empty() {
            return Err(SessionError::EmptyToken);
        }
        if user_identifier.trim().is_empty() {
            return Err(SessionError::EmptyIdentity);
        }

        let session = Session {
            token,
            user_identifier,
            established_at: Utc::now(),
        };

        let mut current = self.write();
        // A session that cannot be persisted still applies for this run.
        if let Err(e) = self.storage.save(&session) {
            error!(error = %e, "failed to persist session");
        }
        *current = Some(session.clone());
        drop(current);

        info!(user = %session.user_identifier, "session established");
        Ok(session)
    }

    /// Drop the session. Returns whether one was present.
    ///
    /// The in-memory state is cleared even when the backend fails.
    pub fn clear(&self) -> bool {
        let mut current = self.write();
        let previous = current.take();
        self.clear_storage();
        drop(current);

        match &previous {
            Some(s) => info!(user = %s.user_identifier, "session cleared"),
            None => info!("session clear requested with no active session"),
        }
        previous.is_some()
    }

    /// Drop the session only if it still carries `token`.
    ///
    /// A session established after `token` was issued is left alone.
    pub fn clear_if_token(&self, token: &str) -> bool {
        let mut current = self.write();
        match current.as_ref() {
            Some(s) if s.token == token => {}
            Some(_) => {
                debug!("session token changed since the request, keeping the newer session");
                return false;
            }
            None => return false,
        }
        let previous = current.take();
        self.clear_storage();
        drop(current);

        if let Some(s) = &previous {
            info!(user = %s.user_identifier, "session cleared");
        }
        previous.is_some()
    }

    fn clear_storage(&self) {
        if let Err(e) = self.storage.clear() {
            error!(error = %e, "failed to clear stored session");
        }
    }

    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.token.clone())
    }

    pub fn current(&self) -> Option<Session> {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
