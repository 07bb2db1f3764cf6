// src/store.rs
//! Durable key-value storage for session records.
//!
//! Writes are full-record replaces guarded by the record's `version`: a store
//! accepts a write only if the stored version still equals the version the
//! writer read (0 for a record that does not exist yet), then bumps it.
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{watch, RwLock};
use tracing::debug;

use crate::error::{Result, SessionError};
use crate::models::SessionRecord;

/// Push notifications for one session. Holds `None` once the session is deleted.
pub type Subscription = watch::Receiver<Option<SessionRecord>>;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>>;

    /// Creates or replaces the record, or deletes it when `record` is `None`.
    /// Returns the stored version. Fails with `SessionError::Conflict` if the
    /// record changed since it was read.
    async fn put(&self, session_id: &str, record: Option<SessionRecord>) -> Result<u64>;

    /// Change notifications, if the backend supports them. Callers must keep
    /// working with `get` alone.
    async fn subscribe(&self, _session_id: &str) -> Option<Subscription> {
        None
    }
}

/// Single-process store. Also serves as the local fallback when no database
/// is configured.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, watch::Sender<Option<SessionRecord>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .and_then(|tx| tx.borrow().clone()))
    }

    async fn put(&self, session_id: &str, record: Option<SessionRecord>) -> Result<u64> {
        let mut sessions = self.sessions.write().await;
        let current = sessions
            .get(session_id)
            .and_then(|tx| tx.borrow().as_ref().map(|r| r.version));

        let Some(mut record) = record else {
            if let Some(tx) = sessions.remove(session_id) {
                tx.send_replace(None);
                debug!(session_id, "session deleted");
            }
            return Ok(0);
        };

        if current.unwrap_or(0) != record.version {
            return Err(SessionError::Conflict(session_id.to_string()));
        }
        record.version += 1;
        let version = record.version;

        match sessions.get(session_id) {
            Some(tx) => {
                tx.send_replace(Some(record));
            }
            None => {
                let (tx, _) = watch::channel(Some(record));
                sessions.insert(session_id.to_string(), tx);
            }
        }
        debug!(session_id, version, "session stored");
        Ok(version)
    }

    async fn subscribe(&self, session_id: &str) -> Option<Subscription> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(watch::Sender::subscribe)
    }
}
