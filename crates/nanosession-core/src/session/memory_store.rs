use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use super::store::SessionStore;
use super::{SessionId, SessionRecord};
use crate::error::SessionError;

/// In-process session store for tests and single-node development.
///
/// Records live only as long as the process; every request still goes
/// through the store, so it is the single source of truth like any other
/// backend.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    records: DashMap<SessionId, SessionRecord>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, expired ones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Raw lookup that skips expiry filtering.
    pub fn contains(&self, id: &SessionId) -> bool {
        self.records.contains_key(id)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionError> {
        let now = Utc::now();
        Ok(self
            .records
            .get(id)
            .map(|entry| entry.value().clone())
            .filter(|record| !record.is_expired_at(now)))
    }

    async fn upsert(&self, record: &SessionRecord) -> Result<(), SessionError> {
        self.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionError> {
        self.records.remove(id);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<usize, SessionError> {
        let now = Utc::now();
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired_at(now));
        let removed = before.saturating_sub(self.records.len());
        debug!("Purged {} expired sessions from memory", removed);
        Ok(removed)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
