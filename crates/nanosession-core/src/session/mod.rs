pub mod id;
pub mod manager;
pub mod memory_store;
pub mod store;

#[cfg(feature = "file-backend")]
pub mod file_store;

#[cfg(feature = "dynamodb-backend")]
pub mod dynamo_store;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::codec::Payload;

pub use id::SessionId;
pub use manager::{CloseAction, SessionManager, SessionOutcome};
pub use store::SessionStore;

/// Persisted unit owned by a [`SessionStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: SessionId,
    /// Codec-encoded payload.
    pub data: Vec<u8>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(id: SessionId, data: Vec<u8>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id,
            data,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Request-scoped session state.
///
/// Mutations through `insert`, `remove` and `clear` are tracked. Values
/// changed in place through [`Session::get_mut`] are not: call
/// [`Session::mark_modified`] afterwards or the change will not be saved.
#[derive(Debug, Clone, Default)]
pub struct Session {
    id: Option<SessionId>,
    data: Payload,
    modified: bool,
    rotate: bool,
    invalidated: bool,
    expires_at: Option<DateTime<Utc>>,
    loaded_principal: Option<Value>,
}

impl Session {
    /// Empty anonymous session with no identifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session hydrated from a stored record.
    pub(crate) fn loaded(
        id: SessionId,
        data: Payload,
        expires_at: DateTime<Utc>,
        principal_key: &str,
    ) -> Self {
        let loaded_principal = data.get(principal_key).filter(|v| !v.is_null()).cloned();
        Self {
            id: Some(id),
            data,
            modified: false,
            rotate: false,
            invalidated: false,
            expires_at: Some(expires_at),
            loaded_principal,
        }
    }

    pub fn id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    /// Expiry of the record this session was loaded from.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Typed read; `None` if absent or not convertible to `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Mutable access for in-place edits of nested values. Not tracked.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.data.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.modified = true;
        self.data.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Drop every entry. An empty session is deleted from the store on close.
    ///
    /// Clearing a stored session also retires its identifier: anything
    /// inserted afterwards is saved under a fresh one.
    pub fn clear(&mut self) {
        if !self.data.is_empty() {
            self.data.clear();
            self.modified = true;
            self.invalidated = self.id.is_some();
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn data(&self) -> &Payload {
        &self.data
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Bind an authenticated principal and request a fresh identifier.
    ///
    /// `principal_key` must match the manager's configured principal key.
    pub fn login(&mut self, principal_key: &str, principal: impl Into<Value>) {
        self.insert(principal_key, principal);
        self.rotate = true;
    }

    /// Request a fresh identifier on close without touching the data.
    pub fn cycle_id(&mut self) {
        self.rotate = true;
    }

    pub(crate) fn rotation_requested(&self) -> bool {
        self.rotate
    }

    pub(crate) fn invalidated(&self) -> bool {
        self.invalidated
    }

    pub(crate) fn loaded_principal(&self) -> Option<&Value> {
        self.loaded_principal.as_ref()
    }
}
