//! Session lifecycle: load on request, reconcile with the store on response.
//!
//! ```text
//! open:   NEW (no cookie, bad id, absent/expired/corrupt record) | LOADED
//! close:  empty            -> DELETE (had id) | NO-OP (no id)
//!         unchanged        -> NO-OP | REFRESH (refresh_on_read)
//!         modified / login -> PERSIST (rotating the id when required)
//!         cleared + refilled -> PERSIST under a fresh id
//! ```
//!
//! Under the fail-open policy a store outage during `open` yields a NEW
//! session and during `close` yields DEGRADED (no store write, no cookie
//! change). Under fail-closed both surface `StoreUnavailable`.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cookie::time::{Duration as CookieDuration, OffsetDateTime};
use cookie::Cookie;
use tracing::{debug, info, warn};

use super::store::SessionStore;
use super::{Session, SessionId, SessionRecord};
use crate::codec;
use crate::config::{FailPolicy, SessionConfig};
use crate::error::SessionError;

/// Terminal action taken by [`SessionManager::close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    NoOp,
    Persist,
    /// Unchanged session re-saved to push its expiry forward.
    Refresh,
    Delete,
    /// Store unavailable under fail-open; nothing written.
    Degraded,
}

/// Result of closing a session: what happened and the cookie to send back.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub action: CloseAction,
    /// Cookie to set (or a removal cookie). `None` leaves the client's cookie alone.
    pub cookie: Option<Cookie<'static>>,
    /// Identifier the session is stored under after close, if any.
    pub id: Option<SessionId>,
}

impl SessionOutcome {
    fn bare(action: CloseAction) -> Self {
        Self {
            action,
            cookie: None,
            id: None,
        }
    }

    /// Rendered `Set-Cookie` header value, if the response needs one.
    pub fn set_cookie_header(&self) -> Option<String> {
        self.cookie.as_ref().map(|c| c.to_string())
    }
}

/// Orchestrates the per-request session lifecycle.
///
/// Holds no per-request state; clone it freely into request handlers.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    config: Arc<SessionConfig>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Principal key handlers should pass to [`Session::login`].
    pub fn principal_key(&self) -> &str {
        &self.config.principal_key
    }

    /// Load the session referenced by the request's `Cookie` header.
    ///
    /// Only returns an error for `StoreUnavailable` under fail-closed.
    pub async fn open(&self, cookie_header: Option<&str>) -> Result<Session, SessionError> {
        let Some(raw) = cookie_header.and_then(|h| self.find_cookie(h)) else {
            return Ok(Session::new());
        };

        let id = match SessionId::parse(&raw) {
            Ok(id) => id,
            Err(e) => {
                debug!("Ignoring session cookie: {}", e);
                return Ok(Session::new());
            }
        };

        let record = match self.guarded("get", self.store.get(&id)).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("Session {} not found or expired", id.short());
                return Ok(Session::new());
            }
            Err(e) if e.is_recoverable() => {
                warn!("Unreadable session record {}: {}", id.short(), e);
                return Ok(Session::new());
            }
            Err(e) => return self.on_store_failure("open", e).map(|_| Session::new()),
        };

        match codec::decode(&record.data) {
            Ok(data) => {
                debug!("Loaded session {}", id.short());
                Ok(Session::loaded(
                    id,
                    data,
                    record.expires_at,
                    &self.config.principal_key,
                ))
            }
            Err(e) => {
                warn!("Undecodable session payload {}: {}", id.short(), e);
                Ok(Session::new())
            }
        }
    }

    /// Reconcile the session with the store and produce the response cookie.
    ///
    /// Only returns an error for `StoreUnavailable` under fail-closed.
    pub async fn close(&self, session: Session) -> Result<SessionOutcome, SessionError> {
        match self.reconcile(&session).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => self
                .on_store_failure("close", e)
                .map(|_| SessionOutcome::bare(CloseAction::Degraded)),
        }
    }

    /// Actively remove expired records from the store.
    pub async fn purge_expired(&self) -> Result<usize, SessionError> {
        let removed = self
            .guarded("delete_expired", self.store.delete_expired())
            .await?;
        if removed > 0 {
            info!("Purged {} expired sessions ({})", removed, self.store.name());
        }
        Ok(removed)
    }

    async fn reconcile(&self, session: &Session) -> Result<SessionOutcome, SessionError> {
        if session.is_empty() {
            return match session.id() {
                Some(id) => {
                    self.guarded("delete", self.store.delete(id)).await?;
                    debug!("Deleted session {}", id.short());
                    Ok(SessionOutcome {
                        action: CloseAction::Delete,
                        cookie: Some(self.removal_cookie()),
                        id: None,
                    })
                }
                None => Ok(SessionOutcome::bare(CloseAction::NoOp)),
            };
        }

        let rotate = self.needs_rotation(session);

        if let Some(id) = session.id() {
            if !session.is_modified() && !rotate {
                if !self.config.refresh_on_read {
                    return Ok(SessionOutcome {
                        action: CloseAction::NoOp,
                        cookie: None,
                        id: Some(id.clone()),
                    });
                }
                let expires_at = self.persist(id, session).await?;
                debug!("Refreshed session {}", id.short());
                return Ok(SessionOutcome {
                    action: CloseAction::Refresh,
                    cookie: Some(self.session_cookie(id, expires_at)),
                    id: Some(id.clone()),
                });
            }
        }

        let id = match session.id() {
            Some(old) if rotate => {
                self.guarded("delete", self.store.delete(old)).await?;
                let fresh = SessionId::random();
                debug!("Rotated session {} -> {}", old.short(), fresh.short());
                fresh
            }
            Some(current) => current.clone(),
            None => SessionId::random(),
        };

        let expires_at = self.persist(&id, session).await?;
        debug!("Persisted session {}", id.short());
        Ok(SessionOutcome {
            action: CloseAction::Persist,
            cookie: Some(self.session_cookie(&id, expires_at)),
            id: Some(id),
        })
    }

    /// Whether the identifier must change before persisting.
    ///
    /// A switch from one principal to a different one always rotates so one
    /// identifier never carries two identities. So does a cleared session
    /// that was refilled in the same request.
    fn needs_rotation(&self, session: &Session) -> bool {
        if session.id().is_none() {
            return false;
        }
        if session.invalidated() {
            return true;
        }
        let current = session
            .get(&self.config.principal_key)
            .filter(|v| !v.is_null());
        match (session.loaded_principal(), current) {
            (Some(before), Some(after)) if before != after => return true,
            (None, Some(_)) if self.config.rotate_on_login => return true,
            _ => {}
        }
        session.rotation_requested() && self.config.rotate_on_login
    }

    async fn persist(
        &self,
        id: &SessionId,
        session: &Session,
    ) -> Result<DateTime<Utc>, SessionError> {
        let data = codec::encode(session.data())?;
        let expires_at = Utc::now() + self.config.lifetime();
        let record = SessionRecord::new(id.clone(), data, expires_at);
        self.guarded("upsert", self.store.upsert(&record)).await?;
        Ok(expires_at)
    }

    /// Bound a store call by the configured timeout.
    async fn guarded<T, F>(&self, op: &'static str, fut: F) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, SessionError>>,
    {
        match tokio::time::timeout(self.config.store_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::StoreUnavailable(format!(
                "{} {} timed out after {}ms",
                self.store.name(),
                op,
                self.config.store_timeout_ms
            ))),
        }
    }

    fn on_store_failure(&self, phase: &str, err: SessionError) -> Result<(), SessionError> {
        match self.config.fail_policy {
            FailPolicy::Open => {
                warn!("Session {} degraded to anonymous: {}", phase, err);
                Ok(())
            }
            FailPolicy::Closed => Err(err),
        }
    }

    fn find_cookie(&self, header: &str) -> Option<String> {
        Cookie::split_parse(header)
            .filter_map(|c| c.ok())
            .find(|c| c.name() == self.config.cookie_name)
            .map(|c| c.value().to_string())
    }

    fn session_cookie(&self, id: &SessionId, expires_at: DateTime<Utc>) -> Cookie<'static> {
        let mut builder = Cookie::build((self.config.cookie_name.clone(), id.to_string()))
            .http_only(true)
            .secure(self.config.secure)
            .same_site(self.config.same_site.into())
            .path(self.config.cookie_path.clone())
            .max_age(CookieDuration::seconds(self.config.lifetime().num_seconds()));
        if let Ok(expires) = OffsetDateTime::from_unix_timestamp(expires_at.timestamp()) {
            builder = builder.expires(expires);
        }
        if let Some(domain) = &self.config.cookie_domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }

    fn removal_cookie(&self) -> Cookie<'static> {
        let mut builder = Cookie::build((self.config.cookie_name.clone(), ""))
            .http_only(true)
            .secure(self.config.secure)
            .same_site(self.config.same_site.into())
            .path(self.config.cookie_path.clone());
        if let Some(domain) = &self.config.cookie_domain {
            builder = builder.domain(domain.clone());
        }
        let mut cookie = builder.build();
        cookie.make_removal();
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::memory_store::MemorySessionStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config() -> SessionConfig {
        SessionConfig {
            cookie_name: "sid".to_string(),
            lifetime_secs: 3600,
            ..SessionConfig::default()
        }
    }

    fn manager_with(config: SessionConfig) -> (SessionManager, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        (SessionManager::new(store.clone(), config), store)
    }

    fn cookie_header(outcome: &SessionOutcome) -> String {
        let c = outcome.cookie.as_ref().expect("cookie");
        format!("{}={}", c.name(), c.value())
    }

    /// Store that counts writes and can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemorySessionStore,
        down: std::sync::atomic::AtomicBool,
        writes: AtomicUsize,
    }

    impl FlakyStore {
        fn check(&self) -> Result<(), SessionError> {
            if self.down.load(Ordering::SeqCst) {
                Err(SessionError::StoreUnavailable("connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl SessionStore for FlakyStore {
        async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionError> {
            self.check()?;
            self.inner.get(id).await
        }
        async fn upsert(&self, record: &SessionRecord) -> Result<(), SessionError> {
            self.check()?;
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.upsert(record).await
        }
        async fn delete(&self, id: &SessionId) -> Result<(), SessionError> {
            self.check()?;
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(id).await
        }
        async fn delete_expired(&self) -> Result<usize, SessionError> {
            self.check()?;
            self.inner.delete_expired().await
        }
        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    /// Store whose calls never complete.
    struct StalledStore;

    #[async_trait]
    impl SessionStore for StalledStore {
        async fn get(&self, _id: &SessionId) -> Result<Option<SessionRecord>, SessionError> {
            std::future::pending().await
        }
        async fn upsert(&self, _record: &SessionRecord) -> Result<(), SessionError> {
            std::future::pending().await
        }
        async fn delete(&self, _id: &SessionId) -> Result<(), SessionError> {
            std::future::pending().await
        }
        async fn delete_expired(&self) -> Result<usize, SessionError> {
            std::future::pending().await
        }
        fn name(&self) -> &'static str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_open_without_cookie_is_new() {
        let (manager, _) = manager_with(config());
        let session = manager.open(None).await.unwrap();
        assert!(session.id().is_none());
        assert!(session.is_empty());

        let session = manager.open(Some("other=1; theme=dark")).await.unwrap();
        assert!(session.id().is_none());
    }

    #[tokio::test]
    async fn test_open_with_invalid_cookie_is_new() {
        let (manager, _) = manager_with(config());
        let session = manager.open(Some("sid=../../etc/passwd")).await.unwrap();
        assert!(session.id().is_none());
    }

    #[tokio::test]
    async fn test_persist_then_load() {
        let (manager, store) = manager_with(config());
        let mut session = manager.open(None).await.unwrap();
        session.insert("cart", json!(["apple"]));
        let outcome = manager.close(session).await.unwrap();

        assert_eq!(outcome.action, CloseAction::Persist);
        assert_eq!(store.len(), 1);
        let cookie = outcome.cookie.as_ref().unwrap();
        assert_eq!(cookie.name(), "sid");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(cookie::SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(CookieDuration::seconds(3600)));
        assert!(cookie.expires_datetime().is_some());

        let header = format!("theme=dark; {}", cookie_header(&outcome));
        let loaded = manager.open(Some(&header)).await.unwrap();
        assert_eq!(loaded.id(), outcome.id.as_ref());
        assert_eq!(loaded.get("cart"), Some(&json!(["apple"])));
        assert!(!loaded.is_modified());
    }

    #[tokio::test]
    async fn test_unchanged_session_is_noop() {
        let (manager, _) = manager_with(config());
        let mut session = Session::new();
        session.insert("k", 1);
        let first = manager.close(session).await.unwrap();

        let loaded = manager.open(Some(&cookie_header(&first))).await.unwrap();
        let outcome = manager.close(loaded).await.unwrap();
        assert_eq!(outcome.action, CloseAction::NoOp);
        assert!(outcome.cookie.is_none());
        assert_eq!(outcome.id, first.id);
    }

    #[tokio::test]
    async fn test_refresh_on_read_touches_record() {
        let (manager, store) = manager_with(SessionConfig {
            refresh_on_read: true,
            ..config()
        });
        let mut session = Session::new();
        session.insert("k", 1);
        let first = manager.close(session).await.unwrap();
        let id = first.id.clone().unwrap();
        let before = store.get(&id).await.unwrap().unwrap().expires_at;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let loaded = manager.open(Some(&cookie_header(&first))).await.unwrap();
        let outcome = manager.close(loaded).await.unwrap();
        assert_eq!(outcome.action, CloseAction::Refresh);
        assert_eq!(outcome.id, Some(id.clone()));
        assert!(outcome.cookie.is_some());
        assert!(store.get(&id).await.unwrap().unwrap().expires_at > before);
    }

    #[tokio::test]
    async fn test_empty_session_never_writes() {
        let store = Arc::new(FlakyStore::default());
        let manager = SessionManager::new(store.clone(), config());

        let mut session = manager.open(None).await.unwrap();
        session.insert("temp", true);
        session.remove("temp");
        session.clear();
        let outcome = manager.close(session).await.unwrap();

        assert_eq!(outcome.action, CloseAction::NoOp);
        assert!(outcome.cookie.is_none());
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clear_deletes_record_and_cookie() {
        let (manager, store) = manager_with(config());
        let mut session = Session::new();
        session.insert("username", "alice");
        let first = manager.close(session).await.unwrap();

        let mut loaded = manager.open(Some(&cookie_header(&first))).await.unwrap();
        loaded.clear();
        let outcome = manager.close(loaded).await.unwrap();

        assert_eq!(outcome.action, CloseAction::Delete);
        assert!(store.is_empty());
        let removal = outcome.cookie.unwrap();
        assert_eq!(removal.value(), "");
        assert_eq!(removal.max_age(), Some(CookieDuration::ZERO));
    }

    #[tokio::test]
    async fn test_clear_then_insert_retires_identifier() {
        let (manager, store) = manager_with(SessionConfig {
            rotate_on_login: false,
            ..config()
        });
        let mut session = Session::new();
        session.insert("username", "alice");
        let first = manager.close(session).await.unwrap();
        let first_id = first.id.clone().unwrap();

        // Logout that leaves a flash message behind
        let mut loaded = manager.open(Some(&cookie_header(&first))).await.unwrap();
        loaded.clear();
        loaded.insert("flash", "bye");
        let outcome = manager.close(loaded).await.unwrap();

        assert_eq!(outcome.action, CloseAction::Persist);
        let new_id = outcome.id.clone().unwrap();
        assert_ne!(new_id, first_id);
        assert!(!store.contains(&first_id));
        assert_eq!(store.len(), 1);

        let stale = manager.open(Some(&cookie_header(&first))).await.unwrap();
        assert!(stale.id().is_none());
        let fresh = manager.open(Some(&cookie_header(&outcome))).await.unwrap();
        assert_eq!(fresh.get("flash"), Some(&json!("bye")));
        assert!(!fresh.contains_key("username"));
    }

    #[tokio::test]
    async fn test_login_rotates_identifier() {
        let (manager, store) = manager_with(config());
        let mut session = Session::new();
        session.insert("cart", json!([1]));
        let anon = manager.close(session).await.unwrap();
        let anon_id = anon.id.clone().unwrap();

        let mut session = manager.open(Some(&cookie_header(&anon))).await.unwrap();
        session.login(manager.principal_key(), "alice");
        let outcome = manager.close(session).await.unwrap();

        let new_id = outcome.id.clone().unwrap();
        assert_ne!(new_id, anon_id);
        assert!(!store.contains(&anon_id));
        let record = store.get(&new_id).await.unwrap().unwrap();
        let data = codec::decode(&record.data).unwrap();
        assert_eq!(data["username"], json!("alice"));
        assert_eq!(data["cart"], json!([1]));
    }

    #[tokio::test]
    async fn test_principal_appearing_rotates_without_login_helper() {
        let (manager, store) = manager_with(config());
        let mut session = Session::new();
        session.insert("theme", "dark");
        let anon = manager.close(session).await.unwrap();
        let anon_id = anon.id.clone().unwrap();

        let mut session = manager.open(Some(&cookie_header(&anon))).await.unwrap();
        session.insert("username", "alice");
        let outcome = manager.close(session).await.unwrap();
        assert_ne!(outcome.id.unwrap(), anon_id);
        assert!(!store.contains(&anon_id));
    }

    #[tokio::test]
    async fn test_principal_switch_rotates_even_when_disabled() {
        let (manager, store) = manager_with(SessionConfig {
            rotate_on_login: false,
            ..config()
        });
        let mut session = Session::new();
        session.insert("username", "alice");
        let first = manager.close(session).await.unwrap();
        let first_id = first.id.clone().unwrap();

        // Same principal, explicit login: no rotation when disabled
        let mut session = manager.open(Some(&cookie_header(&first))).await.unwrap();
        session.login("username", "alice");
        let same = manager.close(session).await.unwrap();
        assert_eq!(same.id, Some(first_id.clone()));

        // Different principal: always rotates
        let mut session = manager.open(Some(&cookie_header(&same))).await.unwrap();
        session.insert("username", "mallory");
        let switched = manager.close(session).await.unwrap();
        assert_ne!(switched.id.clone().unwrap(), first_id);
        assert!(!store.contains(&first_id));
    }

    #[tokio::test]
    async fn test_cycle_id() {
        let (manager, store) = manager_with(config());
        let mut session = Session::new();
        session.insert("k", "v");
        let first = manager.close(session).await.unwrap();
        let first_id = first.id.clone().unwrap();

        let mut session = manager.open(Some(&cookie_header(&first))).await.unwrap();
        session.cycle_id();
        let outcome = manager.close(session).await.unwrap();
        assert_eq!(outcome.action, CloseAction::Persist);
        assert_ne!(outcome.id.unwrap(), first_id);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_record_opens_anonymous() {
        let (manager, store) = manager_with(config());
        let id = SessionId::random();
        store
            .upsert(&SessionRecord::new(
                id.clone(),
                b"\x80\x04pickle".to_vec(),
                Utc::now() + chrono::Duration::hours(1),
            ))
            .await
            .unwrap();

        let session = manager.open(Some(&format!("sid={}", id))).await.unwrap();
        assert!(session.id().is_none());
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_expired_record_opens_anonymous() {
        let (manager, store) = manager_with(config());
        let id = SessionId::random();
        store
            .upsert(&SessionRecord::new(
                id.clone(),
                b"{\"username\":\"alice\"}".to_vec(),
                Utc::now() - chrono::Duration::seconds(1),
            ))
            .await
            .unwrap();

        let session = manager.open(Some(&format!("sid={}", id))).await.unwrap();
        assert!(session.id().is_none());
    }

    #[tokio::test]
    async fn test_fail_open_degrades() {
        let store = Arc::new(FlakyStore::default());
        let manager = SessionManager::new(store.clone(), config());

        let mut session = Session::new();
        session.insert("username", "alice");
        let first = manager.close(session).await.unwrap();

        store.down.store(true, Ordering::SeqCst);
        let session = manager.open(Some(&cookie_header(&first))).await.unwrap();
        assert!(session.id().is_none());

        let mut session = Session::new();
        session.insert("k", 1);
        let outcome = manager.close(session).await.unwrap();
        assert_eq!(outcome.action, CloseAction::Degraded);
        assert!(outcome.cookie.is_none());
    }

    #[tokio::test]
    async fn test_fail_closed_propagates() {
        let store = Arc::new(FlakyStore::default());
        let manager = SessionManager::new(
            store.clone(),
            SessionConfig {
                fail_policy: FailPolicy::Closed,
                ..config()
            },
        );
        store.down.store(true, Ordering::SeqCst);

        let header = format!("sid={}", SessionId::random());
        assert!(matches!(
            manager.open(Some(&header)).await,
            Err(SessionError::StoreUnavailable(_))
        ));

        let mut session = Session::new();
        session.insert("k", 1);
        assert!(matches!(
            manager.close(session).await,
            Err(SessionError::StoreUnavailable(_))
        ));

        // Nothing to do with the store: still fine when it is down
        assert!(manager.open(None).await.unwrap().is_empty());
        assert_eq!(
            manager.close(Session::new()).await.unwrap().action,
            CloseAction::NoOp
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_timeout_is_unavailable() {
        let manager = SessionManager::new(
            Arc::new(StalledStore),
            SessionConfig {
                store_timeout_ms: 50,
                fail_policy: FailPolicy::Closed,
                ..config()
            },
        );

        let header = format!("sid={}", SessionId::random());
        match manager.open(Some(&header)).await {
            Err(SessionError::StoreUnavailable(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(matches!(
            manager.purge_expired().await,
            Err(SessionError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (manager, store) = manager_with(config());
        store
            .upsert(&SessionRecord::new(
                SessionId::random(),
                b"{}".to_vec(),
                Utc::now() - chrono::Duration::seconds(10),
            ))
            .await
            .unwrap();
        assert_eq!(manager.purge_expired().await.unwrap(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_cookie_header_rendering() {
        let (manager, _) = manager_with(SessionConfig {
            cookie_domain: Some("example.com".into()),
            same_site: crate::config::SameSite::Strict,
            ..config()
        });
        let id = SessionId::random();
        let outcome = SessionOutcome {
            action: CloseAction::Persist,
            cookie: Some(manager.session_cookie(&id, Utc::now() + chrono::Duration::hours(1))),
            id: Some(id.clone()),
        };
        let header = outcome.set_cookie_header().unwrap();
        assert!(header.starts_with(&format!("sid={}", id)));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Secure"));
        assert!(header.contains("SameSite=Strict"));
        assert!(header.contains("Domain=example.com"));
        assert!(header.contains("Max-Age=3600"));
    }
}
