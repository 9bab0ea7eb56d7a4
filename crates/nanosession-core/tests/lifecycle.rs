//! Session lifecycle against the file backend, the default persistent store.

#[cfg(feature = "file-backend")]
mod lifecycle_tests {
    use std::sync::Arc;

    use serde_json::json;

    use nanosession_core::config::{Config, SessionConfig, StoreBackend, StoreConfig};
    use nanosession_core::session::file_store::FileSessionStore;
    use nanosession_core::session::store::build_store;
    use nanosession_core::session::{CloseAction, SessionManager, SessionOutcome, SessionStore};

    fn cookie_for(outcome: &SessionOutcome) -> String {
        let c = outcome.cookie.as_ref().unwrap();
        format!("{}={}", c.name(), c.value())
    }

    async fn manager(dir: &std::path::Path) -> (SessionManager, Arc<FileSessionStore>) {
        let store = Arc::new(FileSessionStore::open(dir).await.unwrap());
        (
            SessionManager::new(store.clone(), SessionConfig::default()),
            store,
        )
    }

    #[tokio::test]
    async fn test_login_logout_cycle() {
        let tmp = tempfile::tempdir().unwrap();
        let (manager, store) = manager(tmp.path()).await;

        // Anonymous visitor builds up some state
        let mut session = manager.open(None).await.unwrap();
        session.insert("cart", json!({"items": [{"sku": "A1", "qty": 2}]}));
        let anon = manager.close(session).await.unwrap();
        let anon_id = anon.id.clone().unwrap();

        // Login keeps the data but never the identifier
        let mut session = manager.open(Some(&cookie_for(&anon))).await.unwrap();
        session.login(manager.principal_key(), "alice");
        let authed = manager.close(session).await.unwrap();
        let authed_id = authed.id.clone().unwrap();
        assert_ne!(anon_id, authed_id);
        assert!(store.get(&anon_id).await.unwrap().is_none());

        // Nested mutation is only saved after mark_modified
        let mut session = manager.open(Some(&cookie_for(&authed))).await.unwrap();
        assert_eq!(session.get_as::<String>("username").as_deref(), Some("alice"));
        if let Some(cart) = session.get_mut("cart") {
            cart["items"][0]["qty"] = json!(3);
        }
        session.mark_modified();
        let saved = manager.close(session).await.unwrap();
        assert_eq!(saved.action, CloseAction::Persist);
        assert_eq!(saved.id.as_ref(), Some(&authed_id));

        let session = manager.open(Some(&cookie_for(&authed))).await.unwrap();
        assert_eq!(session.get("cart").unwrap()["items"][0]["qty"], json!(3));

        // Logout
        let mut session = session;
        session.clear();
        let out = manager.close(session).await.unwrap();
        assert_eq!(out.action, CloseAction::Delete);
        assert!(store.get(&authed_id).await.unwrap().is_none());
        let fresh = manager.open(Some(&cookie_for(&authed))).await.unwrap();
        assert!(fresh.id().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_requests_on_one_session() {
        let tmp = tempfile::tempdir().unwrap();
        let (manager, store) = manager(tmp.path()).await;

        let mut session = manager.open(None).await.unwrap();
        session.insert("counter", 0);
        let first = manager.close(session).await.unwrap();
        let header = cookie_for(&first);

        let mut handles = Vec::new();
        for i in 1..=8 {
            let manager = manager.clone();
            let header = header.clone();
            handles.push(tokio::spawn(async move {
                let mut session = manager.open(Some(&header)).await.unwrap();
                session.insert("counter", i);
                session.insert("writer", format!("req-{i}"));
                manager.close(session).await.unwrap()
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap().action, CloseAction::Persist);
        }

        let session = manager.open(Some(&header)).await.unwrap();
        let counter: i64 = session.get_as("counter").unwrap();
        let writer: String = session.get_as("writer").unwrap();
        // Whole-record last-writer-wins: both fields come from one request
        assert_eq!(writer, format!("req-{counter}"));
        assert!(store.get(first.id.as_ref().unwrap()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_build_store_from_config() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.store = StoreConfig {
            backend: StoreBackend::File,
            directory: tmp.path().join("s").display().to_string(),
            ..StoreConfig::default()
        };
        let store = build_store(&cfg.store).await.unwrap();
        assert_eq!(store.name(), "file");
        assert!(tmp.path().join("s").is_dir());

        cfg.store.backend = StoreBackend::Memory;
        assert_eq!(build_store(&cfg.store).await.unwrap().name(), "memory");
    }
}
