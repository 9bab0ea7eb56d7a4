use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ConfigError, Result as CoreResult, SessionError};
use crate::session::{SessionId, SessionRecord};

/// Trait for session storage backends.
///
/// Implementations are shared by every in-flight request and must be safe
/// for concurrent use. Connectivity problems are reported as
/// `SessionError::StoreUnavailable`; they are never swallowed here.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a live record. Expired records are reported as absent even if
    /// they have not been purged yet.
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionError>;

    /// Insert or atomically replace the record stored under `record.id`.
    async fn upsert(&self, record: &SessionRecord) -> Result<(), SessionError>;

    /// Remove a record. Removing an unknown id succeeds.
    async fn delete(&self, id: &SessionId) -> Result<(), SessionError>;

    /// Purge every expired record and return how many were removed.
    async fn delete_expired(&self) -> Result<usize, SessionError>;

    /// Backend label used in log lines.
    fn name(&self) -> &'static str;
}

/// Shared handle to a store, created once at startup.
pub type SessionStoreRef = Arc<dyn SessionStore>;

/// Build the store selected by configuration.
pub async fn build_store(config: &crate::config::StoreConfig) -> CoreResult<SessionStoreRef> {
    use crate::config::StoreBackend;

    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(super::memory_store::MemorySessionStore::new())),
        #[cfg(feature = "file-backend")]
        StoreBackend::File => {
            let store = super::file_store::FileSessionStore::open(config.directory_path()).await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "dynamodb-backend")]
        StoreBackend::Dynamodb => {
            let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            let client = aws_sdk_dynamodb::Client::new(&aws);
            Ok(Arc::new(super::dynamo_store::DynamoSessionStore::new(
                client,
                config.table_name.clone(),
            )))
        }
        #[allow(unreachable_patterns)]
        other => Err(ConfigError::Invalid(format!(
            "{:?} backend not compiled in; rebuild with the matching feature",
            other
        ))
        .into()),
    }
}
