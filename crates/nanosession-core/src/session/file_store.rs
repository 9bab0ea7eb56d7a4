use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::SessionStore;
use super::{SessionId, SessionRecord};
use crate::error::SessionError;

/// Temp files older than this are left over from an interrupted write.
const STALE_TMP_AGE: Duration = Duration::from_secs(600);

/// On-disk document, one file per session.
#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    id: String,
    /// Base64 of the codec bytes.
    data: String,
    expires: DateTime<Utc>,
}

/// File-based session store: one JSON document per identifier.
///
/// Writes go to a uniquely named temp file that is then renamed over the
/// target, so readers and concurrent writers only ever see a complete
/// document.
pub struct FileSessionStore {
    sessions_dir: PathBuf,
}

impl FileSessionStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let sessions_dir = dir.into();
        tokio::fs::create_dir_all(&sessions_dir)
            .await
            .map_err(|e| unavailable(&sessions_dir, e))?;
        Ok(Self { sessions_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn session_path(&self, id: &SessionId) -> PathBuf {
        // Identifiers are base64url, safe as file names.
        self.sessions_dir.join(format!("{}.json", id.as_str()))
    }

    async fn read_document(path: &Path) -> Result<Option<StoredDocument>, SessionError> {
        let content = match tokio::fs::read(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(unavailable(path, e)),
        };
        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|e| SessionError::CorruptRecord(format!("{}: {}", path.display(), e)))
    }

    /// Delete a document found expired or corrupt by the sweeper.
    ///
    /// The file is renamed aside first and checked again, so a session
    /// saved after the sweeper's read survives. Returns whether the
    /// document was removed.
    async fn reap(&self, path: &Path, now: DateTime<Utc>) -> Result<bool, SessionError> {
        let aside = self
            .sessions_dir
            .join(format!(".reap.{:016x}.tmp", rand::random::<u64>()));
        match tokio::fs::rename(path, &aside).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(unavailable(path, e)),
        }

        let live = match Self::read_document(&aside).await {
            Ok(Some(doc)) => doc.expires > now,
            Ok(None) | Err(SessionError::CorruptRecord(_)) => false,
            Err(e) => {
                Self::restore(&aside, path).await?;
                return Err(e);
            }
        };
        if live {
            debug!("Session file {} was refreshed, keeping it", path.display());
            Self::restore(&aside, path).await?;
            return Ok(false);
        }
        remove_if_present(&aside).await?;
        Ok(true)
    }

    /// Move a reaped file back, unless a newer write already took its place.
    async fn restore(aside: &Path, path: &Path) -> Result<(), SessionError> {
        match tokio::fs::hard_link(aside, path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(unavailable(path, e)),
        }
        remove_if_present(aside).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionError> {
        let path = self.session_path(id);
        let Some(doc) = Self::read_document(&path).await? else {
            return Ok(None);
        };

        if doc.id != id.as_str() {
            return Err(SessionError::CorruptRecord(format!(
                "{}: id mismatch",
                path.display()
            )));
        }
        if doc.expires <= Utc::now() {
            return Ok(None);
        }
        let data = STANDARD
            .decode(doc.data.as_bytes())
            .map_err(|e| SessionError::CorruptRecord(format!("{}: {}", path.display(), e)))?;

        Ok(Some(SessionRecord::new(id.clone(), data, doc.expires)))
    }

    async fn upsert(&self, record: &SessionRecord) -> Result<(), SessionError> {
        let path = self.session_path(&record.id);
        let doc = StoredDocument {
            id: record.id.as_str().to_string(),
            data: STANDARD.encode(&record.data),
            expires: record.expires_at,
        };
        let json = serde_json::to_vec(&doc)
            .map_err(|e| SessionError::StoreUnavailable(e.to_string()))?;

        let tmp = self.sessions_dir.join(format!(
            ".{}.{:016x}.tmp",
            record.id.as_str(),
            rand::random::<u64>()
        ));
        if let Err(e) = tokio::fs::write(&tmp, &json).await {
            return Err(unavailable(&tmp, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(unavailable(&path, e));
        }
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionError> {
        remove_if_present(&self.session_path(id)).await
    }

    async fn delete_expired(&self) -> Result<usize, SessionError> {
        let mut entries = tokio::fs::read_dir(&self.sessions_dir)
            .await
            .map_err(|e| unavailable(&self.sessions_dir, e))?;
        let now = Utc::now();
        let mut removed = 0;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| unavailable(&self.sessions_dir, e))?
        {
            let path = entry.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some("json") => {}
                Some("tmp") => {
                    if is_stale(&entry).await {
                        debug!("Removing stale temp file {}", path.display());
                        remove_if_present(&path).await?;
                    }
                    continue;
                }
                _ => continue,
            }
            match Self::read_document(&path).await {
                Ok(Some(doc)) if doc.expires <= now => {
                    if self.reap(&path, now).await? {
                        removed += 1;
                    }
                }
                Ok(_) => {}
                Err(SessionError::CorruptRecord(msg)) => {
                    warn!("Removing corrupt session file: {}", msg);
                    if self.reap(&path, now).await? {
                        removed += 1;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        debug!("Purged {} expired session files", removed);
        Ok(removed)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

fn unavailable(path: &Path, e: std::io::Error) -> SessionError {
    SessionError::StoreUnavailable(format!("{}: {}", path.display(), e))
}

async fn remove_if_present(path: &Path) -> Result<(), SessionError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(unavailable(path, e)),
    }
}

async fn is_stale(entry: &tokio::fs::DirEntry) -> bool {
    entry
        .metadata()
        .await
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(|t| t.elapsed().ok())
        .is_some_and(|age| age >= STALE_TMP_AGE)
}
