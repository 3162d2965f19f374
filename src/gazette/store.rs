//! Last-seen watermark storage
//!
//! The watermark is a single scalar: the number of the last edition for which
//! a notification went out. Only the latest value is kept.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::gazette::PublicationId;
use crate::gazette::error::CrawlError;

/// Read/write access to the last notified edition number
pub trait LastSeenStore: Send + Sync {
    /// Current watermark; absent state reads as [`PublicationId::ZERO`]
    fn read(&self) -> impl Future<Output = Result<PublicationId, CrawlError>> + Send;

    /// Overwrite the watermark
    fn write(&self, id: PublicationId) -> impl Future<Output = Result<(), CrawlError>> + Send;
}

/// Watermark kept in a plain text file
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn initialize(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        self.replace(PublicationId::ZERO).await
    }

    /// Hidden sibling the new value is staged in before the rename
    fn staging_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!(".{}.tmp", name))
    }

    /// Swap in `id` with a rename, so readers see the old or the new value
    async fn replace(&self, id: PublicationId) -> io::Result<()> {
        let staging = self.staging_path();

        let mut file = fs::File::create(&staging).await?;
        file.write_all(id.to_string().as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&staging, &self.path).await
    }
}

impl LastSeenStore for FileStore {
    async fn read(&self) -> Result<PublicationId, CrawlError> {
        if !fs::try_exists(&self.path).await.map_err(|e| persist(&self.path, e))? {
            info!(path = %self.path.display(), "No watermark found, initializing to 0");
            self.initialize().await.map_err(|e| persist(&self.path, e))?;
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| persist(&self.path, e))?;

        content.trim().parse::<PublicationId>().map_err(|_| {
            CrawlError::Persist(format!(
                "{} holds {:?}, which is not a publication number",
                self.path.display(),
                content
            ))
        })
    }

    async fn write(&self, id: PublicationId) -> Result<(), CrawlError> {
        self.replace(id).await.map_err(|e| persist(&self.path, e))?;
        debug!(path = %self.path.display(), publication = %id, "Watermark written");
        Ok(())
    }
}

fn persist(path: &Path, err: io::Error) -> CrawlError {
    CrawlError::Persist(format!("{}: {}", path.display(), err))
}

/// In-memory watermark, shared across clones
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    value: Arc<Mutex<Option<PublicationId>>>,
}

impl MemoryStore {
    /// Empty store, as on a first run
    pub fn new() -> Self {
        Self::default()
    }

    /// Store already holding `id`
    pub fn with_value(id: PublicationId) -> Self {
        Self {
            value: Arc::new(Mutex::new(Some(id))),
        }
    }

    /// Raw stored value, `None` if never initialized
    pub async fn get(&self) -> Option<PublicationId> {
        *self.value.lock().await
    }
}

impl LastSeenStore for MemoryStore {
    async fn read(&self) -> Result<PublicationId, CrawlError> {
        let mut guard = self.value.lock().await;
        Ok(*guard.get_or_insert(PublicationId::ZERO))
    }

    async fn write(&self, id: PublicationId) -> Result<(), CrawlError> {
        *self.value.lock().await = Some(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_store_initializes_missing_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_dom");
        let store = FileStore::new(&path);

        assert_eq!(store.read().await.unwrap(), PublicationId::ZERO);
        // absence is materialized, not silently ignored
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0");
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state").join("last_dom"));

        store.read().await.unwrap();
        store.write(PublicationId::new(1500)).await.unwrap();

        assert_eq!(store.read().await.unwrap(), PublicationId::new(1500));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "1500");
    }

    #[tokio::test]
    async fn test_file_store_tolerates_trailing_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_dom");
        std::fs::write(&path, "1499\n").unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.read().await.unwrap(), PublicationId::new(1499));
    }

    #[tokio::test]
    async fn test_file_store_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_dom");
        std::fs::write(&path, "DOM Nº 12").unwrap();

        let result = FileStore::new(&path).read().await;
        assert!(matches!(result, Err(CrawlError::Persist(_))));
    }

    #[tokio::test]
    async fn test_file_store_write_leaves_no_staging_file() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("last_dom"));

        store.read().await.unwrap();
        store.write(PublicationId::new(1501)).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("last_dom")]);
    }

    #[tokio::test]
    async fn test_file_store_failed_write_keeps_previous_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_dom");
        std::fs::write(&path, "1499").unwrap();
        // staging cannot be created when a directory sits in its place
        std::fs::create_dir(dir.path().join(".last_dom.tmp")).unwrap();

        let store = FileStore::new(&path);
        let result = store.write(PublicationId::new(1500)).await;

        assert!(matches!(result, Err(CrawlError::Persist(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1499");
        assert_eq!(store.read().await.unwrap(), PublicationId::new(1499));
    }

    #[tokio::test]
    async fn test_file_store_write_failure() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("missing").join("last_dom"));

        let result = store.write(PublicationId::new(3)).await;
        assert!(matches!(result, Err(CrawlError::Persist(_))));
    }

    #[test]
    fn test_memory_store() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            assert_eq!(store.get().await, None);

            assert_eq!(store.read().await.unwrap(), PublicationId::ZERO);
            assert_eq!(store.get().await, Some(PublicationId::ZERO));

            let shared = store.clone();
            shared.write(PublicationId::new(9)).await.unwrap();
            assert_eq!(store.read().await.unwrap(), PublicationId::new(9));
        });
    }
}
