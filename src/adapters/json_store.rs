use crate::adapters::memory_store::{MemoryStore, StoreSnapshot};
use crate::domain::model::{Hanger, Item};
use crate::domain::ports::EntityStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Entity store backed by a JSON document on disk.
///
/// Reads are served from memory. Every write is applied in memory and then
/// flushed as a whole file (temp file + rename); if the flush fails the
/// in-memory change is rolled back so callers observe all-or-nothing writes.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let snapshot = if tokio::fs::try_exists(&path).await? {
            let data = tokio::fs::read(&path).await?;
            serde_json::from_slice::<StoreSnapshot>(&data)?
        } else {
            tracing::warn!("Store file {} not found, starting empty", path.display());
            StoreSnapshot::default()
        };

        tracing::info!(
            "Loaded {} items and {} hangers from {}",
            snapshot.items.len(),
            snapshot.hangers.len(),
            path.display()
        );

        Ok(Self {
            path,
            inner: MemoryStore::from_snapshot(snapshot)?,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.inner.snapshot().await
    }

    async fn flush(&self) -> Result<()> {
        let snapshot = self.inner.snapshot().await;
        let data = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &data).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        tracing::debug!("Store flushed ({} bytes) to {}", data.len(), self.path.display());
        Ok(())
    }

    async fn persist_after<F, Fut>(&self, write: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<()>>,
    {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;

        write().await?;

        if let Err(e) = self.flush().await {
            tracing::error!("Store flush failed, rolling back: {}", e);
            self.inner.restore(before).await?;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for JsonFileStore {
    async fn find_item_by_tag(&self, tag_id: &str) -> Result<Option<Item>> {
        self.inner.find_item_by_tag(tag_id).await
    }

    async fn find_hanger_by_tag(&self, tag_id: &str) -> Result<Option<Hanger>> {
        self.inner.find_hanger_by_tag(tag_id).await
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<Item>> {
        self.inner.get_item(item_id).await
    }

    async fn set_item_tag(&self, item_id: &str, tag_id: &str) -> Result<()> {
        self.persist_after(|| self.inner.set_item_tag(item_id, tag_id))
            .await
    }

    async fn set_item_hanger(&self, item_id: &str, hanger_id: &str) -> Result<()> {
        self.persist_after(|| self.inner.set_item_hanger(item_id, hanger_id))
            .await
    }
}
