use crate::domain::model::{Hanger, Item};
use crate::domain::ports::EntityStore;
use crate::utils::error::{PairingError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Serializable contents of a store: the `items` and `hangers` tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub hangers: Vec<Hanger>,
}

#[derive(Debug, Default)]
struct Tables {
    items: BTreeMap<String, Item>,
    hangers: BTreeMap<String, Hanger>,
}

impl Tables {
    fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        let mut tables = Tables::default();
        for hanger in snapshot.hangers {
            tables.hangers.insert(hanger.id.clone(), hanger);
        }
        for item in snapshot.items {
            if let Some(hanger_id) = &item.hanger_id {
                if let Some(owner) = tables.holder_of(hanger_id) {
                    return Err(PairingError::store(format!(
                        "hanger {} is assigned to both {} and {}",
                        hanger_id, owner, item.id
                    )));
                }
            }
            tables.items.insert(item.id.clone(), item);
        }
        Ok(tables)
    }

    fn to_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            items: self.items.values().cloned().collect(),
            hangers: self.hangers.values().cloned().collect(),
        }
    }

    fn holder_of(&self, hanger_id: &str) -> Option<&str> {
        self.items
            .values()
            .find(|item| item.hanger_id.as_deref() == Some(hanger_id))
            .map(|item| item.id.as_str())
    }
}

/// In-process entity store.
///
/// Each trait method takes the table lock once, so every write is atomic
/// with respect to every other store call.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        Ok(Self {
            tables: Arc::new(RwLock::new(Tables::from_snapshot(snapshot)?)),
        })
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.tables.read().await.to_snapshot()
    }

    /// Replace the whole contents, used to undo a write whose flush failed.
    pub async fn restore(&self, snapshot: StoreSnapshot) -> Result<()> {
        let tables = Tables::from_snapshot(snapshot)?;
        *self.tables.write().await = tables;
        Ok(())
    }

    pub async fn insert_item(&self, item: Item) {
        self.tables.write().await.items.insert(item.id.clone(), item);
    }

    pub async fn insert_hanger(&self, hanger: Hanger) {
        self.tables
            .write()
            .await
            .hangers
            .insert(hanger.id.clone(), hanger);
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_item_by_tag(&self, tag_id: &str) -> Result<Option<Item>> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .values()
            .find(|item| item.tag_id.as_deref() == Some(tag_id))
            .cloned())
    }

    async fn find_hanger_by_tag(&self, tag_id: &str) -> Result<Option<Hanger>> {
        let tables = self.tables.read().await;
        Ok(tables
            .hangers
            .values()
            .find(|hanger| hanger.tag_id == tag_id)
            .cloned())
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<Item>> {
        Ok(self.tables.read().await.items.get(item_id).cloned())
    }

    async fn set_item_tag(&self, item_id: &str, tag_id: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.items.contains_key(item_id) {
            return Err(PairingError::ItemNotFound {
                item_id: item_id.to_string(),
            });
        }

        // A physical tag sits on one garment; moving it releases the old owner.
        for item in tables.items.values_mut() {
            if item.id != item_id && item.tag_id.as_deref() == Some(tag_id) {
                tracing::debug!("Tag {} moved off item {}", tag_id, item.id);
                item.tag_id = None;
            }
        }
        if let Some(item) = tables.items.get_mut(item_id) {
            item.tag_id = Some(tag_id.to_string());
        }
        Ok(())
    }

    async fn set_item_hanger(&self, item_id: &str, hanger_id: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.items.contains_key(item_id) {
            return Err(PairingError::ItemNotFound {
                item_id: item_id.to_string(),
            });
        }

        for item in tables.items.values_mut() {
            if item.id != item_id && item.hanger_id.as_deref() == Some(hanger_id) {
                tracing::debug!("Hanger {} released by item {}", hanger_id, item.id);
                item.hanger_id = None;
            }
        }
        if let Some(item) = tables.items.get_mut(item_id) {
            item.hanger_id = Some(hanger_id.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_item(Item::new("i1").with_tag("TAG1")).await;
        store.insert_item(Item::new("i2").with_hanger("h1")).await;
        store.insert_hanger(Hanger::new("h1", "TAGH")).await;
        store
    }

    #[tokio::test]
    async fn test_lookup_by_tag() {
        let store = seeded().await;

        let item = store.find_item_by_tag("TAG1").await.unwrap().unwrap();
        assert_eq!(item.id, "i1");
        let hanger = store.find_hanger_by_tag("TAGH").await.unwrap().unwrap();
        assert_eq!(hanger.id, "h1");
        assert!(store.find_item_by_tag("TAGH").await.unwrap().is_none());
        assert!(store.find_hanger_by_tag("TAG1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_item_hanger_keeps_hanger_unique() {
        let store = seeded().await;

        store.set_item_hanger("i1", "h1").await.unwrap();

        let i1 = store.get_item("i1").await.unwrap().unwrap();
        let i2 = store.get_item("i2").await.unwrap().unwrap();
        assert_eq!(i1.hanger_id.as_deref(), Some("h1"));
        assert!(i2.hanger_id.is_none());
    }

    #[tokio::test]
    async fn test_set_item_tag_moves_tag() {
        let store = seeded().await;

        store.set_item_tag("i2", "TAG1").await.unwrap();

        let owner = store.find_item_by_tag("TAG1").await.unwrap().unwrap();
        assert_eq!(owner.id, "i2");
        let i1 = store.get_item("i1").await.unwrap().unwrap();
        assert!(i1.tag_id.is_none());
    }

    #[tokio::test]
    async fn test_writes_to_missing_item_fail() {
        let store = seeded().await;

        let err = store.set_item_tag("ghost", "T").await.unwrap_err();
        assert!(matches!(err, PairingError::ItemNotFound { .. }));
        let err = store.set_item_hanger("ghost", "h1").await.unwrap_err();
        assert!(matches!(err, PairingError::ItemNotFound { .. }));
    }

    #[test]
    fn test_snapshot_with_shared_hanger_is_rejected() {
        let snapshot = StoreSnapshot {
            items: vec![
                Item::new("a").with_hanger("h1"),
                Item::new("b").with_hanger("h1"),
            ],
            hangers: vec![Hanger::new("h1", "TAGH")],
        };
        assert!(MemoryStore::from_snapshot(snapshot).is_err());
    }
}
