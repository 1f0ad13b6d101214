use crate::domain::model::{Hanger, Item};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Persistence collaborator consumed by the pairing coordinator.
///
/// Every method is a single-row operation and must be atomic on its own.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn find_item_by_tag(&self, tag_id: &str) -> Result<Option<Item>>;
    async fn find_hanger_by_tag(&self, tag_id: &str) -> Result<Option<Hanger>>;
    async fn get_item(&self, item_id: &str) -> Result<Option<Item>>;
    async fn set_item_tag(&self, item_id: &str, tag_id: &str) -> Result<()>;
    /// Assign `hanger_id` to the item. At most one item may hold a given hanger.
    async fn set_item_hanger(&self, item_id: &str, hanger_id: &str) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn listen_addr(&self) -> &str;
    fn store_path(&self) -> &str;
    /// `None` means long-poll binds wait until the client goes away.
    fn bind_timeout(&self) -> Option<Duration>;
}
