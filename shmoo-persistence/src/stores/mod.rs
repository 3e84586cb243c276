pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// String blob store, the shape of browser `localStorage`
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Write entries in order. Stores that can commit them atomically
    /// override this so a failure leaves none of them written.
    async fn set_items(&self, entries: &[(String, String)]) -> Result<()> {
        for (key, value) in entries {
            self.set_item(key, value).await?;
        }
        Ok(())
    }
}
