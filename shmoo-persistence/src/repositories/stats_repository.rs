use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::warn;

use crate::stores::KeyValueStore;
use shmoo_core::StatsRepository;
use shmoo_types::{ShmooPoint, UserStats};

pub const STATS_NAMESPACE: &str = "shmoo_stats";
pub const POINTS_NAMESPACE: &str = "shmoo_points";

/// `<namespace>_<address>`, the key layout the front end has always used
pub fn storage_key(namespace: &str, address: &str) -> String {
    format!("{}_{}", namespace, address)
}

/// Stores stats and points as two JSON blobs per address
pub struct KvStatsRepository {
    store: Arc<dyn KeyValueStore>,
}

impl KvStatsRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Unparseable blobs are treated like missing ones
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.store.get_item(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!("Ignoring unreadable record {}: {}", key, err);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl StatsRepository for KvStatsRepository {
    async fn load(&self, address: &str) -> Result<(UserStats, Vec<ShmooPoint>)> {
        let stats = self
            .read_json::<UserStats>(&storage_key(STATS_NAMESPACE, address))
            .await?
            .unwrap_or_default();
        let points = self
            .read_json::<Vec<ShmooPoint>>(&storage_key(POINTS_NAMESPACE, address))
            .await?
            .unwrap_or_default();

        Ok((stats, points))
    }

    async fn save(&self, address: &str, stats: &UserStats, points: &[ShmooPoint]) -> Result<()> {
        // No session to key by
        if address.trim().is_empty() {
            return Ok(());
        }

        // Points go first so a store without atomic batches never holds
        // stats that count points it does not have
        let entries = [
            (
                storage_key(POINTS_NAMESPACE, address),
                serde_json::to_string(points)?,
            ),
            (
                storage_key(STATS_NAMESPACE, address),
                serde_json::to_string(stats)?,
            ),
        ];
        self.store.set_items(&entries).await
    }
}
