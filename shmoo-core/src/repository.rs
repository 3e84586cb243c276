use anyhow::Result;
use async_trait::async_trait;
use shmoo_types::{ShmooPoint, UserStats};

/// Whole-record storage of one address's stats and point history
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Zeroed stats and an empty history when nothing was stored yet
    async fn load(&self, address: &str) -> Result<(UserStats, Vec<ShmooPoint>)>;

    /// Overwrites the stored record. Does nothing for an empty address.
    async fn save(&self, address: &str, stats: &UserStats, points: &[ShmooPoint]) -> Result<()>;
}
