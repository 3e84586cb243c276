use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{EpochMillis, WalletAddress};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserStats {
    #[ts(type = "number")]
    pub total_clicks: u64,
    #[ts(type = "number")]
    pub streak_count: u64,
    #[ts(type = "number")]
    pub last_click_timestamp: EpochMillis, // 0 when the address never clicked
    #[ts(type = "number")]
    pub daily_clicks: u64,
}

impl UserStats {
    pub fn has_clicked(&self) -> bool {
        self.last_click_timestamp != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ShmooPoint {
    pub point_id: String,
    pub user_address: WalletAddress,
    #[ts(type = "number")]
    pub timestamp: EpochMillis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub tx_hash: Option<String>,
}

impl ShmooPoint {
    /// Builds the point recorded for a confirmed transaction. The id is
    /// derived from the hash so a point can always be traced back on-chain.
    pub fn confirmed(user_address: WalletAddress, tx_hash: String, timestamp: EpochMillis) -> Self {
        Self {
            point_id: format!("{}_0", tx_hash),
            user_address,
            timestamp,
            tx_hash: Some(tx_hash),
        }
    }
}

/// A point as the contract's `getUserPoints` reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OnChainPoint {
    pub user: WalletAddress,
    #[ts(type = "number")]
    pub timestamp: u64, // block time in seconds
    pub point_id: String, // hex, the contract id is a uint256
}

impl OnChainPoint {
    /// The contract view of a locally recorded point
    pub fn from_recorded(point: &ShmooPoint) -> Self {
        let id = point.point_id.split('_').next().unwrap_or_default();
        Self {
            user: point.user_address.clone(),
            timestamp: (point.timestamp.max(0) / 1000) as u64,
            point_id: id.to_string(),
        }
    }
}
