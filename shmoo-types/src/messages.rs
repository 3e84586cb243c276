use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{OnChainPoint, ShmooPoint, TransactionSnapshot, UserStats};

/// Human readable labels for the four stat cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatsSummary {
    pub total_clicks: String,
    pub current_streak: String,
    pub today: String,
    pub last_click: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatsResponse {
    pub address: String,
    pub stats: UserStats,
    pub summary: StatsSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional, type = "number")]
    pub on_chain_count: Option<u64>,
}

/// One row of the activity history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PointEntry {
    #[serde(flatten)]
    pub point: ShmooPoint,
    pub label: String,
    pub display_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PointsResponse {
    pub address: String,
    pub points: Vec<PointEntry>,
    #[ts(type = "number")]
    pub total: u64,
}

/// Returned once an attempt has been confirmed
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GenerationResponse {
    pub point: ShmooPoint,
    pub stats: UserStats,
    pub transaction: TransactionSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub explorer_link: Option<String>,
}

/// Points as the contract reports them
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OnChainPointsResponse {
    pub address: String,
    pub points: Vec<OnChainPoint>,
}
