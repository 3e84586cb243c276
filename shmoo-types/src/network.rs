use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Address used when no contract has been deployed; chain calls are simulated
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NetworkInfo {
    pub name: String,
    #[ts(type = "number")]
    pub chain_id: u64,
    pub contract_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub explorer_url: Option<String>,
}

impl NetworkInfo {
    pub fn is_simulated(&self) -> bool {
        self.contract_address.eq_ignore_ascii_case(ZERO_ADDRESS)
    }
}
