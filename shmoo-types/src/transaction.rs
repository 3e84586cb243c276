use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::FailureKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum TransactionStatus {
    #[default]
    Idle,      // Nothing in flight
    Pending,   // Submitted or waiting for a receipt
    Confirmed, // Receipt came back successful, stats updated
    Failed,    // Submission or confirmation failed, retry allowed
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Idle => "idle",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the transaction status panel renders for the current attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TransactionSnapshot {
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub failure: Option<FailureKind>,
}

impl TransactionSnapshot {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn pending(tx_hash: Option<String>) -> Self {
        Self {
            status: TransactionStatus::Pending,
            tx_hash,
            error: None,
            failure: None,
        }
    }

    pub fn confirmed(tx_hash: String) -> Self {
        Self {
            status: TransactionStatus::Confirmed,
            tx_hash: Some(tx_hash),
            error: None,
            failure: None,
        }
    }

    pub fn failed(failure: FailureKind, error: String, tx_hash: Option<String>) -> Self {
        Self {
            status: TransactionStatus::Failed,
            tx_hash,
            error: Some(error),
            failure: Some(failure),
        }
    }

    /// Link to the transaction on a block explorer, when there is a hash to show
    pub fn explorer_link(&self, explorer_url: &str) -> Option<String> {
        self.tx_hash
            .as_ref()
            .map(|hash| format!("{}/tx/{}", explorer_url.trim_end_matches('/'), hash))
    }
}
