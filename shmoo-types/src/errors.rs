use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Why an attempt ended up in the failed state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum FailureKind {
    Submission,          // No hash was produced, e.g. the user rejected in the wallet
    ConfirmationTimeout, // Hash produced but no receipt within the bound
    ConfirmationFailure, // Receipt reported a non-success status
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
