//! Response handed back to the platform after a run

use serde::{Deserialize, Serialize};

/// Terminal status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Run result reported to the platform
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventResponse {
    pub status: ResponseStatus,
    /// Human-readable reason, set on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Extra attributes, e.g. the registered deployment id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl EventResponse {
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: ResponseStatus::Success,
            reason: None,
            data: None,
        }
    }

    #[must_use]
    pub fn success_with(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            ..Self::success()
        }
    }

    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Failed,
            reason: Some(reason.into()),
            data: None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}
