//! Response definitions
//!
//! Represents responses to clients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A response to send to client
///
/// Serializes as `{"success": bool, "values"?: {...}, "skipped"?: [...], "error"?: "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,

    /// Values returned by `read`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<BTreeMap<String, String>>,

    /// Locked keys a `write` skipped (only when the client asked)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<Vec<String>>,

    /// Failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Bare success
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Success carrying read results
    pub fn with_values(values: BTreeMap<String, String>) -> Self {
        Self {
            success: true,
            values: Some(values),
            ..Self::default()
        }
    }

    /// Success carrying the keys a write skipped
    pub fn with_skipped(skipped: Vec<String>) -> Self {
        Self {
            success: true,
            skipped: Some(skipped),
            ..Self::default()
        }
    }

    /// Failure with a message
    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}
