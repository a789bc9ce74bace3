//! Playback failures reported by the peer, and play results.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Numeric error codes and their type strings. This layer passes them
/// through verbatim.
pub mod error_codes {
    pub const EXTRACTOR_EXC: (i32, &str) = (10001, "EXTRACTOR_EXC");
    pub const DECODE_EXC: (i32, &str) = (10002, "DECODE_EXC");
    pub const CREATE_THREAD: (i32, &str) = (10003, "CREATE_THREAD");
    pub const CREATE_RENDER: (i32, &str) = (10004, "CREATE_RENDER");
    pub const CONFIG_PLUGIN_MIX: (i32, &str) = (10005, "CONFIG_PLUGIN_MIX");
    pub const CONFIG_PARSE: (i32, &str) = (10006, "CONFIG_PARSE");
    pub const FILE_NOT_FOUND: (i32, &str) = (10007, "FILE_NOT_FOUND");
    pub const FILE_TOO_LARGE: (i32, &str) = (10008, "FILE_TOO_LARGE");
    pub const HEVC_NOT_SUPPORT: (i32, &str) = (10009, "HEVC_NOT_SUPPORT");
}

/// Payload of `onFailed`, also used to fail an in-flight play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("playback failed [{error_code} {error_type}]{}", message_suffix(.error_msg))]
pub struct PlaybackFailure {
    pub error_code: i32,
    pub error_type: String,
    #[serde(default)]
    pub error_msg: Option<String>,
}

impl PlaybackFailure {
    pub fn new(code: (i32, &str), message: impl Into<String>) -> Self {
        Self {
            error_code: code.0,
            error_type: code.1.to_string(),
            error_msg: Some(message.into()),
        }
    }
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

/// Successful end of a play invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Natural end of stream.
    Completed,
    /// Ended by stop or teardown.
    Stopped,
    /// Replaced by a newer play before it ended.
    Superseded,
}

impl PlayOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayOutcome::Completed => "complete",
            PlayOutcome::Stopped => "stopped",
            PlayOutcome::Superseded => "superseded",
        }
    }

    pub fn to_value(self) -> Value {
        json!({ "status": self.as_str() })
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value.get("status")?.as_str()? {
            "complete" => Some(PlayOutcome::Completed),
            "stopped" => Some(PlayOutcome::Stopped),
            "superseded" => Some(PlayOutcome::Superseded),
            _ => None,
        }
    }
}
