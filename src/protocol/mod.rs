//! Command/event protocol spoken between a controller and its native peer.
//!
//! Both directions are method calls keyed by a string name with a JSON
//! argument payload. Commands flow controller→peer and may return a result;
//! events flow peer→controller unsolicited.

mod anim_config;
mod command;
mod event;
mod failure;
mod params;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::ContentError;

pub use anim_config::{AnimationConfig, Orientation, Region};
pub use command::{Command, ScaleType};
pub use event::Event;
pub use failure::{error_codes, PlayOutcome, PlaybackFailure};
pub use params::CreationParams;

/// Method names for commands (controller→peer).
pub mod methods {
    pub const PLAY_FILE: &str = "playFile";
    pub const PLAY_ASSET: &str = "playAsset";
    pub const STOP: &str = "stop";
    pub const SET_LOOP: &str = "setLoop";
    pub const SET_MUTE: &str = "setMute";
    pub const SET_SCALE_TYPE: &str = "setScaleType";
    pub const SET_TAG_CONTENT: &str = "setTagContent";
    pub const SET_TAG_CONTENTS: &str = "setTagContents";
    pub const GET_TAG_CONTENT: &str = "getTagContent";
    pub const GET_ALL_TAG_CONTENTS: &str = "getAllTagContents";
    pub const CLEAR_TAG_CONTENTS: &str = "clearTagContents";
    pub const DISPOSE: &str = "dispose";

    /// Method names for events (peer→controller).
    pub const ON_FAILED: &str = "onFailed";
    pub const ON_VIDEO_CONFIG_READY: &str = "onVideoConfigReady";
    pub const ON_VIDEO_START: &str = "onVideoStart";
    pub const ON_VIDEO_RENDER: &str = "onVideoRender";
    pub const ON_VIDEO_COMPLETE: &str = "onVideoComplete";
    pub const ON_VIDEO_DESTROY: &str = "onVideoDestroy";
}

/// Argument key carrying the controller's id for one play invocation.
pub const PLAY_ID_KEY: &str = "playId";

/// A named call with its argument payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// A call with no arguments.
    pub fn bare(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }

    pub(crate) fn arg(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key).filter(|v| !v.is_null())
    }

    pub(crate) fn require(&self, key: &str) -> Result<&Value, ProtocolError> {
        self.arg(key).ok_or_else(|| self.invalid(format!("missing '{}'", key)))
    }

    pub(crate) fn require_str(&self, key: &str) -> Result<&str, ProtocolError> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| self.invalid(format!("'{}' must be a string", key)))
    }

    pub(crate) fn require_i64(&self, key: &str) -> Result<i64, ProtocolError> {
        self.require(key)?
            .as_i64()
            .ok_or_else(|| self.invalid(format!("'{}' must be an integer", key)))
    }

    pub(crate) fn require_bool(&self, key: &str) -> Result<bool, ProtocolError> {
        self.require(key)?
            .as_bool()
            .ok_or_else(|| self.invalid(format!("'{}' must be a boolean", key)))
    }

    /// An optional non-negative integer argument.
    pub(crate) fn optional_u64(&self, key: &str) -> Result<Option<u64>, ProtocolError> {
        self.arg(key)
            .map(|v| {
                v.as_u64()
                    .ok_or_else(|| self.invalid(format!("'{}' must be a non-negative integer", key)))
            })
            .transpose()
    }

    pub(crate) fn invalid(&self, reason: String) -> ProtocolError {
        ProtocolError::InvalidArguments {
            method: self.method.clone(),
            reason,
        }
    }
}

/// Errors mapping method calls to typed commands and events.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("method '{0}' is not implemented")]
    Unimplemented(String),

    #[error("invalid arguments for '{method}': {reason}")]
    InvalidArguments { method: String, reason: String },

    #[error("malformed content: {0}")]
    Content(#[from] ContentError),
}
