//! Commands sent from a controller to its peer.

use std::collections::HashMap;

use serde_json::{json, Value};

use super::{methods, MethodCall, ProtocolError, PLAY_ID_KEY};
use crate::content::{self, Content};

/// How the animation is fitted into the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScaleType {
    #[default]
    FitCenter,
    CenterCrop,
    FitXY,
}

impl ScaleType {
    pub fn as_str(self) -> &'static str {
        match self {
            ScaleType::FitCenter => "fitCenter",
            ScaleType::CenterCrop => "centerCrop",
            ScaleType::FitXY => "fitXY",
        }
    }

    /// Parse a wire value, falling back to `FitCenter` for anything unknown.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "fitCenter" => ScaleType::FitCenter,
            "centerCrop" => ScaleType::CenterCrop,
            "fitXY" => ScaleType::FitXY,
            other => {
                log::debug!("Unknown scale type '{}', using fitCenter", other);
                ScaleType::FitCenter
            }
        }
    }
}

impl std::fmt::Display for ScaleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed command.
///
/// Play commands carry the controller's id for the invocation; the peer
/// echoes it on the `onFailed` event it sends for that play.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    PlayFile { path: String, play_id: Option<u64> },
    PlayAsset { asset: String, play_id: Option<u64> },
    Stop,
    /// 0 plays once, -1 loops forever, n plays n+1 times.
    SetLoop { count: i32 },
    SetMute { muted: bool },
    SetScaleType(ScaleType),
    SetTagContent { tag: String, content: Content },
    SetTagContents(HashMap<String, Content>),
    GetTagContent { tag: String },
    GetAllTagContents,
    ClearTagContents,
    Dispose,
}

impl Command {
    pub fn method(&self) -> &'static str {
        match self {
            Command::PlayFile { .. } => methods::PLAY_FILE,
            Command::PlayAsset { .. } => methods::PLAY_ASSET,
            Command::Stop => methods::STOP,
            Command::SetLoop { .. } => methods::SET_LOOP,
            Command::SetMute { .. } => methods::SET_MUTE,
            Command::SetScaleType(_) => methods::SET_SCALE_TYPE,
            Command::SetTagContent { .. } => methods::SET_TAG_CONTENT,
            Command::SetTagContents(_) => methods::SET_TAG_CONTENTS,
            Command::GetTagContent { .. } => methods::GET_TAG_CONTENT,
            Command::GetAllTagContents => methods::GET_ALL_TAG_CONTENTS,
            Command::ClearTagContents => methods::CLEAR_TAG_CONTENTS,
            Command::Dispose => methods::DISPOSE,
        }
    }

    pub fn to_call(&self) -> MethodCall {
        let arguments = match self {
            Command::PlayFile { path, play_id } => {
                json!({ "path": path, PLAY_ID_KEY: play_id })
            }
            Command::PlayAsset { asset, play_id } => {
                json!({ "asset": asset, PLAY_ID_KEY: play_id })
            }
            Command::SetLoop { count } => json!({ "loop": count }),
            Command::SetMute { muted } => json!({ "mute": muted }),
            Command::SetScaleType(scale) => json!({ "scaleType": scale.as_str() }),
            Command::SetTagContent { tag, content } => {
                json!({ "tag": tag, "content": content.to_value() })
            }
            Command::SetTagContents(contents) => {
                json!({ "contents": content::encode_batch(contents) })
            }
            Command::GetTagContent { tag } => json!({ "tag": tag }),
            Command::Stop
            | Command::GetAllTagContents
            | Command::ClearTagContents
            | Command::Dispose => Value::Null,
        };
        MethodCall::new(self.method(), arguments)
    }

    /// Decode an incoming call on the peer side.
    pub fn from_call(call: &MethodCall) -> Result<Self, ProtocolError> {
        let command = match call.method.as_str() {
            methods::PLAY_FILE => Command::PlayFile {
                path: call.require_str("path")?.to_string(),
                play_id: call.optional_u64(PLAY_ID_KEY)?,
            },
            methods::PLAY_ASSET => Command::PlayAsset {
                asset: call.require_str("asset")?.to_string(),
                play_id: call.optional_u64(PLAY_ID_KEY)?,
            },
            methods::STOP => Command::Stop,
            methods::SET_LOOP => {
                let count = call.require_i64("loop")?;
                let count = i32::try_from(count)
                    .map_err(|_| call.invalid(format!("loop count {} out of range", count)))?;
                Command::SetLoop { count }
            }
            methods::SET_MUTE => Command::SetMute {
                muted: call.require_bool("mute")?,
            },
            methods::SET_SCALE_TYPE => {
                Command::SetScaleType(ScaleType::from_wire(call.require_str("scaleType")?))
            }
            methods::SET_TAG_CONTENT => Command::SetTagContent {
                tag: call.require_str("tag")?.to_string(),
                content: Content::from_value(call.require("content")?)?,
            },
            methods::SET_TAG_CONTENTS => {
                Command::SetTagContents(content::decode_batch(call.require("contents")?)?)
            }
            methods::GET_TAG_CONTENT => Command::GetTagContent {
                tag: call.require_str("tag")?.to_string(),
            },
            methods::GET_ALL_TAG_CONTENTS => Command::GetAllTagContents,
            methods::CLEAR_TAG_CONTENTS => Command::ClearTagContents,
            methods::DISPOSE => Command::Dispose,
            other => return Err(ProtocolError::Unimplemented(other.to_string())),
        };
        Ok(command)
    }
}
