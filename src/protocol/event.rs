//! Events sent unsolicited from a peer to its controller.

use serde_json::{json, Value};

use super::{methods, AnimationConfig, MethodCall, PlaybackFailure, ProtocolError, PLAY_ID_KEY};

/// A typed lifecycle or error event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// `play_id` is the controller's id for the play that failed, when the
    /// failure belongs to one. Out-of-band failures carry none.
    Failed {
        failure: PlaybackFailure,
        play_id: Option<u64>,
    },
    VideoConfigReady(AnimationConfig),
    VideoStart,
    VideoRender {
        frame_index: i64,
        config: Option<AnimationConfig>,
    },
    VideoComplete,
    VideoDestroy,
}

impl Event {
    /// An untagged failure event.
    pub fn failed(failure: PlaybackFailure) -> Self {
        Event::Failed {
            failure,
            play_id: None,
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Event::Failed { .. } => methods::ON_FAILED,
            Event::VideoConfigReady(_) => methods::ON_VIDEO_CONFIG_READY,
            Event::VideoStart => methods::ON_VIDEO_START,
            Event::VideoRender { .. } => methods::ON_VIDEO_RENDER,
            Event::VideoComplete => methods::ON_VIDEO_COMPLETE,
            Event::VideoDestroy => methods::ON_VIDEO_DESTROY,
        }
    }

    /// Whether this event ends a play invocation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::Failed { .. } | Event::VideoComplete | Event::VideoDestroy
        )
    }

    pub fn to_call(&self) -> MethodCall {
        let arguments = match self {
            Event::Failed { failure, play_id } => {
                let mut value = to_value(failure);
                if let (Some(map), Some(id)) = (value.as_object_mut(), play_id) {
                    map.insert(PLAY_ID_KEY.to_string(), Value::from(*id));
                }
                value
            }
            Event::VideoConfigReady(config) => to_value(config),
            Event::VideoRender {
                frame_index,
                config,
            } => json!({
                "frameIndex": frame_index,
                "config": config.as_ref().map(to_value),
            }),
            Event::VideoStart | Event::VideoComplete | Event::VideoDestroy => Value::Null,
        };
        MethodCall::new(self.method(), arguments)
    }

    pub fn from_call(call: &MethodCall) -> Result<Self, ProtocolError> {
        let event = match call.method.as_str() {
            methods::ON_FAILED => Event::Failed {
                failure: from_value(call, &call.arguments)?,
                play_id: call.optional_u64(PLAY_ID_KEY)?,
            },
            methods::ON_VIDEO_CONFIG_READY => {
                Event::VideoConfigReady(from_value(call, &call.arguments)?)
            }
            methods::ON_VIDEO_START => Event::VideoStart,
            methods::ON_VIDEO_RENDER => Event::VideoRender {
                frame_index: call.require_i64("frameIndex")?,
                config: call
                    .arg("config")
                    .map(|config| from_value(call, config))
                    .transpose()?,
            },
            methods::ON_VIDEO_COMPLETE => Event::VideoComplete,
            methods::ON_VIDEO_DESTROY => Event::VideoDestroy,
            other => return Err(ProtocolError::Unimplemented(other.to_string())),
        };
        Ok(event)
    }
}

fn to_value<T: serde::Serialize>(payload: &T) -> Value {
    // Plain structs of numbers and strings always serialize.
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

fn from_value<T: serde::de::DeserializeOwned>(
    call: &MethodCall,
    value: &Value,
) -> Result<T, ProtocolError> {
    serde_json::from_value(value.clone()).map_err(|e| call.invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::error_codes;

    #[test]
    fn test_events_decode_from_their_own_calls() {
        let config = AnimationConfig {
            width: 100,
            height: 200,
            fps: 30,
            total_frames: 60,
            ..Default::default()
        };
        let events = vec![
            Event::failed(PlaybackFailure::new(error_codes::DECODE_EXC, "decoder died")),
            Event::Failed {
                failure: PlaybackFailure::new(error_codes::FILE_NOT_FOUND, "gone"),
                play_id: Some(9),
            },
            Event::VideoConfigReady(config.clone()),
            Event::VideoStart,
            Event::VideoRender {
                frame_index: 3,
                config: Some(config),
            },
            Event::VideoRender {
                frame_index: 4,
                config: None,
            },
            Event::VideoComplete,
            Event::VideoDestroy,
        ];
        for event in events {
            assert_eq!(Event::from_call(&event.to_call()).unwrap(), event);
        }
    }

    #[test]
    fn test_failed_without_message() {
        let call = MethodCall::new(
            methods::ON_FAILED,
            json!({"errorCode": 10001, "errorType": "EXTRACTOR_EXC"}),
        );
        let Event::Failed { failure, play_id } = Event::from_call(&call).unwrap() else {
            panic!("expected failure event");
        };
        assert_eq!(failure.error_code, 10001);
        assert_eq!(failure.error_msg, None);
        assert_eq!(play_id, None);
    }

    #[test]
    fn test_unknown_event_is_unimplemented() {
        let call = MethodCall::bare("onVideoPause");
        assert_eq!(
            Event::from_call(&call),
            Err(ProtocolError::Unimplemented("onVideoPause".to_string()))
        );
    }

    #[test]
    fn test_render_requires_frame_index() {
        let call = MethodCall::new(methods::ON_VIDEO_RENDER, json!({"config": null}));
        assert!(matches!(
            Event::from_call(&call),
            Err(ProtocolError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn test_terminal_events() {
        assert!(Event::VideoComplete.is_terminal());
        assert!(Event::VideoDestroy.is_terminal());
        assert!(!Event::VideoStart.is_terminal());
    }
}
