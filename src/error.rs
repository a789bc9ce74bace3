//! Errors surfaced to the application by a controller.

use crate::channel::{ChannelError, EMPTY_TAG_CODE};
use crate::content::ContentError;
use crate::protocol::{PlaybackFailure, ProtocolError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    #[error("tag must not be empty")]
    EmptyTag,

    #[error("controller has been disposed")]
    ControllerDisposed,

    #[error("malformed content: {0}")]
    Content(#[from] ContentError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("channel error: {0}")]
    Channel(ChannelError),

    #[error(transparent)]
    Playback(#[from] PlaybackFailure),
}

impl From<ChannelError> for BridgeError {
    fn from(err: ChannelError) -> Self {
        if let Some(failure) = err.as_failure() {
            return BridgeError::Playback(failure);
        }
        match err {
            ChannelError::Peer { ref code, .. } if code == EMPTY_TAG_CODE => BridgeError::EmptyTag,
            other => BridgeError::Channel(other),
        }
    }
}
