//! Per-view bidirectional channel between a controller and its peer.
//!
//! Requests carry a one-shot reply slot. Events flow the other way on their
//! own unbounded queue so the peer never waits on a slow listener.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::protocol::{Event, MethodCall, PlaybackFailure};

/// Reply code for a rejected empty tag.
pub const EMPTY_TAG_CODE: &str = "EMPTY_TAG";

/// Reply code for malformed arguments.
pub const INVALID_ARGUMENTS_CODE: &str = "INVALID_ARGUMENTS";

/// Result of a command.
pub type Reply = Result<Value, ChannelError>;

/// The caller side of a channel: anything that can carry a command to a
/// peer and bring back its reply.
pub trait Channel: Send + Sync {
    fn invoke(&self, call: MethodCall) -> BoxFuture<'_, Reply>;
}

/// Errors crossing the channel.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChannelError {
    #[error("method '{0}' is not implemented by the receiver")]
    NotImplemented(String),

    #[error("peer error {code}: {message}")]
    Peer {
        code: String,
        message: String,
        details: Option<Value>,
    },

    #[error("channel closed")]
    Closed,
}

impl ChannelError {
    pub fn peer(code: impl Into<String>, message: impl Into<String>) -> Self {
        ChannelError::Peer {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Wrap a playback failure so it can be recovered on the other side.
    pub fn from_failure(failure: &PlaybackFailure) -> Self {
        ChannelError::Peer {
            code: failure.error_type.clone(),
            message: failure.error_msg.clone().unwrap_or_default(),
            details: serde_json::to_value(failure).ok(),
        }
    }

    /// The playback failure carried in this error, if any.
    pub fn as_failure(&self) -> Option<PlaybackFailure> {
        match self {
            ChannelError::Peer {
                details: Some(details),
                ..
            } => serde_json::from_value(details.clone()).ok(),
            _ => None,
        }
    }
}

/// A command waiting for the peer's answer.
#[derive(Debug)]
pub struct Request {
    pub call: MethodCall,
    reply: oneshot::Sender<Reply>,
}

impl Request {
    /// Answer the request. A caller that stopped waiting is ignored.
    pub fn respond(self, reply: Reply) {
        let _ = self.reply.send(reply);
    }

    /// Split into the call and its reply handle.
    pub fn into_parts(self) -> (MethodCall, Responder) {
        (self.call, Responder(self.reply))
    }
}

/// Reply handle detached from its request.
#[derive(Debug)]
pub struct Responder(oneshot::Sender<Reply>);

impl Responder {
    pub fn respond(self, reply: Reply) {
        let _ = self.0.send(reply);
    }
}

/// Controller side of an in-process channel.
#[derive(Debug, Clone)]
pub struct MethodChannel {
    tx: mpsc::UnboundedSender<Request>,
}

impl Channel for MethodChannel {
    fn invoke(&self, call: MethodCall) -> BoxFuture<'_, Reply> {
        async move {
            let (reply, rx) = oneshot::channel();
            self.tx
                .send(Request { call, reply })
                .map_err(|_| ChannelError::Closed)?;
            rx.await.map_err(|_| ChannelError::Closed)?
        }
        .boxed()
    }
}

/// An event arriving at the controller, with an optional acknowledgement.
#[derive(Debug)]
pub struct InboundEvent {
    pub call: MethodCall,
    ack: Option<oneshot::Sender<Result<(), ChannelError>>>,
}

impl InboundEvent {
    pub fn acknowledge(self, result: Result<(), ChannelError>) {
        if let Some(ack) = self.ack {
            let _ = ack.send(result);
        }
    }
}

/// Peer side handle for emitting events.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<InboundEvent>,
}

impl EventSink {
    /// Queue an event without waiting for it to be handled.
    pub fn emit(&self, event: &Event) -> Result<(), ChannelError> {
        self.emit_call(event.to_call())
    }

    pub fn emit_call(&self, call: MethodCall) -> Result<(), ChannelError> {
        self.tx
            .send(InboundEvent { call, ack: None })
            .map_err(|_| ChannelError::Closed)
    }

    /// Send an event and wait until the controller has dispatched it.
    /// Unknown method names come back as `NotImplemented`.
    pub async fn invoke(&self, call: MethodCall) -> Result<(), ChannelError> {
        let (ack, rx) = oneshot::channel();
        self.tx
            .send(InboundEvent {
                call,
                ack: Some(ack),
            })
            .map_err(|_| ChannelError::Closed)?;
        rx.await.map_err(|_| ChannelError::Closed)?
    }
}

/// Controller half of a channel pair.
#[derive(Debug)]
pub struct ControllerEnd {
    pub channel: MethodChannel,
    pub events: mpsc::UnboundedReceiver<InboundEvent>,
}

/// Peer half of a channel pair.
#[derive(Debug)]
pub struct PeerEnd {
    pub requests: mpsc::UnboundedReceiver<Request>,
    pub events: EventSink,
}

/// Create a connected in-process channel.
pub fn pair() -> (ControllerEnd, PeerEnd) {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    (
        ControllerEnd {
            channel: MethodChannel { tx: request_tx },
            events: event_rx,
        },
        PeerEnd {
            requests: request_rx,
            events: EventSink { tx: event_tx },
        },
    )
}
