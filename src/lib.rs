//! vap-bridge library crate.
//!
//! Binding layer between an application and a native alpha-video animation
//! engine: typed tag content, the command/event protocol, the per-view
//! controller and the native-side peer adapter.

pub mod channel;
pub mod config;
pub mod content;
pub mod controller;
pub mod error;
pub mod peer;
pub mod protocol;
pub mod resolver;
pub mod view;

pub use content::{Content, ContentError, ContentType};
pub use controller::{AnimListener, Controller};
pub use error::BridgeError;
pub use peer::{PeerAdapter, PlayEvents, PlayRequest, PlaybackEngine};
pub use protocol::{AnimationConfig, CreationParams, Event, PlayOutcome, PlaybackFailure, ScaleType};
pub use view::{create_view, create_view_from_value, ViewError};
