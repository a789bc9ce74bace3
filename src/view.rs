//! View embedding: one peer and one controller per view instance.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use crate::channel;
use crate::content::ContentError;
use crate::controller::Controller;
use crate::peer::{PeerAdapter, PlaybackEngine};
use crate::protocol::CreationParams;
use crate::resolver::{ResolveError, ResourceSettings};

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

/// Errors creating a view.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("invalid creation parameters: {0}")]
    Params(#[from] ContentError),

    #[error("failed to set up resource resolution: {0}")]
    Resources(#[from] ResolveError),
}

/// Create a view from its creation payload as it arrives from the
/// application side. Must be called inside a tokio runtime.
pub fn create_view_from_value(
    creation_params: &Value,
    engine: Box<dyn PlaybackEngine>,
    settings: ResourceSettings,
) -> Result<Controller, ViewError> {
    let params = CreationParams::from_value(creation_params)?;
    let view_id = NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed);
    let (controller_end, peer_end) = channel::pair();

    log::info!(
        "Creating view {} (scale {}, repeat {}, mute {}, {} initial tags)",
        view_id,
        params.scale_type,
        params.repeat,
        params.mute,
        params.tag_contents.as_ref().map_or(0, |c| c.len())
    );
    let adapter = PeerAdapter::new(view_id, engine, params, settings, peer_end.events)?;
    adapter.spawn(peer_end.requests);
    Ok(Controller::attach(view_id, controller_end))
}

/// Create a view from typed parameters.
pub fn create_view(
    params: &CreationParams,
    engine: Box<dyn PlaybackEngine>,
    settings: ResourceSettings,
) -> Result<Controller, ViewError> {
    create_view_from_value(&params.to_value(), engine, settings)
}
