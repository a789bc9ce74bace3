//! Per-view controller.
//!
//! A controller is `Attached` while it holds a channel and `Disposed` once
//! the channel is cleared. The transition is one-way; disposing twice is a
//! no-op. Events from the peer are dispatched on a spawned task in arrival
//! order to the single registered [`AnimListener`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::channel::{Channel, ChannelError, ControllerEnd, InboundEvent, INVALID_ARGUMENTS_CODE};
use crate::content::{self, Content};
use crate::error::BridgeError;
use crate::protocol::{
    AnimationConfig, Command, Event, PlayOutcome, PlaybackFailure, ProtocolError, ScaleType,
};

/// Reject empty tags before any channel traffic.
pub fn validate_tag(tag: &str) -> Result<(), BridgeError> {
    if tag.is_empty() {
        return Err(BridgeError::EmptyTag);
    }
    Ok(())
}

type FailedFn = Box<dyn Fn(&PlaybackFailure) + Send + Sync>;
type ConfigFn = Box<dyn Fn(&AnimationConfig) + Send + Sync>;
type RenderFn = Box<dyn Fn(i64, Option<&AnimationConfig>) + Send + Sync>;
type SignalFn = Box<dyn Fn() + Send + Sync>;

/// One optional callback per event kind. Events without a callback are
/// dropped.
#[derive(Default)]
pub struct AnimListener {
    on_failed: Option<FailedFn>,
    on_video_config_ready: Option<ConfigFn>,
    on_video_start: Option<SignalFn>,
    on_video_render: Option<RenderFn>,
    on_video_complete: Option<SignalFn>,
    on_video_destroy: Option<SignalFn>,
}

impl AnimListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_failed(mut self, f: impl Fn(&PlaybackFailure) + Send + Sync + 'static) -> Self {
        self.on_failed = Some(Box::new(f));
        self
    }

    pub fn on_video_config_ready(
        mut self,
        f: impl Fn(&AnimationConfig) + Send + Sync + 'static,
    ) -> Self {
        self.on_video_config_ready = Some(Box::new(f));
        self
    }

    pub fn on_video_start(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_video_start = Some(Box::new(f));
        self
    }

    pub fn on_video_render(
        mut self,
        f: impl Fn(i64, Option<&AnimationConfig>) + Send + Sync + 'static,
    ) -> Self {
        self.on_video_render = Some(Box::new(f));
        self
    }

    pub fn on_video_complete(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_video_complete = Some(Box::new(f));
        self
    }

    pub fn on_video_destroy(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_video_destroy = Some(Box::new(f));
        self
    }

    /// Invoke the callback for `event`. Returns false when none is registered.
    pub fn dispatch(&self, event: &Event) -> bool {
        match event {
            Event::Failed { failure, .. } => self.on_failed.as_ref().map(|f| f(failure)).is_some(),
            Event::VideoConfigReady(config) => self
                .on_video_config_ready
                .as_ref()
                .map(|f| f(config))
                .is_some(),
            Event::VideoStart => self.on_video_start.as_ref().map(|f| f()).is_some(),
            Event::VideoRender {
                frame_index,
                config,
            } => self
                .on_video_render
                .as_ref()
                .map(|f| f(*frame_index, config.as_ref()))
                .is_some(),
            Event::VideoComplete => self.on_video_complete.as_ref().map(|f| f()).is_some(),
            Event::VideoDestroy => self.on_video_destroy.as_ref().map(|f| f()).is_some(),
        }
    }
}

impl std::fmt::Debug for AnimListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimListener")
            .field("on_failed", &self.on_failed.is_some())
            .field("on_video_config_ready", &self.on_video_config_ready.is_some())
            .field("on_video_start", &self.on_video_start.is_some())
            .field("on_video_render", &self.on_video_render.is_some())
            .field("on_video_complete", &self.on_video_complete.is_some())
            .field("on_video_destroy", &self.on_video_destroy.is_some())
            .finish()
    }
}

type PlayResult = Result<PlayOutcome, BridgeError>;

struct PlaySlot {
    id: u64,
    settle: oneshot::Sender<PlayResult>,
}

struct Inner {
    view_id: u64,
    channel: Mutex<Option<Arc<dyn Channel>>>,
    listener: RwLock<Arc<AnimListener>>,
    play_slot: Mutex<Option<PlaySlot>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    next_play_id: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    fn channel(&self) -> Result<Arc<dyn Channel>, BridgeError> {
        lock(&self.channel)
            .clone()
            .ok_or(BridgeError::ControllerDisposed)
    }

    fn is_disposed(&self) -> bool {
        lock(&self.channel).is_none()
    }

    fn listener(&self) -> Arc<AnimListener> {
        self.listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn take_play_slot(&self, id: u64) -> Option<PlaySlot> {
        let mut slot = lock(&self.play_slot);
        match slot.as_ref() {
            Some(pending) if pending.id == id => slot.take(),
            _ => None,
        }
    }

    /// Map a channel error, reporting a closed channel after teardown as a
    /// disposed controller.
    fn map_channel_error(&self, err: ChannelError) -> BridgeError {
        if err == ChannelError::Closed && self.is_disposed() {
            return BridgeError::ControllerDisposed;
        }
        err.into()
    }

    fn handle_event(&self, event: &Event) {
        // Only a failure tagged with the pending play's id settles it; a
        // late failure from an earlier play must not end a newer one.
        if let Event::Failed {
            failure,
            play_id: Some(play_id),
        } = event
        {
            if let Some(slot) = self.take_play_slot(*play_id) {
                log::debug!(
                    "View {}: failing play {} on {}",
                    self.view_id,
                    slot.id,
                    failure
                );
                let _ = slot.settle.send(Err(BridgeError::Playback(failure.clone())));
            }
        }
        if !self.listener().dispatch(event) {
            log::debug!(
                "View {}: no listener for {}, dropping",
                self.view_id,
                event.method()
            );
        }
    }
}

async fn dispatch_events(inner: Weak<Inner>, mut events: mpsc::UnboundedReceiver<InboundEvent>) {
    while let Some(inbound) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            inbound.acknowledge(Err(ChannelError::Closed));
            break;
        };
        if inner.is_disposed() {
            inbound.acknowledge(Err(ChannelError::Closed));
            break;
        }
        match Event::from_call(&inbound.call) {
            Ok(event) => {
                inner.handle_event(&event);
                inbound.acknowledge(Ok(()));
            }
            Err(ProtocolError::Unimplemented(method)) => {
                log::warn!(
                    "View {}: peer sent unknown event '{}'",
                    inner.view_id,
                    method
                );
                inbound.acknowledge(Err(ChannelError::NotImplemented(method)));
            }
            Err(err) => {
                log::warn!("View {}: malformed event: {}", inner.view_id, err);
                inbound.acknowledge(Err(ChannelError::peer(
                    INVALID_ARGUMENTS_CODE,
                    err.to_string(),
                )));
            }
        }
    }
}

/// Handle for one view instance.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<Inner>,
}

impl Controller {
    /// Create an attached controller that sends commands over `channel`.
    /// Events are not received until [`Controller::listen`] is called.
    pub fn new(view_id: u64, channel: Arc<dyn Channel>) -> Self {
        Self {
            inner: Arc::new(Inner {
                view_id,
                channel: Mutex::new(Some(channel)),
                listener: RwLock::new(Arc::new(AnimListener::default())),
                play_slot: Mutex::new(None),
                dispatcher: Mutex::new(None),
                next_play_id: AtomicU64::new(1),
            }),
        }
    }

    /// Create a controller over the controller half of a channel pair and
    /// start dispatching its events. Must be called inside a tokio runtime.
    pub fn attach(view_id: u64, end: ControllerEnd) -> Self {
        let controller = Self::new(view_id, Arc::new(end.channel));
        controller.listen(end.events);
        controller
    }

    /// Start dispatching events from `events`, replacing any earlier stream.
    pub fn listen(&self, events: mpsc::UnboundedReceiver<InboundEvent>) {
        let handle = tokio::spawn(dispatch_events(Arc::downgrade(&self.inner), events));
        let previous = lock(&self.inner.dispatcher).replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    pub fn view_id(&self) -> u64 {
        self.inner.view_id
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Whether a play invocation is waiting for its result.
    pub fn has_pending_play(&self) -> bool {
        lock(&self.inner.play_slot).is_some()
    }

    /// Replace the whole listener registration.
    pub fn set_anim_listener(&self, listener: AnimListener) {
        *self
            .inner
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(listener);
    }

    /// Play an animation file. Resolves when the play ends.
    pub async fn play_file(&self, path: impl Into<String>) -> Result<PlayOutcome, BridgeError> {
        let path = path.into();
        self.play(|play_id| Command::PlayFile {
            path,
            play_id: Some(play_id),
        })
        .await
    }

    /// Play a bundled animation asset. Resolves when the play ends.
    pub async fn play_asset(&self, name: impl Into<String>) -> Result<PlayOutcome, BridgeError> {
        let asset = name.into();
        self.play(|play_id| Command::PlayAsset {
            asset,
            play_id: Some(play_id),
        })
        .await
    }

    pub async fn stop(&self) -> Result<(), BridgeError> {
        self.send(Command::Stop).await.map(drop)
    }

    /// 0 plays once, -1 loops forever, n plays n+1 times.
    pub async fn set_loop(&self, count: i32) -> Result<(), BridgeError> {
        self.send(Command::SetLoop { count }).await.map(drop)
    }

    pub async fn set_mute(&self, muted: bool) -> Result<(), BridgeError> {
        self.send(Command::SetMute { muted }).await.map(drop)
    }

    pub async fn set_scale_type(&self, scale_type: ScaleType) -> Result<(), BridgeError> {
        self.send(Command::SetScaleType(scale_type)).await.map(drop)
    }

    pub async fn set_tag_content(
        &self,
        tag: impl Into<String>,
        content: Content,
    ) -> Result<(), BridgeError> {
        let tag = tag.into();
        validate_tag(&tag)?;
        self.send(Command::SetTagContent { tag, content })
            .await
            .map(drop)
    }

    /// Set several tags at once. An empty mapping sends nothing.
    pub async fn set_tag_contents(
        &self,
        contents: HashMap<String, Content>,
    ) -> Result<(), BridgeError> {
        for tag in contents.keys() {
            validate_tag(tag)?;
        }
        if contents.is_empty() {
            return Ok(());
        }
        self.send(Command::SetTagContents(contents)).await.map(drop)
    }

    pub async fn get_tag_content(
        &self,
        tag: impl Into<String>,
    ) -> Result<Option<Content>, BridgeError> {
        let tag = tag.into();
        validate_tag(&tag)?;
        let value = self.send(Command::GetTagContent { tag }).await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(Content::from_value(&value)?))
    }

    pub async fn get_all_tag_contents(&self) -> Result<HashMap<String, Content>, BridgeError> {
        let value = self.send(Command::GetAllTagContents).await?;
        if value.is_null() {
            return Ok(HashMap::new());
        }
        Ok(content::decode_batch(&value)?)
    }

    pub async fn clear_tag_contents(&self) -> Result<(), BridgeError> {
        self.send(Command::ClearTagContents).await.map(drop)
    }

    /// Release the channel. Safe to call more than once; teardown errors
    /// are swallowed.
    pub async fn dispose(&self) {
        let channel = lock(&self.inner.channel).take();
        let Some(channel) = channel else {
            return;
        };
        let dispatcher = lock(&self.inner.dispatcher).take();
        if let Some(dispatcher) = dispatcher {
            dispatcher.abort();
        }
        let pending = lock(&self.inner.play_slot).take();
        if let Some(slot) = pending {
            let _ = slot.settle.send(Err(BridgeError::ControllerDisposed));
        }
        if let Err(err) = channel.invoke(Command::Dispose.to_call()).await {
            log::debug!(
                "View {}: ignoring dispose error: {}",
                self.inner.view_id,
                err
            );
        }
        log::info!("View {} disposed", self.inner.view_id);
    }

    async fn send(&self, command: Command) -> Result<Value, BridgeError> {
        let channel = self.inner.channel()?;
        channel
            .invoke(command.to_call())
            .await
            .map_err(|e| self.inner.map_channel_error(e))
    }

    async fn play(&self, command: impl FnOnce(u64) -> Command) -> Result<PlayOutcome, BridgeError> {
        let channel = self.inner.channel()?;
        let id = self.inner.next_play_id.fetch_add(1, Ordering::Relaxed);
        let command = command(id);
        let command_method = command.method();
        let (settle, settled) = oneshot::channel();
        let previous = lock(&self.inner.play_slot).replace(PlaySlot { id, settle });
        if let Some(previous) = previous {
            log::info!(
                "View {}: play {} superseded by play {}",
                self.inner.view_id,
                previous.id,
                id
            );
            let _ = previous.settle.send(Ok(PlayOutcome::Superseded));
        }

        let mut settled = settled;
        let reply = tokio::select! {
            biased;
            reply = channel.invoke(command.to_call()) => reply,
            result = &mut settled => {
                return result.unwrap_or(Err(BridgeError::ControllerDisposed));
            }
        };
        // The slot may have been settled while the reply was in flight; that
        // result wins.
        if self.inner.take_play_slot(id).is_none() {
            if let Ok(result) = settled.await {
                return result;
            }
        }
        let value = reply.map_err(|e| self.inner.map_channel_error(e))?;
        PlayOutcome::from_value(&value).ok_or_else(|| {
            ProtocolError::InvalidArguments {
                method: command_method.to_string(),
                reason: format!("malformed play result: {}", value),
            }
            .into()
        })
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("view_id", &self.inner.view_id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
