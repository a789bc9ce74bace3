//! Native side of one view's channel.
//!
//! [`PeerAdapter`] owns the tag contents, the playback settings and the
//! opaque [`PlaybackEngine`]. It serves commands from the controller and
//! relays engine events back, settling the single outstanding play reply on
//! the play's terminal event.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::channel::{
    ChannelError, EventSink, Reply, Request, Responder, EMPTY_TAG_CODE, INVALID_ARGUMENTS_CODE,
};
use crate::content::{self, Content};
use crate::protocol::{
    error_codes, AnimationConfig, Command, CreationParams, Event, PlayOutcome, PlaybackFailure,
    ProtocolError, ScaleType,
};
use crate::resolver::{
    resolve_asset_path, resolve_file_path, ContentResolver, ResolveError, ResourceProvider,
    ResourceSettings, TagStore,
};

/// Everything the engine needs to start one play.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRequest {
    pub path: PathBuf,
    /// 0 plays once, -1 loops forever, n plays n+1 times.
    pub repeat: i32,
    pub mute: bool,
    pub scale_type: ScaleType,
}

/// Event handle for a single play invocation.
#[derive(Debug, Clone)]
pub struct PlayEvents {
    play_id: u64,
    tx: mpsc::UnboundedSender<(u64, Event)>,
}

impl PlayEvents {
    pub fn play_id(&self) -> u64 {
        self.play_id
    }

    pub fn emit(&self, event: Event) {
        if self.tx.send((self.play_id, event)).is_err() {
            log::debug!("Play {}: peer stopped, dropping engine event", self.play_id);
        }
    }

    pub fn config_ready(&self, config: AnimationConfig) {
        self.emit(Event::VideoConfigReady(config));
    }

    pub fn start(&self) {
        self.emit(Event::VideoStart);
    }

    pub fn render(&self, frame_index: i64, config: Option<AnimationConfig>) {
        self.emit(Event::VideoRender {
            frame_index,
            config,
        });
    }

    pub fn complete(&self) {
        self.emit(Event::VideoComplete);
    }

    pub fn destroy(&self) {
        self.emit(Event::VideoDestroy);
    }

    pub fn failed(&self, failure: PlaybackFailure) {
        self.emit(Event::failed(failure));
    }
}

/// The engine play currently running, and the controller's id for it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ActivePlay {
    id: u64,
    token: Option<u64>,
}

/// The native decode/render engine behind one view.
///
/// Every play the engine accepts must end with exactly one of complete,
/// destroy or failed on its [`PlayEvents`]. Stopping a play ends it with
/// destroy.
pub trait PlaybackEngine: Send {
    /// Called once, before any play, with the tag resource capability.
    fn attach(&mut self, resources: Arc<dyn ResourceProvider>);

    fn start_play(&mut self, request: PlayRequest, events: PlayEvents)
        -> Result<(), PlaybackFailure>;

    fn stop(&mut self);

    fn set_mute(&mut self, _muted: bool) {}

    fn set_scale_type(&mut self, _scale_type: ScaleType) {}

    /// Tear down native resources. The adapter never uses the engine again.
    fn release(&mut self) {
        self.stop();
    }
}

fn lock_contents(store: &TagStore) -> MutexGuard<'_, std::collections::HashMap<String, Content>> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

fn empty_tag() -> ChannelError {
    ChannelError::peer(EMPTY_TAG_CODE, "tag must not be empty")
}

/// Serves one view's channel on behalf of its engine.
pub struct PeerAdapter {
    view_id: u64,
    engine: Box<dyn PlaybackEngine>,
    contents: TagStore,
    resolver: Arc<ContentResolver>,
    repeat: i32,
    mute: bool,
    scale_type: ScaleType,
    current_play: Option<ActivePlay>,
    pending_play: Option<Responder>,
    next_play_id: u64,
    events: EventSink,
}

impl PeerAdapter {
    pub fn new(
        view_id: u64,
        engine: Box<dyn PlaybackEngine>,
        params: CreationParams,
        settings: ResourceSettings,
        events: EventSink,
    ) -> Result<Self, ResolveError> {
        let contents: TagStore = Arc::new(Mutex::new(params.tag_contents.unwrap_or_default()));
        let resolver = Arc::new(ContentResolver::new(contents.clone(), settings)?);
        Ok(Self {
            view_id,
            engine,
            contents,
            resolver,
            repeat: params.repeat,
            mute: params.mute,
            scale_type: params.scale_type,
            current_play: None,
            pending_play: None,
            next_play_id: 1,
            events,
        })
    }

    /// Shared handle to this peer's tag contents.
    pub fn contents(&self) -> TagStore {
        self.contents.clone()
    }

    pub fn spawn(self, requests: mpsc::UnboundedReceiver<Request>) -> JoinHandle<()> {
        tokio::spawn(self.run(requests))
    }

    /// Serve until `dispose` or until the controller side goes away.
    pub async fn run(mut self, mut requests: mpsc::UnboundedReceiver<Request>) {
        let (engine_tx, mut engine_rx) = mpsc::unbounded_channel();
        self.engine.attach(self.resolver.clone());
        self.engine.set_mute(self.mute);
        self.engine.set_scale_type(self.scale_type);

        loop {
            tokio::select! {
                request = requests.recv() => {
                    let Some(request) = request else {
                        log::debug!("View {}: controller gone, tearing down", self.view_id);
                        self.teardown();
                        break;
                    };
                    if !self.handle_request(request, &engine_tx).await {
                        break;
                    }
                }
                Some((play_id, event)) = engine_rx.recv() => {
                    self.handle_engine_event(play_id, event);
                }
            }
        }
        log::info!("View {}: peer stopped", self.view_id);
    }

    /// Handle one command. Returns false once the peer is disposed.
    async fn handle_request(
        &mut self,
        request: Request,
        engine_tx: &mpsc::UnboundedSender<(u64, Event)>,
    ) -> bool {
        let (call, responder) = request.into_parts();
        let command = match Command::from_call(&call) {
            Ok(command) => command,
            Err(ProtocolError::Unimplemented(method)) => {
                log::warn!("View {}: unknown command '{}'", self.view_id, method);
                responder.respond(Err(ChannelError::NotImplemented(method)));
                return true;
            }
            Err(err) => {
                responder.respond(Err(ChannelError::peer(
                    INVALID_ARGUMENTS_CODE,
                    err.to_string(),
                )));
                return true;
            }
        };

        let reply: Reply = match command {
            Command::PlayFile { path, play_id } => {
                let path = resolve_file_path(&path, &self.resolver.settings().storage_dir);
                self.start_play(path, play_id, responder, engine_tx).await;
                return true;
            }
            Command::PlayAsset { asset, play_id } => {
                let path = resolve_asset_path(&asset, &self.resolver.settings().asset_root);
                self.start_play(path, play_id, responder, engine_tx).await;
                return true;
            }
            Command::Stop => {
                if self.current_play.is_some() {
                    self.engine.stop();
                }
                Ok(Value::Null)
            }
            Command::SetLoop { count } => {
                self.repeat = count;
                Ok(Value::Null)
            }
            Command::SetMute { muted } => {
                self.mute = muted;
                self.engine.set_mute(muted);
                Ok(Value::Null)
            }
            Command::SetScaleType(scale_type) => {
                self.scale_type = scale_type;
                self.engine.set_scale_type(scale_type);
                Ok(Value::Null)
            }
            Command::SetTagContent { tag, content } => {
                if tag.is_empty() {
                    Err(empty_tag())
                } else {
                    lock_contents(&self.contents).insert(tag, content);
                    Ok(Value::Null)
                }
            }
            Command::SetTagContents(contents) => {
                if contents.keys().any(String::is_empty) {
                    Err(empty_tag())
                } else {
                    lock_contents(&self.contents).extend(contents);
                    Ok(Value::Null)
                }
            }
            Command::GetTagContent { tag } => {
                if tag.is_empty() {
                    Err(empty_tag())
                } else {
                    Ok(lock_contents(&self.contents)
                        .get(&tag)
                        .map(Content::to_value)
                        .unwrap_or(Value::Null))
                }
            }
            Command::GetAllTagContents => {
                Ok(content::encode_batch(&lock_contents(&self.contents)))
            }
            Command::ClearTagContents => {
                lock_contents(&self.contents).clear();
                Ok(Value::Null)
            }
            Command::Dispose => {
                self.teardown();
                responder.respond(Ok(Value::Null));
                return false;
            }
        };
        responder.respond(reply);
        true
    }

    async fn start_play(
        &mut self,
        path: PathBuf,
        token: Option<u64>,
        responder: Responder,
        engine_tx: &mpsc::UnboundedSender<(u64, Event)>,
    ) {
        if let Some(previous) = self.pending_play.take() {
            log::info!("View {}: superseding in-flight play", self.view_id);
            previous.respond(Ok(PlayOutcome::Superseded.to_value()));
        }
        if self.current_play.take().is_some() {
            self.engine.stop();
        }

        let max_bytes = self.resolver.settings().max_file_bytes;
        if let Err(failure) = check_play_file(&path, max_bytes).await {
            self.fail_play(failure, token, responder);
            return;
        }

        let play_id = self.next_play_id;
        self.next_play_id += 1;
        let request = PlayRequest {
            path,
            repeat: self.repeat,
            mute: self.mute,
            scale_type: self.scale_type,
        };
        log::info!(
            "View {}: play {} of {}",
            self.view_id,
            play_id,
            request.path.display()
        );
        let events = PlayEvents {
            play_id,
            tx: engine_tx.clone(),
        };
        match self.engine.start_play(request, events) {
            Ok(()) => {
                self.current_play = Some(ActivePlay { id: play_id, token });
                self.pending_play = Some(responder);
            }
            Err(failure) => self.fail_play(failure, token, responder),
        }
    }

    fn fail_play(&self, failure: PlaybackFailure, token: Option<u64>, responder: Responder) {
        log::warn!("View {}: {}", self.view_id, failure);
        let reply = Err(ChannelError::from_failure(&failure));
        self.forward(&Event::Failed {
            failure,
            play_id: token,
        });
        responder.respond(reply);
    }

    fn handle_engine_event(&mut self, play_id: u64, mut event: Event) {
        let current = self.current_play.filter(|play| play.id == play_id);
        // Failures of earlier plays go out untagged so they cannot settle a newer play.
        if let Event::Failed { play_id: tag, .. } = &mut event {
            *tag = current.and_then(|play| play.token);
        }
        self.forward(&event);
        if current.is_none() || !event.is_terminal() {
            return;
        }
        self.current_play = None;
        if let Some(responder) = self.pending_play.take() {
            let reply = match &event {
                Event::Failed { failure, .. } => Err(ChannelError::from_failure(failure)),
                Event::VideoComplete => Ok(PlayOutcome::Completed.to_value()),
                _ => Ok(PlayOutcome::Stopped.to_value()),
            };
            responder.respond(reply);
        }
    }

    fn forward(&self, event: &Event) {
        if self.events.emit(event).is_err() {
            log::debug!(
                "View {}: controller gone, dropping {}",
                self.view_id,
                event.method()
            );
        }
    }

    fn teardown(&mut self) {
        self.current_play = None;
        self.engine.release();
        if let Some(responder) = self.pending_play.take() {
            responder.respond(Ok(PlayOutcome::Stopped.to_value()));
        }
        lock_contents(&self.contents).clear();
    }
}

/// Reject missing, non-regular, or oversized animation files.
async fn check_play_file(path: &Path, max_bytes: u64) -> Result<(), PlaybackFailure> {
    let metadata = tokio::fs::metadata(path).await.map_err(|_| {
        PlaybackFailure::new(
            error_codes::FILE_NOT_FOUND,
            format!("{} does not exist", path.display()),
        )
    })?;
    if !metadata.is_file() {
        return Err(PlaybackFailure::new(
            error_codes::FILE_NOT_FOUND,
            format!("{} is not a file", path.display()),
        ));
    }
    if metadata.len() > max_bytes {
        return Err(PlaybackFailure::new(
            error_codes::FILE_TOO_LARGE,
            format!(
                "{} is {} bytes, limit is {}",
                path.display(),
                metadata.len(),
                max_bytes
            ),
        ));
    }
    Ok(())
}
