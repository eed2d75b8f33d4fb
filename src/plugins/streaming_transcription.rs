//! Wires [`AsyncSession`] + [`MessageDecoder`] + [`TranscribeStream`] into a
//! [`Plugin`] that drives streaming transcription across a recorder cycle.
//!
//! Registers against [`RecorderModel`] with closures that hold only weak
//! back-references to this plugin and to the model (§9 "struct-with-
//! reference-types holding closures"): the plugin may be dropped from
//! `RecorderCore::set_plugins`/`release` without anything it registered
//! keeping it, or the model, alive past that point.

use crate::domain::models::AudioFrame;
use crate::domain::stream::TranscribeStream;
use crate::error::CoreError;
use crate::ports::plugin::Plugin;
use crate::ports::streaming::SessionListener;
use crate::recorder::callbacks::{CallbackHandle, CallbackRegistry};
use crate::recorder::model::RecorderModel;
use crate::session::{AsyncSession, MessageDecoder};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;

/// Builds a fresh [`AsyncSession`] for one recorder cycle. A session
/// connects exactly once per instance (§4.3), so a new one is required
/// every time `before_start` fires.
pub type SessionFactory = Arc<dyn Fn() -> Arc<AsyncSession> + Send + Sync>;

type StreamCallback<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

struct PluginState {
    stream: TranscribeStream,
    is_open: bool,
    is_closing: bool,
    is_connecting: bool,
    error: Option<CoreError>,
    session: Option<Arc<AsyncSession>>,
}

impl Default for PluginState {
    fn default() -> Self {
        Self {
            stream: TranscribeStream::new(),
            is_open: false,
            is_closing: false,
            is_connecting: false,
            error: None,
            session: None,
        }
    }
}

/// The plugin itself. Construct with [`StreamingTranscriptionPlugin::new`]
/// (never a bare `Self { .. }`) so `weak_self` is populated.
pub struct StreamingTranscriptionPlugin {
    weak_self: Weak<Self>,
    session_factory: SessionFactory,
    state: Mutex<PluginState>,
    on_stream_connecting: CallbackRegistry<()>,
    on_stream_started: CallbackRegistry<()>,
    on_stream_updated: CallbackRegistry<TranscribeStream>,
    on_stream_completed: CallbackRegistry<(TranscribeStream, Option<CoreError>)>,
}

impl StreamingTranscriptionPlugin {
    pub fn new(session_factory: SessionFactory) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            weak_self: weak_self.clone(),
            session_factory,
            state: Mutex::new(PluginState::default()),
            on_stream_connecting: CallbackRegistry::new(),
            on_stream_started: CallbackRegistry::new(),
            on_stream_updated: CallbackRegistry::new(),
            on_stream_completed: CallbackRegistry::new(),
        })
    }

    pub async fn current_stream(&self) -> TranscribeStream {
        self.state.lock().await.stream.clone()
    }

    pub async fn on_stream_connecting(&self, callback: StreamCallback<()>) -> CallbackHandle {
        self.on_stream_connecting.register(callback).await
    }

    pub async fn on_stream_started(&self, callback: StreamCallback<()>) -> CallbackHandle {
        self.on_stream_started.register(callback).await
    }

    pub async fn on_stream_updated(&self, callback: StreamCallback<TranscribeStream>) -> CallbackHandle {
        self.on_stream_updated.register(callback).await
    }

    pub async fn on_stream_completed(
        &self,
        callback: StreamCallback<(TranscribeStream, Option<CoreError>)>,
    ) -> CallbackHandle {
        self.on_stream_completed.register(callback).await
    }

    async fn handle_before_start(&self, model: Arc<RecorderModel>) {
        {
            let mut state = self.state.lock().await;
            if state.is_connecting {
                return;
            }
            *state = PluginState {
                is_connecting: true,
                ..PluginState::default()
            };
        }

        self.on_stream_connecting.dispatch(()).await;

        let session = (self.session_factory)();
        {
            let mut state = self.state.lock().await;
            state.session = Some(session.clone());
        }

        let listener: Arc<dyn SessionListener> = Arc::new(PluginListener {
            plugin: self.weak_self.clone(),
            model: Arc::downgrade(&model),
        });
        session.connect(listener).await;
    }

    async fn handle_audio_frame(&self, frame: AudioFrame) {
        let (is_open, session) = {
            let state = self.state.lock().await;
            (state.is_open, state.session.clone())
        };
        if !is_open {
            return;
        }
        if let Some(session) = session {
            session.send_bytes(encode_pcm_le(&frame)).await;
        }
    }

    async fn handle_before_stop(&self) {
        let session = {
            let mut state = self.state.lock().await;
            if state.is_closing {
                return;
            }
            state.is_closing = true;
            state.session.take()
        };
        if let Some(session) = session {
            session.disconnect().await;
        }
    }

    async fn handle_open(&self) {
        {
            let mut state = self.state.lock().await;
            state.is_open = true;
        }
        self.on_stream_started.dispatch(()).await;
    }

    async fn handle_message(&self, text: String, model: Arc<RecorderModel>) {
        let decoded = MessageDecoder::decode(&text);
        let actions = match decoded {
            Ok(actions) => actions,
            Err(decode_err) => {
                log::error!("failed to decode server message: {decode_err}");
                self.state.lock().await.error = Some(CoreError::Decode(decode_err));
                self.force_stop_and_close(model).await;
                return;
            }
        };

        let updated = {
            let mut state = self.state.lock().await;
            match state.stream.receive_actions(&actions) {
                Ok(new_stream) => {
                    state.stream = new_stream.clone();
                    Some(new_stream)
                }
                Err(err) => {
                    state.error = Some(err);
                    None
                }
            }
        };

        match updated {
            Some(new_stream) => self.on_stream_updated.dispatch(new_stream).await,
            None => self.force_stop_and_close(model).await,
        }
    }

    async fn handle_error(&self, error: CoreError, model: Arc<RecorderModel>) {
        self.state.lock().await.error = Some(error);
        self.force_stop_and_close(model).await;
    }

    async fn handle_close(&self) {
        let (was_connecting, stream, error) = {
            let mut state = self.state.lock().await;
            let was_connecting = state.is_connecting;
            state.is_connecting = false;
            state.is_open = false;
            (was_connecting, state.stream.clone(), state.error.clone())
        };
        if was_connecting {
            self.on_stream_completed.dispatch((stream, error)).await;
        }
    }

    /// `model.stop()` runs `before_stop`, which itself disconnects the
    /// session under normal conditions; this closes it directly too, so a
    /// decode/transport error is cleaned up even for a cycle that somehow
    /// never reaches that handler. Idempotent either way.
    async fn force_stop_and_close(&self, model: Arc<RecorderModel>) {
        model.stop().await;
        let session = self.state.lock().await.session.take();
        if let Some(session) = session {
            session.disconnect().await;
        }
    }
}

fn encode_pcm_le(frame: &AudioFrame) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(frame.samples.len() * 2);
    for sample in &frame.samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

struct PluginListener {
    plugin: Weak<StreamingTranscriptionPlugin>,
    model: Weak<RecorderModel>,
}

#[async_trait]
impl SessionListener for PluginListener {
    async fn on_open(&self) {
        if let Some(plugin) = self.plugin.upgrade() {
            plugin.handle_open().await;
        }
    }

    async fn on_message(&self, text: String) {
        if let (Some(plugin), Some(model)) = (self.plugin.upgrade(), self.model.upgrade()) {
            plugin.handle_message(text, model).await;
        }
    }

    async fn on_error(&self, error: CoreError) {
        if let (Some(plugin), Some(model)) = (self.plugin.upgrade(), self.model.upgrade()) {
            plugin.handle_error(error, model).await;
        }
    }

    async fn on_close(&self) {
        if let Some(plugin) = self.plugin.upgrade() {
            plugin.handle_close().await;
        }
    }
}

#[async_trait]
impl Plugin for StreamingTranscriptionPlugin {
    async fn activate(&self, model: Arc<RecorderModel>) {
        let weak_self = self.weak_self.clone();
        let weak_model = Arc::downgrade(&model);
        model
            .on_before_start(Arc::new(move |_: ()| {
                let weak_self = weak_self.clone();
                let weak_model = weak_model.clone();
                Box::pin(async move {
                    if let (Some(plugin), Some(model)) = (weak_self.upgrade(), weak_model.upgrade()) {
                        plugin.handle_before_start(model).await;
                    }
                })
            }))
            .await;

        let weak_self = self.weak_self.clone();
        model
            .on_audio_frame(Arc::new(move |frame: AudioFrame| {
                let weak_self = weak_self.clone();
                Box::pin(async move {
                    if let Some(plugin) = weak_self.upgrade() {
                        plugin.handle_audio_frame(frame).await;
                    }
                })
            }))
            .await;

        let weak_self = self.weak_self.clone();
        model
            .on_before_stop(Arc::new(move |_: ()| {
                let weak_self = weak_self.clone();
                Box::pin(async move {
                    if let Some(plugin) = weak_self.upgrade() {
                        plugin.handle_before_stop().await;
                    }
                })
            }))
            .await;
    }

    async fn deactivate(&self, _model: Arc<RecorderModel>) {
        let session = self.state.lock().await.session.take();
        if let Some(session) = session {
            session.disconnect().await;
        }
    }
}
