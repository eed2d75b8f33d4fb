/// Holds recorder state, the per-event callback registries, and the
/// published stream of state changes that presenters subscribe to.
use crate::domain::models::{AudioFrame, RecorderState};
use crate::error::CoreError;
use crate::recorder::callbacks::{CallbackHandle, CallbackRegistry};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

type AsyncCallback<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Imperative forwarder installed by the owning [`crate::recorder::RecorderCore`]
/// so that code holding only a `RecorderModel` (e.g. a plugin, which must
/// never hold a strong reference back to its owning core — see the
/// weak-back-reference note on [`crate::ports::Plugin`]) can still trigger a
/// `start`/`stop` cycle.
type ImperativeForwarder = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub struct RecorderModel {
    state: Mutex<RecorderState>,
    state_tx: watch::Sender<RecorderState>,

    on_state_update: CallbackRegistry<RecorderState>,
    on_before_start: CallbackRegistry<()>,
    on_start: CallbackRegistry<()>,
    on_before_stop: CallbackRegistry<()>,
    on_stop: CallbackRegistry<()>,
    on_error: CallbackRegistry<CoreError>,
    on_audio_frame: CallbackRegistry<AudioFrame>,

    // Plain std mutex: installed once, synchronously, at construction time,
    // before the model is ever shared — an async mutex would force the
    // installing constructor to run inside an executor for no benefit.
    start_fn: std::sync::Mutex<Option<ImperativeForwarder>>,
    stop_fn: std::sync::Mutex<Option<ImperativeForwarder>>,
}

impl Default for RecorderModel {
    fn default() -> Self {
        let (state_tx, _rx) = watch::channel(RecorderState::Idle);
        Self {
            state: Mutex::new(RecorderState::Idle),
            state_tx,
            on_state_update: CallbackRegistry::new(),
            on_before_start: CallbackRegistry::new(),
            on_start: CallbackRegistry::new(),
            on_before_stop: CallbackRegistry::new(),
            on_stop: CallbackRegistry::new(),
            on_error: CallbackRegistry::new(),
            on_audio_frame: CallbackRegistry::new(),
            start_fn: std::sync::Mutex::new(None),
            stop_fn: std::sync::Mutex::new(None),
        }
    }
}

impl RecorderModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn state(&self) -> RecorderState {
        *self.state.lock().await
    }

    /// A read-only view onto the state stream; the initial value is
    /// observed immediately, subsequent ones as `update_state` is called.
    pub fn state_stream(&self) -> watch::Receiver<RecorderState> {
        self.state_tx.subscribe()
    }

    /// Stores `new` and dispatches `state_update` callbacks with it. Callers
    /// on the same recorder must serialize calls to this (see the lifecycle
    /// mutex in [`crate::recorder::core::RecorderCore`]); this method itself
    /// does not reorder concurrent calls.
    pub async fn update_state(&self, new: RecorderState) {
        *self.state.lock().await = new;
        let _ = self.state_tx.send(new);
        self.on_state_update.dispatch(new).await;
    }

    pub async fn on_state_update(&self, callback: AsyncCallback<RecorderState>) -> CallbackHandle {
        self.on_state_update.register(callback).await
    }

    pub async fn on_before_start(&self, callback: AsyncCallback<()>) -> CallbackHandle {
        self.on_before_start.register(callback).await
    }

    pub async fn on_start(&self, callback: AsyncCallback<()>) -> CallbackHandle {
        self.on_start.register(callback).await
    }

    pub async fn on_before_stop(&self, callback: AsyncCallback<()>) -> CallbackHandle {
        self.on_before_stop.register(callback).await
    }

    pub async fn on_stop(&self, callback: AsyncCallback<()>) -> CallbackHandle {
        self.on_stop.register(callback).await
    }

    pub async fn on_error(&self, callback: AsyncCallback<CoreError>) -> CallbackHandle {
        self.on_error.register(callback).await
    }

    pub async fn on_audio_frame(&self, callback: AsyncCallback<AudioFrame>) -> CallbackHandle {
        self.on_audio_frame.register(callback).await
    }

    pub async fn deregister_state_update(&self, handle: CallbackHandle) {
        self.on_state_update.deregister(handle).await;
    }

    pub async fn deregister_before_start(&self, handle: CallbackHandle) {
        self.on_before_start.deregister(handle).await;
    }

    pub async fn deregister_start(&self, handle: CallbackHandle) {
        self.on_start.deregister(handle).await;
    }

    pub async fn deregister_before_stop(&self, handle: CallbackHandle) {
        self.on_before_stop.deregister(handle).await;
    }

    pub async fn deregister_stop(&self, handle: CallbackHandle) {
        self.on_stop.deregister(handle).await;
    }

    pub async fn deregister_error(&self, handle: CallbackHandle) {
        self.on_error.deregister(handle).await;
    }

    pub async fn deregister_audio_frame(&self, handle: CallbackHandle) {
        self.on_audio_frame.deregister(handle).await;
    }

    pub(crate) async fn invoke_before_start(&self) {
        self.on_before_start.dispatch(()).await;
    }

    pub(crate) async fn invoke_start(&self) {
        self.on_start.dispatch(()).await;
    }

    pub(crate) async fn invoke_before_stop(&self) {
        self.on_before_stop.dispatch(()).await;
    }

    pub(crate) async fn invoke_stop(&self) {
        self.on_stop.dispatch(()).await;
    }

    /// Dispatches to the `error` channel. [`crate::error::Cancelled`] never
    /// reaches here — it is filtered at the point it is produced, not here.
    pub(crate) async fn invoke_error(&self, error: CoreError) {
        self.on_error.dispatch(error).await;
    }

    pub(crate) async fn invoke_audio_frame(&self, frame: AudioFrame) {
        self.on_audio_frame.dispatch(frame).await;
    }

    /// Installed once by the owning [`crate::recorder::RecorderCore`] at
    /// construction. Unset by default, per §4.1.
    pub(crate) fn set_start_fn(&self, f: ImperativeForwarder) {
        *self.start_fn.lock().expect("start_fn mutex poisoned") = Some(f);
    }

    pub(crate) fn set_stop_fn(&self, f: ImperativeForwarder) {
        *self.stop_fn.lock().expect("stop_fn mutex poisoned") = Some(f);
    }

    /// Forwards to the core's `start()` if one has been installed;
    /// a no-op otherwise (e.g. a model used outside a `RecorderCore` in a
    /// test). Used by plugins that can only see the model, never the core.
    pub async fn start(&self) {
        let f = self
            .start_fn
            .lock()
            .expect("start_fn mutex poisoned")
            .clone();
        if let Some(f) = f {
            f().await;
        }
    }

    /// Forwards to the core's `stop()`. See [`Self::start`].
    pub async fn stop(&self) {
        let f = self
            .stop_fn
            .lock()
            .expect("stop_fn mutex poisoned")
            .clone();
        if let Some(f) = f {
            f().await;
        }
    }
}
