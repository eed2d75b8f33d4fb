//! Drives the recorder lifecycle state machine.
//!
//! A single [`tokio::sync::Mutex`] serializes `start`, `stop`, `set_plugins`,
//! and `release`: the OS audio session this crate's embedder guards behind
//! [`AudioSource`] is a process-global resource, and parallel transitions
//! would desynchronize the state machine from it. `start` splits into a
//! synchronous prelude (run under the mutex) and a cancellable tail task
//! (spawned from inside the mutex, holding no lock of its own) so that the
//! delay before capture begins does not stall a concurrent `stop`/`release`.

use crate::domain::models::{RecorderState, RecordingConfig};
use crate::error::CoreError;
use crate::ports::audio::{AudioCallback, AudioSource};
use crate::ports::plugin::Plugin;
use crate::recorder::model::RecorderModel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Drives the `Idle -> Loading -> Recording -> Processing -> Idle` lifecycle,
/// owns the plugin list, and coordinates the capture device through
/// [`AudioSource`].
pub struct RecorderCore {
    weak_self: Weak<Self>,
    model: Arc<RecorderModel>,
    audio_source: Arc<dyn AudioSource>,
    config: RecordingConfig,
    plugins: Mutex<Vec<Arc<dyn Plugin>>>,
    /// Serializes `start`/`stop`/`set_plugins`/`release` (§4.2, §5).
    lifecycle: Mutex<()>,
    /// Handle to the in-flight delayed-start tail task, if any is pending.
    pending_task: Mutex<Option<JoinHandle<()>>>,
    released: AtomicBool,
}

impl RecorderCore {
    pub fn new(audio_source: Arc<dyn AudioSource>) -> Arc<Self> {
        Self::with_config(audio_source, RecordingConfig::default())
    }

    pub fn with_config(audio_source: Arc<dyn AudioSource>, config: RecordingConfig) -> Arc<Self> {
        let model = Arc::new(RecorderModel::new());
        let core = Arc::new_cyclic(|weak_self: &Weak<Self>| Self {
            weak_self: weak_self.clone(),
            model,
            audio_source,
            config,
            plugins: Mutex::new(Vec::new()),
            lifecycle: Mutex::new(()),
            pending_task: Mutex::new(None),
            released: AtomicBool::new(false),
        });

        // Installed once, referencing only a weak handle back to the core,
        // so a plugin that calls `model.stop()` can never keep the core
        // alive, and the core's own drop is never blocked by the model.
        let start_weak = core.weak_self.clone();
        let stop_weak = core.weak_self.clone();
        core.model.set_start_fn(Arc::new(move || {
            let weak = start_weak.clone();
            Box::pin(async move {
                if let Some(core) = weak.upgrade() {
                    core.start(0).await;
                }
            })
        }));
        core.model.set_stop_fn(Arc::new(move || {
            let weak = stop_weak.clone();
            Box::pin(async move {
                if let Some(core) = weak.upgrade() {
                    core.stop(0).await;
                }
            })
        }));

        core
    }

    pub fn model(&self) -> Arc<RecorderModel> {
        self.model.clone()
    }

    pub async fn recorder_state(&self) -> RecorderState {
        self.model.state().await
    }

    pub fn recorder_state_stream(&self) -> watch::Receiver<RecorderState> {
        self.model.state_stream()
    }

    /// Atomically deactivates the previous plugin list (in reverse
    /// registration order) then activates `plugins` (in order). Serialized
    /// through the same mutex as `start`/`stop`/`release`.
    pub async fn set_plugins(&self, plugins: Vec<Arc<dyn Plugin>>) {
        let _guard = self.lifecycle.lock().await;
        let previous = {
            let mut slot = self.plugins.lock().await;
            std::mem::replace(&mut *slot, Vec::new())
        };
        for plugin in previous.iter().rev() {
            plugin.deactivate(self.model.clone()).await;
        }
        for plugin in &plugins {
            plugin.activate(self.model.clone()).await;
        }
        *self.plugins.lock().await = plugins;
    }

    /// `Idle -> Loading`, with the tail of the cycle (audio start, the
    /// `Loading -> Recording` transition, and `start` dispatch) running on a
    /// cancellable background task after `delay_ms` (see the table in §4.2).
    /// A no-op if released or not currently `Idle`.
    pub async fn start(self: &Arc<Self>, delay_ms: u64) {
        let _guard = self.lifecycle.lock().await;
        if self.released.load(Ordering::SeqCst) {
            return;
        }
        if self.model.state().await != RecorderState::Idle {
            return;
        }

        self.model.update_state(RecorderState::Loading).await;
        self.model.invoke_before_start().await;

        let model = self.model.clone();
        let audio_source = self.audio_source.clone();
        let config = self.config;

        let handle = tokio::spawn(async move {
            if delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            if let Err(err) = config.validate() {
                model.update_state(RecorderState::Idle).await;
                model.invoke_error(err).await;
                return;
            }

            let frame_model = model.clone();
            let on_audio: AudioCallback = Arc::new(move |frame| {
                let frame_model = frame_model.clone();
                Box::pin(async move {
                    frame_model.invoke_audio_frame(frame).await;
                })
            });

            match audio_source.start_recording(config, on_audio).await {
                Ok(()) => {
                    log::info!("recorder started capture, state -> Recording");
                    model.update_state(RecorderState::Recording).await;
                    model.invoke_start().await;
                }
                Err(err) => {
                    log::error!("recorder failed to start capture: {err}");
                    model.update_state(RecorderState::Idle).await;
                    model.invoke_error(err).await;
                }
            }
        });

        *self.pending_task.lock().await = Some(handle);
    }

    /// `Recording -> Processing -> Idle`. A no-op unless currently
    /// `Recording` (the exhaustive transition table in §4.2 lists no other
    /// source state for `stop`). Held under the lifecycle mutex for its
    /// entire duration, including `delay_ms`, since unlike `start` nothing
    /// here benefits from running detached.
    pub async fn stop(self: &Arc<Self>, delay_ms: u64) {
        let _guard = self.lifecycle.lock().await;
        if self.released.load(Ordering::SeqCst) {
            return;
        }
        if self.model.state().await != RecorderState::Recording {
            return;
        }

        log::info!("recorder stopping, state -> Processing");
        self.model.update_state(RecorderState::Processing).await;
        self.model.invoke_before_stop().await;

        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        self.audio_source.stop_recording().await;

        // The delayed-start task has long since completed by the time we can
        // reach `Recording`, but cancel defensively in case a caller reused a
        // handle incorrectly.
        if let Some(task) = self.pending_task.lock().await.take() {
            task.abort();
        }

        self.model.invoke_stop().await;
        self.model.update_state(RecorderState::Idle).await;
    }

    /// Deactivates plugins (in reverse registration order, matching
    /// `set_plugins` and `Plugin::deactivate`'s contract), cancels any
    /// pending delayed task, stops the audio source, and marks the core
    /// released. Idempotent; a released core never starts again.
    pub async fn release(&self) {
        let _guard = self.lifecycle.lock().await;
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        let plugins = {
            let mut slot = self.plugins.lock().await;
            std::mem::replace(&mut *slot, Vec::new())
        };
        for plugin in plugins.iter().rev() {
            plugin.deactivate(self.model.clone()).await;
        }

        if let Some(task) = self.pending_task.lock().await.take() {
            task.abort();
        }

        self.audio_source.stop_recording().await;
        self.model.update_state(RecorderState::Idle).await;
    }
}
