/// Audio source capability.
///
/// This is the only interface the core depends on to capture microphone
/// audio; permission handling, device enumeration, and the actual OS audio
/// session live outside this crate, in whatever adapter the embedder
/// supplies.
use crate::domain::models::{AudioFrame, RecordingConfig};
use crate::error::CoreError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Invoked once per captured frame, in capture order. Implementations must
/// not reorder or coalesce frames.
pub type AudioCallback = Arc<dyn Fn(AudioFrame) -> BoxFuture<'static, ()> + Send + Sync>;

/// Port trait for audio capture functionality.
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Whether the underlying OS audio session currently holds this source.
    fn is_recording(&self) -> bool;

    /// Starts capturing audio at `config`, invoking `on_audio` for every
    /// frame. Returns once capture has actually begun (or failed).
    async fn start_recording(
        &self,
        config: RecordingConfig,
        on_audio: AudioCallback,
    ) -> Result<(), CoreError>;

    /// Stops capturing audio. Infallible and idempotent.
    async fn stop_recording(&self);
}
