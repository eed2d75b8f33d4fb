/// Plugins: optional behavior hung off a [`crate::recorder::RecorderCore`]
/// through the [`crate::ports::Plugin`] extension point.
pub mod streaming_transcription;

pub use streaming_transcription::{SessionFactory, StreamingTranscriptionPlugin};
