/// Synchronous (request/response) transcription capability.
///
/// Retained as a collaborator alongside the streaming path, but narrowed to
/// its one operation: buffering strategy, sample limits, and retry policy
/// are left to the implementor.
use crate::error::CoreError;
use async_trait::async_trait;

#[async_trait]
pub trait SyncTranscriber: Send + Sync {
    /// Transcribes a complete recording given as raw audio bytes, returning
    /// the plain transcript text.
    async fn transcribe(&self, audio: &[u8]) -> Result<String, CoreError>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use mockall::mock;

    mock! {
        pub SyncTranscriber {}

        #[async_trait]
        impl SyncTranscriber for SyncTranscriber {
            async fn transcribe(&self, audio: &[u8]) -> Result<String, CoreError>;
        }
    }
}
