/// Streaming transport capability.
///
/// The core depends only on this trait to open a bidirectional,
/// message-oriented connection to a remote transcription server; the
/// concrete transport (a WebSocket client, in practice) is supplied by the
/// embedder the way `DeepgramStreamingSession` supplies one for Deepgram.
use crate::error::CoreError;
use async_trait::async_trait;
use std::sync::Arc;

/// A connection attempt's request: URL plus headers, rebuilt on every retry
/// by the pluggable `create_request`/`on_retry_attempt` hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl ConnectRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// Event surface a transport pushes events through. Implemented by
/// [`crate::session::AsyncSession`] itself so it can translate raw transport
/// events into its own listener's calls.
#[async_trait]
pub trait SessionListener: Send + Sync {
    async fn on_open(&self);
    async fn on_message(&self, text: String);
    async fn on_error(&self, error: CoreError);
    async fn on_close(&self);
}

/// Port trait for the underlying bidirectional transport.
#[async_trait]
pub trait StreamingTransport: Send + Sync {
    /// Connects using `request`, wiring transport events to `listener`.
    /// Implementations run their own receive loop in the background and
    /// report through `listener` until `disconnect` is called or the
    /// connection drops.
    async fn connect(
        &self,
        request: ConnectRequest,
        listener: Arc<dyn SessionListener>,
    ) -> Result<(), CoreError>;

    /// Closes the transport. Idempotent.
    async fn disconnect(&self);

    /// Sends a text frame. Returns `false` if the transport is not open.
    async fn send_text(&self, text: String) -> bool;

    /// Sends a binary frame. Returns `false` if the transport is not open.
    async fn send_bytes(&self, bytes: Vec<u8>) -> bool;

    /// Whether the transport currently believes itself closed (used by the
    /// graceful-close poll during disconnect).
    fn is_closed(&self) -> bool;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use mockall::mock;

    mock! {
        pub StreamingTransport {}

        #[async_trait]
        impl StreamingTransport for StreamingTransport {
            async fn connect(
                &self,
                request: ConnectRequest,
                listener: Arc<dyn SessionListener>,
            ) -> Result<(), CoreError>;
            async fn disconnect(&self);
            async fn send_text(&self, text: String) -> bool;
            async fn send_bytes(&self, bytes: Vec<u8>) -> bool;
            fn is_closed(&self) -> bool;
        }
    }

    mock! {
        pub SessionListener {}

        #[async_trait]
        impl SessionListener for SessionListener {
            async fn on_open(&self);
            async fn on_message(&self, text: String);
            async fn on_error(&self, error: CoreError);
            async fn on_close(&self);
        }
    }
}
