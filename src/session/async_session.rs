//! Manages one streaming connection to a remote transcription server:
//! connect-with-retry, the open-message handshake, an ordered receive loop,
//! graceful close with a server-ack timeout, and back-pressure-free sends.
//!
//! `AsyncSession` is both a client of [`StreamingTransport`] and (internally)
//! a [`SessionListener`] of its own transport connection: transport events
//! arrive on `AsyncSession` first, which updates connection status and the
//! handshake bookkeeping before relaying to the caller's listener.

use crate::error::CoreError;
use crate::ports::streaming::{ConnectRequest, SessionListener, StreamingTransport};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;

const DISCONNECT_TIMEOUT_MS: u64 = 5_000;
const DISCONNECT_POLL_MS: u64 = 50;

/// Internal connection status (§3). Only `Open` accepts outbound sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionStatus {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

/// Overridable policy hooks (§4.3/§9): a single connection engine serving
/// multiple protocol variants with different auth and framing needs only a
/// new `SessionHooks` impl, not a new `AsyncSession`.
#[async_trait]
pub trait SessionHooks: Send + Sync {
    /// Builds the first connect request.
    fn create_request(&self) -> ConnectRequest;

    /// Builds the next request after a failed attempt. `attempt` is 1 for
    /// the first retry. Implementations typically refresh an auth token
    /// here. Defaults to retrying the same request unchanged.
    fn on_retry_attempt(
        &self,
        attempt: u32,
        previous: &ConnectRequest,
        error: &CoreError,
    ) -> ConnectRequest {
        let _ = (attempt, error);
        previous.clone()
    }

    /// Client -> server message sent immediately after a successful connect,
    /// if any (e.g. the `ClientConfiguration` message in §6).
    fn open_message(&self) -> Option<String> {
        None
    }

    /// Client -> server message sent at the start of a graceful close, if
    /// any. The exact shape is transport/protocol-defined (§6).
    fn close_message(&self) -> Option<String> {
        None
    }
}

/// A permissive default: no open/close handshake, no retry.
pub struct NoHandshakeHooks {
    url: String,
}

impl NoHandshakeHooks {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl SessionHooks for NoHandshakeHooks {
    fn create_request(&self) -> ConnectRequest {
        ConnectRequest::new(self.url.clone())
    }
}

struct Inner {
    status: ConnectionStatus,
    listener: Option<Arc<dyn SessionListener>>,
    /// Set the first time `connect` is called; never cleared. A session
    /// connects exactly once per instance lifetime (§4.3); a fresh instance
    /// is required after close.
    connect_attempted: bool,
}

/// One streaming connection. See the module docs for the overall algorithm.
pub struct AsyncSession {
    transport: Arc<dyn StreamingTransport>,
    hooks: Arc<dyn SessionHooks>,
    retry_count: u32,
    inner: Mutex<Inner>,
}

impl AsyncSession {
    pub fn new(transport: Arc<dyn StreamingTransport>, hooks: Arc<dyn SessionHooks>, retry_count: u32) -> Arc<Self> {
        Arc::new(Self {
            transport,
            hooks,
            retry_count,
            inner: Mutex::new(Inner {
                status: ConnectionStatus::Disconnected,
                listener: None,
                connect_attempted: false,
            }),
        })
    }

    /// Connects exactly once per instance lifetime. A second concurrent
    /// call blocks on the internal mutex (since the first call holds it for
    /// the whole attempt-with-retries loop) and then returns without side
    /// effects, per §4.3.
    pub async fn connect(self: &Arc<Self>, listener: Arc<dyn SessionListener>) {
        let mut inner = self.inner.lock().await;
        if inner.connect_attempted {
            return;
        }
        inner.connect_attempted = true;
        inner.listener = Some(listener);
        inner.status = ConnectionStatus::Connecting;

        let mut attempt: u32 = 0;
        let mut request = self.hooks.create_request();
        let mut remaining = self.retry_count;

        loop {
            let as_listener: Arc<dyn SessionListener> = self.clone();
            match self.transport.connect(request.clone(), as_listener).await {
                Ok(()) => {
                    if let Some(open_message) = self.hooks.open_message() {
                        self.transport.send_text(open_message).await;
                    }
                    inner.status = ConnectionStatus::Open;
                    if let Some(listener) = inner.listener.clone() {
                        drop(inner);
                        listener.on_open().await;
                    }
                    return;
                }
                Err(err) => {
                    if remaining > 0 {
                        remaining -= 1;
                        attempt += 1;
                        log::warn!("connect attempt {attempt} failed ({err}), retrying");
                        request = self.hooks.on_retry_attempt(attempt, &request, &err);
                        continue;
                    }
                    log::error!("connect failed after {attempt} retries: {err}");
                    inner.status = ConnectionStatus::Disconnected;
                    let listener = inner.listener.clone();
                    drop(inner);
                    if let Some(listener) = listener {
                        listener.on_error(CoreError::Unknown(err.to_string())).await;
                    }
                    return;
                }
            }
        }
    }

    /// Idempotent. A no-op unless `Open`. Sends [`SessionHooks::close_message`]
    /// (if any) then polls [`StreamingTransport::is_closed`] every 50 ms up
    /// to 5000 ms; on timeout, force-closes and emits `DisconnectTimeout`.
    pub async fn disconnect(&self) {
        {
            let mut inner = self.inner.lock().await;
            if inner.status != ConnectionStatus::Open {
                return;
            }
            inner.status = ConnectionStatus::Closing;
        }

        match self.hooks.close_message() {
            Some(message) => {
                self.transport.send_text(message).await;
            }
            None => {
                self.transport.disconnect().await;
            }
        }

        let mut waited_ms = 0u64;
        while waited_ms < DISCONNECT_TIMEOUT_MS {
            if self.transport.is_closed() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(DISCONNECT_POLL_MS)).await;
            waited_ms += DISCONNECT_POLL_MS;
        }

        if !self.transport.is_closed() {
            log::warn!("disconnect timed out waiting for server acknowledgement, forcing close");
            self.transport.disconnect().await;
            let listener = {
                let inner = self.inner.lock().await;
                inner.listener.clone()
            };
            if let Some(listener) = &listener {
                listener.on_error(CoreError::DisconnectTimeout).await;
            }
        }

        self.finish_close().await;
    }

    /// Sends a text frame. Returns `false` (and drops the message; no
    /// internal buffering) unless currently `Open`.
    pub async fn send_text(&self, text: String) -> bool {
        if self.inner.lock().await.status != ConnectionStatus::Open {
            return false;
        }
        self.transport.send_text(text).await
    }

    /// Sends a binary frame (e.g. a PCM audio chunk). See [`Self::send_text`].
    pub async fn send_bytes(&self, bytes: Vec<u8>) -> bool {
        if self.inner.lock().await.status != ConnectionStatus::Open {
            return false;
        }
        self.transport.send_bytes(bytes).await
    }

    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.status == ConnectionStatus::Open
    }

    /// Marks the session `Disconnected` and fires `on_close` exactly once:
    /// `listener.take()` makes this safe to call from both the natural
    /// receive-loop close path and a forced `disconnect()` timeout without
    /// double-dispatching.
    async fn finish_close(&self) {
        let listener = {
            let mut inner = self.inner.lock().await;
            inner.status = ConnectionStatus::Disconnected;
            inner.listener.take()
        };
        if let Some(listener) = listener {
            listener.on_close().await;
        }
    }
}

#[async_trait]
impl SessionListener for AsyncSession {
    async fn on_open(&self) {
        // The success branch of `connect` already fires `on_open`; a
        // transport that emits it again (e.g. after an internal reconnect)
        // is simply relayed.
        let listener = self.inner.lock().await.listener.clone();
        if let Some(listener) = listener {
            listener.on_open().await;
        }
    }

    async fn on_message(&self, text: String) {
        let listener = self.inner.lock().await.listener.clone();
        if let Some(listener) = listener {
            listener.on_message(text).await;
        }
    }

    async fn on_error(&self, error: CoreError) {
        let (closing, listener) = {
            let inner = self.inner.lock().await;
            (inner.status == ConnectionStatus::Closing, inner.listener.clone())
        };
        // A read error surfacing while we're already tearing the connection
        // down ourselves is expected, not a fault to report (§4.3).
        if closing {
            return;
        }
        if let Some(listener) = listener {
            listener.on_error(error).await;
        }
    }

    async fn on_close(&self) {
        self.finish_close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::streaming::mocks::{MockSessionListener, MockStreamingTransport};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    fn hooks(url: &str) -> Arc<dyn SessionHooks> {
        Arc::new(NoHandshakeHooks::new(url))
    }

    #[tokio::test]
    async fn connect_success_fires_on_open_and_marks_open() {
        let mut transport = MockStreamingTransport::new();
        transport
            .expect_connect()
            .returning(|_req, _listener| Box::pin(async { Ok(()) }));
        transport.expect_send_text().returning(|_| Box::pin(async { true }));
        transport.expect_is_closed().returning(|| false);

        let session = AsyncSession::new(Arc::new(transport), hooks("wss://example"), 0);

        let mut listener = MockSessionListener::new();
        let opened = Arc::new(AtomicBool::new(false));
        let opened2 = opened.clone();
        listener.expect_on_open().returning(move || {
            let opened2 = opened2.clone();
            Box::pin(async move {
                opened2.store(true, Ordering::SeqCst);
            })
        });
        listener.expect_on_message().returning(|_| Box::pin(async {}));
        listener.expect_on_error().returning(|_| Box::pin(async {}));
        listener.expect_on_close().returning(|| Box::pin(async {}));

        session.connect(Arc::new(listener)).await;
        assert!(opened.load(Ordering::SeqCst));
        assert!(session.is_open().await);
    }

    #[tokio::test]
    async fn second_connect_call_is_a_noop() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts2 = attempts.clone();
        let mut transport = MockStreamingTransport::new();
        transport.expect_connect().returning(move |_req, _listener| {
            attempts2.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        });
        transport.expect_send_text().returning(|_| Box::pin(async { true }));
        transport.expect_is_closed().returning(|| false);

        let session = AsyncSession::new(Arc::new(transport), hooks("wss://example"), 0);
        let mut listener = MockSessionListener::new();
        listener.expect_on_open().returning(|| Box::pin(async {}));
        listener.expect_on_message().returning(|_| Box::pin(async {}));
        listener.expect_on_error().returning(|_| Box::pin(async {}));
        listener.expect_on_close().returning(|| Box::pin(async {}));
        let listener = Arc::new(listener);

        session.connect(listener.clone()).await;
        session.connect(listener).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connect_failure_exhausts_retries_then_reports_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts2 = attempts.clone();
        let mut transport = MockStreamingTransport::new();
        transport.expect_connect().returning(move |_req, _listener| {
            attempts2.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(CoreError::ConnectFailed("refused".into())) })
        });
        transport.expect_is_closed().returning(|| true);

        let session = AsyncSession::new(Arc::new(transport), hooks("wss://example"), 2);
        let mut listener = MockSessionListener::new();
        listener.expect_on_open().returning(|| Box::pin(async {}));
        listener.expect_on_message().returning(|_| Box::pin(async {}));
        let errors = Arc::new(std::sync::Mutex::new(Vec::new()));
        let errors2 = errors.clone();
        listener.expect_on_error().returning(move |e| {
            let errors2 = errors2.clone();
            Box::pin(async move {
                errors2.lock().unwrap().push(e);
            })
        });
        listener.expect_on_close().returning(|| Box::pin(async {}));

        session.connect(Arc::new(listener)).await;
        // 1 initial attempt + 2 retries = 3 total.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(errors.lock().unwrap().len(), 1);
        assert!(!session.is_open().await);
    }

    #[tokio::test]
    async fn send_drops_silently_when_not_open() {
        let transport = MockStreamingTransport::new();
        let session = AsyncSession::new(Arc::new(transport), hooks("wss://example"), 0);
        assert!(!session.send_text("hi".into()).await);
        assert!(!session.send_bytes(vec![1, 2, 3]).await);
    }

    #[tokio::test]
    async fn graceful_disconnect_sends_close_message_and_closes() {
        struct CloseHooks;
        impl SessionHooks for CloseHooks {
            fn create_request(&self) -> ConnectRequest {
                ConnectRequest::new("wss://example")
            }
            fn close_message(&self) -> Option<String> {
                Some("{\"type\":\"CloseStream\"}".into())
            }
        }

        let closed = Arc::new(AtomicBool::new(false));
        let closed2 = closed.clone();
        let mut transport = MockStreamingTransport::new();
        transport
            .expect_connect()
            .returning(|_req, _listener| Box::pin(async { Ok(()) }));
        transport.expect_send_text().returning(move |text| {
            let closed2 = closed2.clone();
            if text.contains("CloseStream") {
                closed2.store(true, Ordering::SeqCst);
            }
            Box::pin(async { true })
        });
        transport
            .expect_is_closed()
            .returning(move || closed.load(Ordering::SeqCst));
        transport.expect_disconnect().returning(|| Box::pin(async {}));

        let session = AsyncSession::new(Arc::new(transport), Arc::new(CloseHooks), 0);
        let mut listener = MockSessionListener::new();
        listener.expect_on_open().returning(|| Box::pin(async {}));
        listener.expect_on_message().returning(|_| Box::pin(async {}));
        listener.expect_on_error().returning(|_| Box::pin(async {}));
        let close_count = Arc::new(AtomicU32::new(0));
        let close_count2 = close_count.clone();
        listener.expect_on_close().returning(move || {
            let close_count2 = close_count2.clone();
            Box::pin(async move {
                close_count2.fetch_add(1, Ordering::SeqCst);
            })
        });

        session.connect(Arc::new(listener)).await;
        session.disconnect().await;
        assert_eq!(close_count.load(Ordering::SeqCst), 1);
        assert!(!session.is_open().await);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_timeout_reports_error_then_closes_once() {
        let mut transport = MockStreamingTransport::new();
        transport
            .expect_connect()
            .returning(|_req, _listener| Box::pin(async { Ok(()) }));
        transport.expect_send_text().returning(|_| Box::pin(async { true }));
        // Peer never closes.
        transport.expect_is_closed().returning(|| false);
        transport.expect_disconnect().returning(|| Box::pin(async {}));

        let session = AsyncSession::new(Arc::new(transport), hooks("wss://example"), 0);
        let mut listener = MockSessionListener::new();
        listener.expect_on_open().returning(|| Box::pin(async {}));
        listener.expect_on_message().returning(|_| Box::pin(async {}));
        let errors = Arc::new(std::sync::Mutex::new(Vec::new()));
        let errors2 = errors.clone();
        listener.expect_on_error().returning(move |e| {
            let errors2 = errors2.clone();
            Box::pin(async move {
                errors2.lock().unwrap().push(e);
            })
        });
        let close_count = Arc::new(AtomicU32::new(0));
        let close_count2 = close_count.clone();
        listener.expect_on_close().returning(move || {
            let close_count2 = close_count2.clone();
            Box::pin(async move {
                close_count2.fetch_add(1, Ordering::SeqCst);
            })
        });

        session.connect(Arc::new(listener)).await;
        session.disconnect().await;

        assert_eq!(errors.lock().unwrap().len(), 1);
        assert_eq!(errors.lock().unwrap()[0], CoreError::DisconnectTimeout);
        assert_eq!(close_count.load(Ordering::SeqCst), 1);
    }
}
