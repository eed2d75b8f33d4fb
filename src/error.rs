//! Crate-wide error types
///
/// Uses thiserror for ergonomic error handling with proper Display implementations.
use thiserror::Error;

/// Main error type surfaced to the recorder's `error` callback channel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("microphone permission was denied")]
    PermissionDenied,

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("unsupported audio format: {0}")]
    UnsupportedAudioFormat(String),

    #[error("failed to connect: {0}")]
    ConnectFailed(String),

    #[error("connect timed out")]
    ConnectTimeout,

    #[error("connection closed abnormally: {0}")]
    ClosedAbnormally(String),

    #[error("disconnect timed out waiting for server acknowledgement")]
    DisconnectTimeout,

    #[error("unknown streaming error: {0}")]
    Unknown(String),

    #[error("failed to decode server message: {0}")]
    Decode(#[from] DecodeError),

    #[error("index out of bounds")]
    IndexOutOfBounds,

    #[error("annotation not found for {0} (id {1})")]
    AnnotationNotFound(&'static str, String),
}

/// Errors raised by [`crate::session::MessageDecoder`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("unknown action type: {0}")]
    UnknownActionType(String),

    #[error("unknown annotation kind: {0}")]
    UnknownAnnotationKind(String),

    #[error("invalid json: {0}")]
    InvalidJson(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::InvalidJson(err.to_string())
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Sentinel distinguishing a deliberately cancelled delayed task from a real
/// error. Never routed through [`CoreError`] or the `error` callback channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_wraps_serde_errors_as_text() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let decode_err: DecodeError = serde_err.into();
        assert!(matches!(decode_err, DecodeError::InvalidJson(_)));
    }

    #[test]
    fn core_error_nests_decode_error() {
        let err: CoreError = DecodeError::MissingField("start".into()).into();
        assert!(matches!(err, CoreError::Decode(DecodeError::MissingField(ref f)) if f == "start"));
    }
}
