//! Core runtime for a mobile speech-capture SDK.
//!
//! Three collaborating pieces, each usable independently of the others:
//! the recorder lifecycle state machine and plugin dispatch ([`recorder`]),
//! a streaming transcription session ([`session`]), and the undoable
//! transcription document ([`domain::stream::TranscribeStream`]). The
//! [`plugins::StreamingTranscriptionPlugin`] wires the latter two into the
//! former. Embedders supply the capability traits in [`ports`] — audio
//! capture, the transport, and (optionally) synchronous transcription.
pub mod domain;
pub mod error;
pub mod plugins;
pub mod ports;
pub mod recorder;
pub mod session;

pub use domain::{
    Annotation, AnnotationKind, AudioEncoding, AudioFrame, DocumentState, IntentStatus,
    RecorderState, RecordingConfig, TranscribeAction, TranscribeDocument, TranscribeStream,
    UndoableAction, UndoableMapper,
};
pub use error::{Cancelled, CoreError, DecodeError, Result};
pub use ports::{AudioCallback, AudioSource, ConnectRequest, Plugin, SessionListener, StreamingTransport, SyncTranscriber};
pub use recorder::{CallbackHandle, CallbackRegistry, RecorderCore, RecorderModel};
pub use plugins::{SessionFactory, StreamingTranscriptionPlugin};
pub use session::{AsyncSession, MessageDecoder, NoHandshakeHooks, SessionHooks};
