/// Domain layer - core, platform-agnostic recorder and transcript models.
pub mod document;
pub mod models;
pub mod stream;
pub mod undo;

pub use document::TranscribeDocument;
pub use models::{
    Annotation, AnnotationKind, AudioEncoding, AudioFrame, DocumentState, IntentStatus,
    RecorderState, RecordingConfig, TranscribeAction, UndoableAction,
};
pub use stream::TranscribeStream;
pub use undo::UndoableMapper;
