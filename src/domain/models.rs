/// Domain models for the recorder lifecycle and the transcription document.
///
/// These models are transport-agnostic and represent the core business
/// entities shared by the recorder lifecycle and the transcription document.
use serde::{Deserialize, Serialize};

/// Lifecycle state of a recorder. Cyclic: `Idle` is both initial and terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    Idle,
    Loading,
    Recording,
    Processing,
}

impl Default for RecorderState {
    fn default() -> Self {
        RecorderState::Idle
    }
}

/// A finite ordered sequence of signed 16-bit mono PCM samples.
///
/// Value-typed and immutable after emission; the sample rate travels with the
/// frame so consumers never have to consult a side-channel config.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Root-mean-square volume: `sqrt(mean(sample^2))`, `0.0` for empty frames.
    pub fn rms_volume(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum_sq / self.samples.len() as f64).sqrt()
    }
}

/// The only audio encoding this layer accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioEncoding {
    PcmS16,
}

/// Audio capture configuration. Only one combination is in scope: 16 kHz,
/// mono, PCM signed 16-bit, non-interleaved. Anything else is rejected by
/// [`RecordingConfig::validate`] with [`crate::error::CoreError::UnsupportedAudioFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingConfig {
    pub sample_rate: u32,
    pub channels: u8,
    pub encoding: AudioEncoding,
    pub interleaved: bool,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            encoding: AudioEncoding::PcmS16,
            interleaved: false,
        }
    }
}

impl RecordingConfig {
    /// Validates the configuration against the single supported combination.
    pub fn validate(&self) -> Result<(), crate::error::CoreError> {
        if self.sample_rate != 16_000
            || self.channels != 1
            || self.encoding != AudioEncoding::PcmS16
            || self.interleaved
        {
            return Err(crate::error::CoreError::UnsupportedAudioFormat(format!(
                "sample_rate={}, channels={}, encoding={:?}, interleaved={}",
                self.sample_rate, self.channels, self.encoding, self.interleaved
            )));
        }
        Ok(())
    }
}

/// Status of an `Intent` annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Pending,
    Recognized,
}

/// Tagged sum over the kinds of spans a server can annotate onto the
/// transcript text. Extensible: an unrecognized kind is a decode error, never
/// a silently dropped annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AnnotationKind {
    TranscriptionTentative,
    Intent { status: IntentStatus },
    Entity { entity_type: String, text: String },
}

/// A typed span `[start, end)` over the transcript text, counted in Unicode
/// scalar values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub start: usize,
    pub end: usize,
    pub kind: AnnotationKind,
}

/// A server-assigned action that mutates the transcript document.
///
/// `id` is the server-assigned action id; `index` is its monotonic position
/// in the action stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TranscribeAction {
    ReplaceText {
        id: String,
        index: u64,
        start: usize,
        end: usize,
        text: String,
    },
    AddAnnotation {
        id: String,
        index: u64,
        annotation: Annotation,
    },
    UpdateAnnotation {
        id: String,
        index: u64,
        annotation: Annotation,
    },
    RemoveAnnotation {
        id: String,
        index: u64,
        annotation_id: String,
    },
}

/// The annotated transcript text at a point in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentState {
    pub text: String,
    pub annotations: Vec<Annotation>,
}

/// An original action paired with the inverse action list needed to revert it
/// against its pre-image state.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoableAction {
    pub original: TranscribeAction,
    pub inverse: Vec<TranscribeAction>,
}
