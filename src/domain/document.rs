//! Pure, synchronous application of [`TranscribeAction`]s to a [`DocumentState`].
//!
//! Annotations are never re-indexed when `ReplaceText` shifts the text: the
//! server is expected to send matching annotation updates explicitly.

use crate::domain::models::{DocumentState, TranscribeAction};
use crate::error::CoreError;

/// Namespace for the document-application algorithm. Stateless by design so
/// it can be reused by both [`crate::domain::TranscribeStream`] and
/// [`crate::domain::UndoableMapper`] without shared mutable state.
pub struct TranscribeDocument;

impl TranscribeDocument {
    /// Applies a batch of actions in order, returning the resulting state.
    ///
    /// Fails on the first action that cannot be applied; earlier actions in
    /// the batch are not rolled back here — callers that need batch atomicity
    /// (e.g. [`crate::domain::TranscribeStream::receive_actions`]) must
    /// discard the partial result themselves.
    pub fn apply(
        state: &DocumentState,
        actions: &[TranscribeAction],
    ) -> Result<DocumentState, CoreError> {
        let mut current = state.clone();
        for action in actions {
            current = Self::apply_one(&current, action)?;
        }
        Ok(current)
    }

    /// Applies a single action against `state`, returning the new state.
    pub fn apply_one(
        state: &DocumentState,
        action: &TranscribeAction,
    ) -> Result<DocumentState, CoreError> {
        match action {
            TranscribeAction::ReplaceText {
                start, end, text, ..
            } => {
                let chars: Vec<char> = state.text.chars().collect();
                if start > end || *end > chars.len() {
                    return Err(CoreError::IndexOutOfBounds);
                }
                let mut new_text =
                    String::with_capacity(state.text.len() + text.len());
                new_text.extend(chars[..*start].iter().copied());
                new_text.push_str(text);
                new_text.extend(chars[*end..].iter().copied());
                Ok(DocumentState {
                    text: new_text,
                    annotations: state.annotations.clone(),
                })
            }
            TranscribeAction::AddAnnotation { annotation, .. } => {
                let mut annotations = state.annotations.clone();
                annotations.push(annotation.clone());
                Ok(DocumentState {
                    text: state.text.clone(),
                    annotations,
                })
            }
            TranscribeAction::RemoveAnnotation { annotation_id, .. } => {
                let annotations = state
                    .annotations
                    .iter()
                    .filter(|a| &a.id != annotation_id)
                    .cloned()
                    .collect();
                Ok(DocumentState {
                    text: state.text.clone(),
                    annotations,
                })
            }
            TranscribeAction::UpdateAnnotation { annotation, .. } => {
                let mut annotations = state.annotations.clone();
                if let Some(slot) = annotations.iter_mut().find(|a| a.id == annotation.id) {
                    *slot = annotation.clone();
                }
                Ok(DocumentState {
                    text: state.text.clone(),
                    annotations,
                })
            }
        }
    }
}
