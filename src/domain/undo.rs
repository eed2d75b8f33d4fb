//! Computes the inverse action list for a batch of [`TranscribeAction`]s
//! against their pre-image state.

use crate::domain::document::TranscribeDocument;
use crate::domain::models::{DocumentState, TranscribeAction, UndoableAction};
use crate::error::CoreError;

pub struct UndoableMapper;

impl UndoableMapper {
    /// Maps each action in `actions` to its [`UndoableAction`], threading the
    /// document state through the batch so that a `ReplaceText`'s inverse
    /// slice is always taken against the text as it stood immediately before
    /// that action, not the state at the start of the whole batch.
    pub fn map(
        pre_state: &DocumentState,
        actions: &[TranscribeAction],
    ) -> Result<Vec<UndoableAction>, CoreError> {
        let mut current = pre_state.clone();
        let mut mapped = Vec::with_capacity(actions.len());
        for action in actions {
            let inverse = Self::inverse_one(&current, action)?;
            mapped.push(UndoableAction {
                original: action.clone(),
                inverse,
            });
            current = TranscribeDocument::apply_one(&current, action)?;
        }
        Ok(mapped)
    }

    fn inverse_one(
        pre: &DocumentState,
        action: &TranscribeAction,
    ) -> Result<Vec<TranscribeAction>, CoreError> {
        match action {
            TranscribeAction::ReplaceText {
                id,
                index,
                start,
                end,
                text,
            } => {
                let chars: Vec<char> = pre.text.chars().collect();
                if start > end || *end > chars.len() {
                    return Err(CoreError::IndexOutOfBounds);
                }
                let original_slice: String = chars[*start..*end].iter().collect();
                let new_end = start + text.chars().count();
                Ok(vec![TranscribeAction::ReplaceText {
                    id: id.clone(),
                    index: *index,
                    start: *start,
                    end: new_end,
                    text: original_slice,
                }])
            }
            TranscribeAction::AddAnnotation {
                id,
                index,
                annotation,
            } => Ok(vec![TranscribeAction::RemoveAnnotation {
                id: id.clone(),
                index: *index,
                annotation_id: annotation.id.clone(),
            }]),
            TranscribeAction::RemoveAnnotation {
                id,
                index,
                annotation_id,
            } => {
                let found = pre
                    .annotations
                    .iter()
                    .find(|a| &a.id == annotation_id)
                    .cloned()
                    .ok_or_else(|| CoreError::AnnotationNotFound("remove", annotation_id.clone()))?;
                Ok(vec![TranscribeAction::AddAnnotation {
                    id: id.clone(),
                    index: *index,
                    annotation: found,
                }])
            }
            TranscribeAction::UpdateAnnotation {
                id,
                index,
                annotation,
            } => {
                let prior = pre
                    .annotations
                    .iter()
                    .find(|a| a.id == annotation.id)
                    .cloned()
                    .ok_or_else(|| {
                        CoreError::AnnotationNotFound("update", annotation.id.clone())
                    })?;
                // Order matters: the current (post-update) entry must be
                // removed before the prior one is added back, or the add
                // would collide with an id already present.
                Ok(vec![
                    TranscribeAction::RemoveAnnotation {
                        id: id.clone(),
                        index: *index,
                        annotation_id: annotation.id.clone(),
                    },
                    TranscribeAction::AddAnnotation {
                        id: id.clone(),
                        index: *index,
                        annotation: prior,
                    },
                ])
            }
        }
    }
}
