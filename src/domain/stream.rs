//! The versioned transcript document with undo/redo history.

use crate::domain::document::TranscribeDocument;
use crate::domain::models::{DocumentState, TranscribeAction, UndoableAction};
use crate::domain::undo::UndoableMapper;
use crate::error::CoreError;

/// `{state, history, undone}`. Invariant: applying `history` from an empty
/// state in order yields `state`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranscribeStream {
    pub state: DocumentState,
    pub history: Vec<UndoableAction>,
    pub undone: Vec<UndoableAction>,
}

impl TranscribeStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `actions`, appending their inverses to `history` and always
    /// clearing `undone`. Atomic: on error, returns `Err` without mutating
    /// state the caller can observe (this method takes `&self` and returns a
    /// new value, so a failed call simply never produces one).
    pub fn receive_actions(&self, actions: &[TranscribeAction]) -> Result<Self, CoreError> {
        let new_state = TranscribeDocument::apply(&self.state, actions)?;
        let mut new_history = self.history.clone();
        new_history.extend(UndoableMapper::map(&self.state, actions)?);
        Ok(Self {
            state: new_state,
            history: new_history,
            undone: Vec::new(),
        })
    }

    /// Undoes up to `n` operations (clamped to `history.len()`), most recent
    /// first, pushing each popped entry onto `undone`.
    pub fn undo_operations(&self, n: usize) -> Self {
        let n = n.min(self.history.len());
        let mut history = self.history.clone();
        let mut undone = self.undone.clone();
        let mut state = self.state.clone();
        for _ in 0..n {
            let action = history.pop().expect("n <= history.len()");
            for inverse_step in &action.inverse {
                state = TranscribeDocument::apply_one(&state, inverse_step)
                    .expect("a computed inverse must apply cleanly against its own pre-image");
            }
            undone.push(action);
        }
        Self {
            state,
            history,
            undone,
        }
    }

    /// Redoes up to `n` operations (clamped to `undone.len()`), popping from
    /// the same end `undo_operations` pushed onto, which restores the exact
    /// chronological order the actions originally arrived in.
    pub fn redo_operations(&self, n: usize) -> Self {
        let n = n.min(self.undone.len());
        let mut history = self.history.clone();
        let mut undone = self.undone.clone();
        let mut state = self.state.clone();
        for _ in 0..n {
            let action = undone.pop().expect("n <= undone.len()");
            state = TranscribeDocument::apply_one(&state, &action.original)
                .expect("a previously-applied action must re-apply cleanly");
            history.push(action);
        }
        Self {
            state,
            history,
            undone,
        }
    }
}
