//! Linear undo/redo over full board snapshots

use egui::{Key, Modifiers};

use super::types::{BoardState, HistoryEntry};

/// Default number of undo steps kept
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
}

/// Undo/redo stacks.
///
/// Snapshots are plain deep copies: boards hold tens of jobs, so the copies are small.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    past: Vec<HistoryEntry>,
    future: Vec<HistoryEntry>,
    limit: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryManager {
    pub fn new(limit: usize) -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Snapshot `current` before it is mutated. Clears the redo stack.
    pub fn record(&mut self, current: &BoardState) {
        self.past.push(current.clone());
        if self.past.len() > self.limit {
            let overflow = self.past.len() - self.limit;
            self.past.drain(..overflow);
        }
        self.future.clear();
    }

    /// Restore the previous snapshot into `current`. Returns false when there is nothing to undo.
    pub fn undo(&mut self, current: &mut BoardState) -> bool {
        let Some(previous) = self.past.pop() else {
            return false;
        };
        self.future.push(std::mem::replace(current, previous));
        true
    }

    /// Re-apply the most recently undone snapshot. Returns false when there is nothing to redo.
    pub fn redo(&mut self, current: &mut BoardState) -> bool {
        let Some(next) = self.future.pop() else {
            return false;
        };
        self.past.push(std::mem::replace(current, next));
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    pub fn depth(&self) -> (usize, usize) {
        (self.past.len(), self.future.len())
    }
}

/// Map a key press to an undo/redo action.
///
/// Ctrl/Cmd+Z undoes; Ctrl/Cmd+Y and Ctrl/Cmd+Shift+Z redo. Nothing fires while
/// a dialog or text field has focus (`input_focused`) so text-field undo keeps working.
pub fn shortcut_action(modifiers: Modifiers, key: Key, input_focused: bool) -> Option<HistoryAction> {
    if input_focused || !(modifiers.command || modifiers.ctrl) {
        return None;
    }

    match key {
        Key::Z if modifiers.shift => Some(HistoryAction::Redo),
        Key::Z => Some(HistoryAction::Undo),
        Key::Y => Some(HistoryAction::Redo),
        _ => None,
    }
}
