//! # Undo/Redo Stack
//!
//! Snapshot-based command history.
//!
//! ## Design
//!
//! - Each successful mutation records the tree before and after it
//! - Undo restores the "before" snapshot and moves the entry to redo
//! - Redo restores the "after" snapshot
//! - New entries clear the redo stack
//! - Oldest entries are dropped past `max_levels`
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! let before = tree.snapshot();
//! // ...mutate tree...
//! stack.record(before, tree.snapshot(), "bold");
//!
//! stack.undo(&mut tree);
//! stack.redo(&mut tree);
//! ```

use crate::tree::{DocumentTree, TreeSnapshot};

/// One undoable step
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    before: TreeSnapshot,
    after: TreeSnapshot,

    /// What produced this step
    pub description: String,
}

/// Bounded undo/redo history over tree snapshots
#[derive(Debug)]
pub struct UndoStack {
    /// Applied steps (most recent last)
    undo_stack: Vec<HistoryEntry>,

    /// Undone steps (most recent last)
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,
}

impl UndoStack {
    /// History bounded to 100 steps
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    /// History bounded to `max_levels` steps
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record a completed mutation
    pub fn record(&mut self, before: TreeSnapshot, after: TreeSnapshot, description: impl Into<String>) {
        self.undo_stack.push(HistoryEntry {
            before,
            after,
            description: description.into(),
        });

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // A new action invalidates the redo future
        self.redo_stack.clear();
    }

    /// Undo the most recent step
    pub fn undo(&mut self, tree: &mut DocumentTree) -> bool {
        let Some(entry) = self.undo_stack.pop() else {
            return false;
        };
        tree.restore(&entry.before);
        self.redo_stack.push(entry);
        true
    }

    /// Redo the most recently undone step
    pub fn redo(&mut self, tree: &mut DocumentTree) -> bool {
        let Some(entry) = self.redo_stack.pop() else {
            return false;
        };
        tree.restore(&entry.after);
        self.undo_stack.push(entry);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Forget every step, e.g. after the document is replaced
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Description of the next undo step
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|entry| entry.description.as_str())
    }

    /// Description of the next redo step
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|entry| entry.description.as_str())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(tree: &mut DocumentTree, stack: &mut UndoStack, markup: &str) {
        let before = tree.snapshot();
        tree.load(markup).unwrap();
        stack.record(before, tree.snapshot(), format!("load {}", markup));
    }

    #[test]
    fn test_undo_stack_creation() {
        let stack = UndoStack::new();
        assert_eq!(stack.undo_levels(), 0);
        assert_eq!(stack.redo_levels(), 0);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_record_undo_redo() {
        let mut tree = DocumentTree::parse("<p>a</p>").unwrap();
        let mut stack = UndoStack::new();
        edit(&mut tree, &mut stack, "<p>b</p>");

        assert_eq!(stack.undo_description(), Some("load <p>b</p>"));
        assert!(stack.undo(&mut tree));
        assert_eq!(tree.serialize(), "<p>a</p>");
        assert_eq!(stack.redo_levels(), 1);

        assert!(stack.redo(&mut tree));
        assert_eq!(tree.serialize(), "<p>b</p>");
        assert!(!stack.redo(&mut tree));
    }

    #[test]
    fn test_new_entry_clears_redo() {
        let mut tree = DocumentTree::parse("<p>a</p>").unwrap();
        let mut stack = UndoStack::new();
        edit(&mut tree, &mut stack, "<p>b</p>");
        stack.undo(&mut tree);
        assert_eq!(stack.redo_levels(), 1);

        edit(&mut tree, &mut stack, "<p>c</p>");
        assert_eq!(stack.redo_levels(), 0);
    }

    #[test]
    fn test_max_levels_enforced() {
        let mut tree = DocumentTree::parse("<p>0</p>").unwrap();
        let mut stack = UndoStack::with_max_levels(2);
        for i in 1..=3 {
            edit(&mut tree, &mut stack, &format!("<p>{}</p>", i));
        }

        assert_eq!(stack.undo_levels(), 2);
        stack.undo(&mut tree);
        stack.undo(&mut tree);
        assert_eq!(tree.serialize(), "<p>1</p>");
        assert!(!stack.undo(&mut tree));
    }
}
