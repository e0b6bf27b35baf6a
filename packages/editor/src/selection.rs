//! # Selection Tracking
//!
//! Keeps the user's selection alive while the surface does not have focus.
//!
//! The live selection is whatever the UI last reported. Toolbar clicks steal
//! focus, so formatting commands usually run against the [`SavedRange`]
//! captured the last time the surface held a non-collapsed selection.
//!
//! A saved range remembers the tree generation it was captured at. Any
//! structural mutation or full replacement moves the generation on, after
//! which the saved range no longer validates and reads as "none".

use crate::errors::CommandError;
use crate::range::Range;
use crate::tree::DocumentTree;
use tracing::trace;

/// Selection snapshot retained across focus loss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedRange {
    pub range: Range,
    generation: u64,
}

impl SavedRange {
    /// Both endpoints still resolve and nothing structural happened since capture
    pub fn is_valid(&self, tree: &DocumentTree) -> bool {
        self.generation == tree.generation()
            && tree.resolves(&self.range.anchor)
            && tree.resolves(&self.range.focus)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    live: Option<Range>,
    focused: bool,
    saved: Option<SavedRange>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the selection the UI reports
    pub fn set_live(&mut self, range: Option<Range>) {
        self.live = range;
    }

    pub fn live(&self) -> Option<Range> {
        self.live
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Capture the live selection as the saved range.
    ///
    /// A non-collapsed selection inside the document replaces the saved
    /// range; a collapsed one clears it. Without a resolvable live selection
    /// the saved range is kept.
    pub fn save_if_valid(&mut self, tree: &DocumentTree) -> bool {
        let Some(range) = self.live else {
            return false;
        };
        if !tree.resolves(&range.anchor) || !tree.resolves(&range.focus) {
            trace!("[Selection] live selection does not resolve, keeping saved range");
            return false;
        }
        if range.is_collapsed() {
            trace!("[Selection] collapsed selection, clearing saved range");
            self.saved = None;
            return false;
        }
        trace!("[Selection] saved {:?} at generation {}", range, tree.generation());
        self.saved = Some(SavedRange {
            range,
            generation: tree.generation(),
        });
        true
    }

    /// Saved range, if it is still valid against `tree`
    pub fn get_saved(&self, tree: &DocumentTree) -> Option<Range> {
        self.saved
            .filter(|saved| saved.is_valid(tree))
            .map(|saved| saved.range)
    }

    pub fn clear(&mut self) {
        self.saved = None;
    }

    /// Make `range` the live selection before a structural command runs
    pub fn restore_into_live_selection(&mut self, range: Range) {
        self.live = Some(range);
        self.focused = true;
    }

    /// Range a command should act on: the live selection while focused,
    /// otherwise the saved range
    pub fn active_range(&self, tree: &DocumentTree) -> Result<Range, CommandError> {
        if self.focused {
            if let Some(live) = self.live {
                if tree.resolves(&live.anchor) && tree.resolves(&live.focus) {
                    return Ok(live);
                }
            }
        }
        self.get_saved(tree).ok_or(CommandError::SelectionInvalid)
    }
}
