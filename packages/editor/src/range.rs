use crate::tree::NodeId;
use serde::{Deserialize, Serialize};

/// A boundary point in the document.
///
/// `offset` is a character index for text nodes and a child index for
/// elements. Positions reference nodes by id, never by handle, so they stay
/// meaningful (or detectably stale) across edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Anchor/focus pair describing a selection.
///
/// The anchor is where the selection started and may come after the focus
/// in document order; use [`DocumentTree::ordered`](crate::DocumentTree::ordered)
/// to get start/end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub anchor: Position,
    pub focus: Position,
}

impl Range {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    pub fn caret(at: Position) -> Self {
        Self {
            anchor: at,
            focus: at,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}
