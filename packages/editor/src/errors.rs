//! Error types for the editor

use crate::tree::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Parse error: {0}")]
    Parse(#[from] richedit_markup::ParseError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Failures of low-level tree surgery
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {0} is not attached to the document")]
    Detached(NodeId),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Node {0} is not text")]
    NotText(NodeId),

    #[error("Offset {offset} out of bounds for node {node} (length {len})")]
    OffsetOutOfBounds {
        node: NodeId,
        offset: usize,
        len: usize,
    },

    #[error("Would create cycle")]
    CycleDetected,

    #[error("The document root cannot be moved or removed")]
    RootImmutable,

    #[error("Range boundaries do not share a parent")]
    IncompatibleBoundaries,
}

/// Why a formatting command did not mutate the document.
///
/// None of these reach the user; the editor recovers locally and reports
/// a no-op.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Selection no longer resolves in the document")]
    SelectionInvalid,

    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("Structural mutation failed: {0}")]
    StructuralMutation(#[from] TreeError),

    #[error("Command abandoned: {0}")]
    Abandoned(&'static str),
}
