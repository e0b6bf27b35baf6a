//! # Richedit Markup
//!
//! Converts between markup text and an owned [`Node`] fragment.
//!
//! ```text
//! markup text ──tokenize──▶ tokens ──Parser──▶ Vec<Node> ──Serializer──▶ markup text
//! ```
//!
//! The editing engine keeps its own arena tree; this crate is only the
//! persistence boundary, so it stays small and lenient: malformed nesting is
//! repaired rather than rejected, and serialization is deterministic.

pub mod ast;
pub mod entities;
pub mod error;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use ast::{is_void_tag, Element, Node, Properties};
pub use error::{ParseError, ParseResult};
pub use parser::{parse, Parser};
pub use serializer::{serialize, Serializer};
pub use tokenizer::{tokenize, Token};

/// Reduce markup to its plain text content.
///
/// Input that does not parse is returned unchanged.
pub fn to_plain_text(source: &str) -> String {
    match parse(source) {
        Ok(nodes) => nodes.iter().map(Node::to_plain_text).collect(),
        Err(_) => source.to_string(),
    }
}
