//! # Richedit Editor
//!
//! Rich-text editing engine over an owned document tree.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ markup: text ⇄ Node fragment                │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Document tree + formatting          │
//! │  - Arena tree with stable node ids          │
//! │  - Selection saved across focus loss        │
//! │  - Formatting as explicit tree surgery      │
//! │  - Snapshot undo/redo                       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ host: on_change(markup) / set_value(markup) │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The tree is the source of truth**: markup is only its serialization
//! 2. **Positions reference ids**: a stale selection fails to resolve, it never
//!    points at the wrong node
//! 3. **Failures are local**: a command that cannot complete leaves the
//!    document exactly as it was and reports a no-op
//!
//! ## Usage
//!
//! ```rust,ignore
//! use richedit_editor::{Command, Editor, EditorConfig};
//!
//! let mut editor = Editor::new("<p>Hello world</p>", EditorConfig::default())?;
//! editor.on_change(|markup: &str| println!("{}", markup));
//!
//! // The user drags over "world", then clicks a toolbar button
//! editor.focus();
//! editor.select_text(6, 11);
//! editor.run_pending_tasks();
//! editor.blur();
//!
//! editor.execute(Command::FontSize(24));
//! assert_eq!(
//!     editor.value(),
//!     r#"<p>Hello <span style="font-size:24px">world</span></p>"#
//! );
//! ```

mod blocks;
mod commands;
mod config;
mod editor;
mod errors;
mod executor;
mod lists;
mod notifier;
mod range;
mod selection;
mod tasks;
mod tree;
mod undo_stack;

pub use commands::{
    normalize_block_tag, normalize_url, parse_font_size, validate_font_size, validate_style_value, Alignment,
    BulletStyle, Command, CommandOutcome, ListKind, FORMAT_BLOCK_TAGS, MAX_FONT_SIZE, MIN_FONT_SIZE,
};
pub use config::EditorConfig;
pub use editor::Editor;
pub use errors::{CommandError, EditorError, TreeError};
pub use executor::FormatCommandExecutor;
pub use lists::ListStyleManager;
pub use notifier::{ChangeListener, ChangeNotifier};
pub use range::{Position, Range};
pub use selection::{SavedRange, SelectionTracker};
pub use tasks::{Task, TaskQueue};
pub use tree::{
    is_block_tag, Ancestors, DocumentTree, ElementData, Extraction, NodeId, NodeKind, TextSlice, TreeSnapshot,
    BLOCK_TAGS,
};
pub use undo_stack::{HistoryEntry, UndoStack};

// Re-export the markup layer for convenience
pub use richedit_markup as markup;
