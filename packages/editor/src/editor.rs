//! # Editor
//!
//! The component a host embeds: one document, its selection, history and
//! subscribers.
//!
//! ```text
//! select / focus / blur ──▶ SelectionTracker ◀── run_pending_tasks (capture)
//! execute(Command) ──▶ FormatCommandExecutor ──▶ DocumentTree
//!                                                     │
//!                            UndoStack ◀── record ────┤
//!                                                     ▼
//!                                        ChangeNotifier ──▶ on_change(markup)
//! set_value(markup) ──▶ full replacement (no notification)
//! ```
//!
//! Every mutation runs as a transaction: the tree and selection are
//! checkpointed first, and any failure puts both back exactly as they were.

use crate::commands::{parse_font_size, Command, CommandOutcome};
use crate::config::EditorConfig;
use crate::errors::{CommandError, EditorError};
use crate::executor::FormatCommandExecutor;
use crate::notifier::{ChangeListener, ChangeNotifier};
use crate::range::Range;
use crate::selection::SelectionTracker;
use crate::tasks::{Task, TaskQueue};
use crate::tree::DocumentTree;
use crate::undo_stack::UndoStack;
use tracing::{debug, trace, warn};

#[derive(Debug)]
pub struct Editor {
    tree: DocumentTree,
    selection: SelectionTracker,
    tasks: TaskQueue,
    history: UndoStack,
    notifier: ChangeNotifier,
    config: EditorConfig,

    /// Last font size that passed validation
    committed_font_size: u32,

    /// Raw contents of the font-size box
    font_size_input: String,
}

impl Editor {
    pub fn new(initial: &str, config: EditorConfig) -> Result<Self, EditorError> {
        config.validate()?;
        let mut tree = DocumentTree::with_surface(&config.surface_tag);
        tree.load(initial)?;

        Ok(Self {
            tree,
            selection: SelectionTracker::new(),
            tasks: TaskQueue::new(),
            history: UndoStack::with_max_levels(config.history_depth),
            notifier: ChangeNotifier::new(),
            committed_font_size: config.default_font_size,
            font_size_input: config.default_font_size.to_string(),
            config,
        })
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    /// Current serialization
    pub fn value(&self) -> String {
        self.tree.serialize()
    }

    /// Replace the document with the owner's markup.
    ///
    /// Byte-equal markup is ignored so the caret is not disturbed. A real
    /// replacement drops the saved selection and the history, and does not
    /// echo back through `on_change`.
    pub fn set_value(&mut self, markup: &str) -> Result<bool, EditorError> {
        let replaced = ChangeNotifier::apply_external(&mut self.tree, markup)?;
        if replaced {
            debug!("[Editor] external value replaced the document");
            self.selection.clear();
            self.selection.set_live(None);
            self.history.clear();
        }
        Ok(replaced)
    }

    pub fn on_change(&mut self, listener: impl ChangeListener + 'static) {
        self.notifier.subscribe(listener);
    }

    /// Change notifications sent so far
    pub fn notifications(&self) -> usize {
        self.notifier.emitted()
    }

    // Selection

    /// The UI reports a new selection. Capture happens on the next turn.
    pub fn select(&mut self, range: Range) {
        self.selection.set_live(Some(range));
        self.tasks.schedule(Task::CaptureSelection);
    }

    /// Select plain-text character offsets `[start, end)`
    pub fn select_text(&mut self, start: usize, end: usize) -> bool {
        match self.tree.range_from_text_offsets(start, end) {
            Some(range) => {
                self.select(range);
                true
            }
            None => false,
        }
    }

    pub fn place_caret(&mut self, at: usize) -> bool {
        self.select_text(at, at)
    }

    pub fn focus(&mut self) {
        self.selection.focus();
    }

    pub fn blur(&mut self) {
        self.selection.blur();
    }

    pub fn is_focused(&self) -> bool {
        self.selection.is_focused()
    }

    /// Run one turn of deferred work; returns how many tasks ran
    pub fn run_pending_tasks(&mut self) -> usize {
        let turn = self.tasks.take_turn();
        for task in &turn {
            match task {
                Task::CaptureSelection => {
                    self.selection.save_if_valid(&self.tree);
                }
            }
        }
        turn.len()
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn saved_selection(&self) -> Option<Range> {
        self.selection.get_saved(&self.tree)
    }

    pub fn live_selection(&self) -> Option<Range> {
        self.selection.live()
    }

    /// Text under the active range
    pub fn selected_text(&self) -> Option<String> {
        let range = self.selection.active_range(&self.tree).ok()?;
        self.tree.selected_text(&range).ok()
    }

    // Commands

    pub fn execute(&mut self, command: Command) -> CommandOutcome {
        match command {
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
            other => self.format(other),
        }
    }

    fn format(&mut self, command: Command) -> CommandOutcome {
        if !self.selection.is_focused() {
            if let Some(saved) = self.selection.get_saved(&self.tree) {
                self.selection.restore_into_live_selection(saved);
            }
        }

        let outcome = self.transact(command.label(), |editor| {
            FormatCommandExecutor::new(&mut editor.tree, &mut editor.selection).execute(&command)
        });

        if let Command::FontSize(px) = command {
            if outcome.is_applied() {
                self.committed_font_size = px;
            }
            self.font_size_input = self.committed_font_size.to_string();
        }
        outcome
    }

    fn undo(&mut self) -> CommandOutcome {
        if let Some(description) = self.history.undo_description() {
            debug!("[Editor] undo {}", description);
        }
        if !self.history.undo(&mut self.tree) {
            return CommandOutcome::NoOp;
        }
        self.after_history_step();
        CommandOutcome::Applied
    }

    fn redo(&mut self) -> CommandOutcome {
        if let Some(description) = self.history.redo_description() {
            debug!("[Editor] redo {}", description);
        }
        if !self.history.redo(&mut self.tree) {
            return CommandOutcome::NoOp;
        }
        self.after_history_step();
        CommandOutcome::Applied
    }

    fn after_history_step(&mut self) {
        self.selection.clear();
        self.selection.set_live(None);
        self.selection.focus();
        self.notifier.notify(&self.tree);
    }

    /// Run `apply` against a checkpoint.
    ///
    /// Success that changed the serialization is recorded and announced.
    /// Failure restores the checkpoint and reads as a no-op.
    fn transact<F>(&mut self, description: &'static str, apply: F) -> CommandOutcome
    where
        F: FnOnce(&mut Self) -> Result<(), CommandError>,
    {
        let tree_checkpoint = self.tree.clone();
        let selection_checkpoint = self.selection.clone();

        let result = apply(self);
        match result {
            Ok(()) if self.tree.serialize() == tree_checkpoint.serialize() => {
                trace!("[Editor] {} left the document unchanged", description);
                self.selection.focus();
                CommandOutcome::NoOp
            }
            Ok(()) => {
                self.history
                    .record(tree_checkpoint.into_snapshot(), self.tree.snapshot(), description);
                self.selection.focus();
                self.selection.save_if_valid(&self.tree);
                self.notifier.notify(&self.tree);
                CommandOutcome::Applied
            }
            Err(error) => {
                match &error {
                    CommandError::StructuralMutation(_) => warn!("[Editor] {} abandoned: {}", description, error),
                    _ => debug!("[Editor] {} not applied: {}", description, error),
                }
                self.tree.roll_back_to(tree_checkpoint);
                self.selection = selection_checkpoint;
                self.selection.focus();
                CommandOutcome::NoOp
            }
        }
    }

    // Font-size box

    /// The user edits the font-size box; nothing is validated yet
    pub fn font_size_input(&mut self, text: &str) {
        self.font_size_input = text.to_string();
    }

    /// What the font-size box shows
    pub fn displayed_font_size(&self) -> &str {
        &self.font_size_input
    }

    pub fn committed_font_size(&self) -> u32 {
        self.committed_font_size
    }

    /// Commit the font-size box.
    ///
    /// Invalid input reverts the box to the last committed size. Valid input
    /// becomes the committed size and, when a saved selection exists, is
    /// applied to it; otherwise only the displayed default changes.
    pub fn commit_font_size(&mut self) -> CommandOutcome {
        let px = match parse_font_size(&self.font_size_input) {
            Ok(px) => px,
            Err(error) => {
                debug!("[Editor] font size rejected: {}", error);
                self.font_size_input = self.committed_font_size.to_string();
                return CommandOutcome::NoOp;
            }
        };

        self.committed_font_size = px;
        self.font_size_input = px.to_string();
        match self.selection.get_saved(&self.tree) {
            Some(saved) => {
                self.selection.restore_into_live_selection(saved);
                self.format(Command::FontSize(px))
            }
            None => {
                debug!("[Editor] no saved selection, default size is now {}px", px);
                CommandOutcome::NoOp
            }
        }
    }

    // Link dialog

    /// Close the link dialog; `None` is cancel
    pub fn submit_link_dialog(&mut self, url: Option<&str>) -> CommandOutcome {
        match url {
            Some(url) => self.execute(Command::Link(url.to_string())),
            None => {
                self.selection.focus();
                CommandOutcome::NoOp
            }
        }
    }

    // Typing

    /// Type `text` over the active range
    pub fn insert_text(&mut self, text: &str) -> CommandOutcome {
        self.insert_plain(text, "typing")
    }

    /// Paste `content` as plain text, whatever markup it carries
    pub fn paste(&mut self, content: &str) -> CommandOutcome {
        let text = richedit_markup::to_plain_text(content);
        self.insert_plain(&text, "paste")
    }

    fn insert_plain(&mut self, text: &str, description: &'static str) -> CommandOutcome {
        if text.is_empty() {
            return CommandOutcome::NoOp;
        }
        self.transact(description, |editor| {
            let range = editor.selection.active_range(&editor.tree)?;
            let at = if range.is_collapsed() {
                range.focus
            } else {
                let extraction = editor.tree.extract_range(&range)?;
                for node in extraction.nodes {
                    editor.tree.remove(node)?;
                }
                extraction.at
            };
            let caret = editor.tree.insert_text_at(at, text)?;
            editor.tree.remove_empty_text_fragments();
            editor.selection.set_live(Some(Range::caret(caret)));
            Ok(())
        })
    }
}
