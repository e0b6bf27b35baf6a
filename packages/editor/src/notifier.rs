//! Change notification and external replacement.
//!
//! Outbound: after every successful mutation the serialized document goes
//! to each subscriber. Inbound: the owner's new markup replaces the whole
//! tree, unless it is byte-equal to what the tree serializes to already.

use crate::tree::DocumentTree;
use richedit_markup::ParseResult;
use tracing::debug;

/// Receives the full serialized document after each change
pub trait ChangeListener {
    fn on_change(&mut self, markup: &str);
}

impl<F: FnMut(&str)> ChangeListener for F {
    fn on_change(&mut self, markup: &str) {
        self(markup)
    }
}

#[derive(Default)]
pub struct ChangeNotifier {
    listeners: Vec<Box<dyn ChangeListener>>,
    emitted: usize,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl ChangeListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Number of notifications sent so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Serialize `tree` and push the result to every listener
    pub fn notify(&mut self, tree: &DocumentTree) -> String {
        let markup = tree.serialize();
        debug!("[Notifier] change ({} bytes) to {} listener(s)", markup.len(), self.listeners.len());
        for listener in &mut self.listeners {
            listener.on_change(&markup);
        }
        self.emitted += 1;
        markup
    }

    /// Replace the document with the owner's markup.
    ///
    /// Returns `Ok(false)` without touching the tree when the markup is
    /// identical to the current serialization.
    pub fn apply_external(tree: &mut DocumentTree, markup: &str) -> ParseResult<bool> {
        if tree.serialize() == markup {
            return Ok(false);
        }
        debug!("[Notifier] external replacement ({} bytes)", markup.len());
        tree.load(markup)?;
        Ok(true)
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listeners.len())
            .field("emitted", &self.emitted)
            .finish()
    }
}
