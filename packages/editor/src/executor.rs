//! # Format Command Executor
//!
//! Applies one [`Command`] to the document, targeting the active range
//! (live selection while focused, otherwise the saved one).
//!
//! ```text
//! Command ──▶ active range ──▶ inline wrap / font size / link
//!                          └─▶ blocks (align, format block)
//!                          └─▶ ListStyleManager
//! ```
//!
//! Errors here are local: the editor rolls the tree back to the state it
//! had before the command and reports a no-op. The executor itself makes
//! no attempt to undo partial work.

use crate::blocks;
use crate::commands::{normalize_url, validate_font_size, validate_style_value, Command};
use crate::errors::{CommandError, TreeError};
use crate::lists::ListStyleManager;
use crate::range::{Position, Range};
use crate::selection::SelectionTracker;
use crate::tree::{DocumentTree, ElementData, NodeId};
use richedit_markup::is_void_tag;
use tracing::debug;

const BOLD_TAGS: &[&str] = &["b", "strong"];
const ITALIC_TAGS: &[&str] = &["i", "em"];
const UNDERLINE_TAGS: &[&str] = &["u"];

/// Toggleable inline formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineFormat {
    Bold,
    Italic,
    Underline,
}

impl InlineFormat {
    fn tag(self) -> &'static str {
        match self {
            InlineFormat::Bold => "b",
            InlineFormat::Italic => "i",
            InlineFormat::Underline => "u",
        }
    }

    /// Tags that already render this format
    fn family(self) -> &'static [&'static str] {
        match self {
            InlineFormat::Bold => BOLD_TAGS,
            InlineFormat::Italic => ITALIC_TAGS,
            InlineFormat::Underline => UNDERLINE_TAGS,
        }
    }
}

pub struct FormatCommandExecutor<'a> {
    tree: &'a mut DocumentTree,
    selection: &'a mut SelectionTracker,
}

impl<'a> FormatCommandExecutor<'a> {
    pub fn new(tree: &'a mut DocumentTree, selection: &'a mut SelectionTracker) -> Self {
        Self { tree, selection }
    }

    /// Run a formatting command.
    ///
    /// History commands are not formatting commands and are refused.
    pub fn execute(&mut self, command: &Command) -> Result<(), CommandError> {
        debug!("[Executor] {}", command);
        match command {
            Command::Bold => self.toggle_inline(InlineFormat::Bold),
            Command::Italic => self.toggle_inline(InlineFormat::Italic),
            Command::Underline => self.toggle_inline(InlineFormat::Underline),
            Command::TextColor(color) => self.style_inline("color", color),
            Command::Highlight(color) => self.style_inline("background-color", color),
            Command::Align(alignment) => {
                let range = self.active_range()?;
                blocks::align(self.tree, &range, *alignment)
            }
            Command::FormatBlock(tag) => {
                let range = self.active_range()?;
                blocks::format_block(self.tree, &range, tag)
            }
            Command::FontSize(px) => self.font_size(*px),
            Command::FontFamily(name) => self.font_family(name),
            Command::List(kind, style) => {
                let range = self.active_range()?;
                ListStyleManager::new(self.tree).apply(&range, *kind, *style)?;
                Ok(())
            }
            Command::Link(url) => self.link(url),
            Command::Undo | Command::Redo => Err(CommandError::Abandoned("history is managed by the editor")),
        }
    }

    fn active_range(&self) -> Result<Range, CommandError> {
        self.selection.active_range(self.tree)
    }

    fn non_collapsed_range(&self) -> Result<Range, CommandError> {
        let range = self.active_range()?;
        if range.is_collapsed() {
            return Err(CommandError::Abandoned("nothing selected"));
        }
        Ok(range)
    }

    // Inline formats

    fn toggle_inline(&mut self, format: InlineFormat) -> Result<(), CommandError> {
        let range = self.non_collapsed_range()?;
        let (start, end) = self.tree.ordered(&range)?;
        let container = self.tree.common_container(&start, &end)?;

        match self.tree.nearest_ancestor(container, |e| e.is_tag(format.family())) {
            Some(covering) => self.remove_inline(covering, start, end),
            None => {
                let wrapper = ElementData::new(format.tag());
                self.wrap_text_slices(&range, wrapper, Some(format.family()))
            }
        }
    }

    /// Split `covering` at the range boundaries and unwrap the covered part
    fn remove_inline(&mut self, covering: NodeId, start: Position, end: Position) -> Result<(), CommandError> {
        let parent = self.tree.parent(covering).ok_or(TreeError::Detached(covering))?;
        debug!("[Executor] removing <{:?}> {} over the selection", self.tree.tag(covering), covering);

        let (from, to) = self.tree.isolate(start, end, parent)?;
        let pieces = self.tree.children(parent)[from..to].to_vec();
        let mut unwrapped = 0;
        for piece in pieces {
            unwrapped += self.tree.children(piece).len();
            self.tree.unwrap_element(piece)?;
        }

        self.selection.set_live(Some(Range::new(
            Position::new(parent, from),
            Position::new(parent, from + unwrapped),
        )));
        Ok(())
    }

    fn style_inline(&mut self, property: &str, value: &str) -> Result<(), CommandError> {
        let value = validate_style_value(property, value)?;
        let range = self.non_collapsed_range()?;
        let wrapper = ElementData::new("span").with_style(property, value);
        self.wrap_text_slices(&range, wrapper, None)
    }

    /// Wrap each selected piece of text in its own copy of `wrapper`.
    ///
    /// Text already inside one of `skip_inside` is left alone.
    fn wrap_text_slices(
        &mut self,
        range: &Range,
        wrapper: ElementData,
        skip_inside: Option<&[&str]>,
    ) -> Result<(), CommandError> {
        let wrapped = self.wrap_each_slice(range, &wrapper, skip_inside)?;
        self.select_wrapped(&wrapped)
    }

    fn wrap_each_slice(
        &mut self,
        range: &Range,
        wrapper: &ElementData,
        skip_inside: Option<&[&str]>,
    ) -> Result<Vec<NodeId>, CommandError> {
        let slices = self.tree.text_in_range(range)?;
        let mut wrapped = Vec::new();
        for slice in slices {
            if let Some(tags) = skip_inside {
                if self.tree.nearest_ancestor(slice.node, |e| e.is_tag(tags)).is_some() {
                    continue;
                }
            }
            let piece = Range::new(
                Position::new(slice.node, slice.start),
                Position::new(slice.node, slice.end),
            );
            wrapped.push(self.tree.wrap_range(&piece, wrapper.clone())?);
        }
        Ok(wrapped)
    }

    fn select_wrapped(&mut self, wrapped: &[NodeId]) -> Result<(), CommandError> {
        let (Some(&first), Some(&last)) = (wrapped.first(), wrapped.last()) else {
            return Err(CommandError::Abandoned("no text to format"));
        };
        self.select_between(first, last);
        Ok(())
    }

    /// Live selection from the start of `first` to the end of `last`
    fn select_between(&mut self, first: NodeId, last: NodeId) {
        let end = self.tree.node_len(last);
        self.selection
            .set_live(Some(Range::new(Position::new(first, 0), Position::new(last, end))));
    }

    // Font size / family

    fn font_size(&mut self, px: u32) -> Result<(), CommandError> {
        let px = validate_font_size(px)?;
        let range = self.non_collapsed_range()?;
        let (start, end) = self.tree.ordered(&range)?;
        let wrapper = ElementData::new("span").with_style("font-size", format!("{}px", px));

        if start.node == end.node && self.tree.text(start.node).is_some() {
            let (_, middle) = self.tree.split_text_node(start.node, start.offset)?;
            let (middle, _) = self.tree.split_text_node(middle, end.offset - start.offset)?;
            let span = self.tree.create_element(wrapper);
            self.tree.replace_node(middle, span)?;
            self.tree.append_child(span, middle)?;
        } else {
            debug!("[Executor] font size spans several nodes, extracting");
            self.extract_and_wrap(&range, wrapper)?;
        }
        self.tree.remove_empty_text_fragments();

        self.selection.clear();
        self.selection.set_live(None);
        Ok(())
    }

    fn font_family(&mut self, name: &str) -> Result<(), CommandError> {
        let name = validate_style_value("font-family", name)?;
        let mut range = self.active_range()?;
        if range.is_collapsed() {
            range = self
                .expand_to_word(range.focus)
                .ok_or(CommandError::Abandoned("no word at the caret"))?;
        }

        let wrapper = ElementData::new("span").with_style("font-family", name);
        let spans = self.wrap_with_fallback(&range, wrapper)?;
        self.select_wrapped(&spans)
    }

    /// Grow a caret to the whitespace-delimited word around it
    pub fn expand_to_word(&self, caret: Position) -> Option<Range> {
        let (node, offset) = match self.tree.text(caret.node) {
            Some(_) => (caret.node, caret.offset),
            None => {
                let children = self.tree.children(caret.node);
                let before = caret.offset.checked_sub(1).and_then(|i| children.get(i)).copied();
                let after = children.get(caret.offset).copied();
                match (before, after) {
                    (Some(b), _) if self.tree.text(b).is_some() => (b, self.tree.node_len(b)),
                    (_, Some(a)) if self.tree.text(a).is_some() => (a, 0),
                    _ => return None,
                }
            }
        };

        let chars: Vec<char> = self.tree.text(node)?.chars().collect();
        let offset = offset.min(chars.len());
        let mut left = offset;
        while left > 0 && !chars[left - 1].is_whitespace() {
            left -= 1;
        }
        let mut right = offset;
        while right < chars.len() && !chars[right].is_whitespace() {
            right += 1;
        }

        (left < right).then(|| Range::new(Position::new(node, left), Position::new(node, right)))
    }

    /// Wrap in place, or extract, wrap and reinsert when the boundaries
    /// live in different parents
    fn wrap_with_fallback(&mut self, range: &Range, wrapper: ElementData) -> Result<Vec<NodeId>, CommandError> {
        if self.meets_at_list(range)? {
            return self.extract_and_wrap(range, wrapper);
        }
        match self.tree.wrap_range(range, wrapper.clone()) {
            Ok(node) => Ok(vec![node]),
            Err(TreeError::IncompatibleBoundaries) => {
                debug!("[Executor] in-place wrap impossible, extracting");
                self.extract_and_wrap(range, wrapper)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Pull the range out and reinsert it under one `wrapper`.
    ///
    /// List items cannot sit under an inline wrapper, so a range whose
    /// boundaries meet at a `ul`/`ol` gets the wrapper inside each item.
    fn extract_and_wrap(&mut self, range: &Range, wrapper: ElementData) -> Result<Vec<NodeId>, CommandError> {
        if self.meets_at_list(range)? {
            debug!("[Executor] range crosses list items, wrapping per item");
            let wrapped = self.wrap_each_slice(range, &wrapper, None)?;
            if wrapped.is_empty() {
                return Err(CommandError::Abandoned("selection has no renderable content"));
            }
            return Ok(wrapped);
        }

        let extraction = self.tree.extract_range(range)?;
        if !extraction.nodes.iter().any(|&node| self.is_renderable(node)) {
            return Err(CommandError::Abandoned("selection has no renderable content"));
        }

        let wrapper = self.tree.create_element(wrapper);
        for node in extraction.nodes {
            self.tree.append_child(wrapper, node)?;
        }
        self.tree.insert_node_at(extraction.at, wrapper)?;
        Ok(vec![wrapper])
    }

    /// True when the boundaries' nearest common element is a `ul`/`ol`
    fn meets_at_list(&self, range: &Range) -> Result<bool, CommandError> {
        let (start, end) = self.tree.ordered(range)?;
        let container = self.tree.common_container(&start, &end)?;
        Ok(self.tree.element(container).is_some_and(|e| e.is_tag(&["ul", "ol"])))
    }

    /// Non-empty text or a void element somewhere below `node`
    fn is_renderable(&self, node: NodeId) -> bool {
        self.tree.descendants(node).into_iter().any(|id| match self.tree.text(id) {
            Some(text) => !text.is_empty(),
            None => self.tree.tag(id).is_some_and(is_void_tag),
        })
    }

    // Links

    fn link(&mut self, raw_url: &str) -> Result<(), CommandError> {
        let url = normalize_url(raw_url)?;
        let range = self.active_range()?;

        // A caret inside a word links the whole word
        let target = if range.is_collapsed() {
            self.expand_to_word(range.focus)
        } else {
            Some(range)
        };
        let Some(target) = target else {
            return self.insert_link_at(range.focus, &url);
        };

        if let Some(anchor) = self.enclosing_anchor(&target)? {
            debug!("[Executor] updating href of {}", anchor);
            if let Some(element) = self.tree.element_mut(anchor) {
                element.attributes.set("href", url);
            }
            return Ok(());
        }

        let wrapper = ElementData::new("a").with_attribute("href", url);
        let anchors = self.wrap_with_fallback(&target, wrapper)?;
        for &anchor in &anchors {
            self.unwrap_nested_anchors(anchor)?;
        }
        self.select_wrapped(&anchors)
    }

    fn enclosing_anchor(&self, range: &Range) -> Result<Option<NodeId>, CommandError> {
        let (start, end) = self.tree.ordered(range)?;
        let container = self.tree.common_container(&start, &end)?;
        Ok(self.tree.nearest_ancestor(container, |e| e.tag == "a"))
    }

    /// New anchor showing its own URL; the caret lands right after it
    fn insert_link_at(&mut self, caret: Position, url: &str) -> Result<(), CommandError> {
        let anchor = self
            .tree
            .create_element(ElementData::new("a").with_attribute("href", url));
        let text = self.tree.create_text(url);
        self.tree.append_child(anchor, text)?;
        self.tree.insert_node_at(caret, anchor)?;

        let parent = self.tree.parent(anchor).ok_or(TreeError::Detached(anchor))?;
        let index = self.tree.index_in_parent(anchor).ok_or(TreeError::Detached(anchor))?;
        self.selection
            .set_live(Some(Range::caret(Position::new(parent, index + 1))));
        Ok(())
    }

    fn unwrap_nested_anchors(&mut self, anchor: NodeId) -> Result<(), CommandError> {
        let nested: Vec<NodeId> = self
            .tree
            .descendants(anchor)
            .into_iter()
            .skip(1)
            .filter(|&id| self.tree.tag(id) == Some("a"))
            .collect();
        for id in nested {
            self.tree.unwrap_element(id)?;
        }
        Ok(())
    }
}
