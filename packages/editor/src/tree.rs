//! # Document Tree
//!
//! Arena-backed node graph for the editable surface.
//!
//! Every node lives in a flat map keyed by [`NodeId`]; parents and children
//! refer to each other by id. Ids are handed out monotonically and never
//! reused, even across a rolled-back edit, so a [`Position`] captured
//! against an older document simply fails to resolve instead of pointing at
//! an unrelated node.
//!
//! ```text
//!  load(markup) ──▶ import ──▶ arena ──▶ export ──▶ serialize()
//!                               │
//!                     split / wrap / extract / insert
//! ```
//!
//! The root element is the surface itself. It is never serialized (only its
//! children are), never detached, and never removed.

use crate::errors::TreeError;
use crate::range::{Position, Range};
use richedit_markup::{self as markup, Element, Node, ParseResult, Properties};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Tags treated as blocks by line-oriented commands
pub const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "div",
    "footer",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "li",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "ul",
];

pub fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

/// Stable node identity within one editor instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Text(String),
    Element(ElementData),
}

/// Element payload. Children are owned by the tree and only change through
/// its structural operations.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub tag: String,
    pub attributes: Properties,
    pub style: Properties,
    children: Vec<NodeId>,
}

impl ElementData {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Properties::new(),
            style: Properties::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.set(name, value);
        self
    }

    pub fn with_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.set(property, value);
        self
    }

    /// Same tag, attributes and style, no children
    pub fn shallow_clone(&self) -> Self {
        Self {
            tag: self.tag.clone(),
            attributes: self.attributes.clone(),
            style: self.style.clone(),
            children: Vec::new(),
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_tag(&self, tags: &[&str]) -> bool {
        tags.contains(&self.tag.as_str())
    }
}

#[derive(Debug, Clone)]
struct Slot {
    kind: NodeKind,
    parent: Option<NodeId>,
}

/// Frozen copy of the whole arena, used by the history stack
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    nodes: HashMap<NodeId, Slot>,
    root: NodeId,
    next_id: u64,
}

/// Detached fragment produced by [`DocumentTree::extract_range`]
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Top-level nodes of the fragment, in document order
    pub nodes: Vec<NodeId>,
    /// Where the fragment used to start
    pub at: Position,
}

/// Part of a text node covered by a range (character offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSlice {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub struct DocumentTree {
    nodes: HashMap<NodeId, Slot>,
    root: NodeId,
    next_id: u64,
    generation: u64,
}

impl DocumentTree {
    /// Empty document with a `div` surface
    pub fn new() -> Self {
        Self::with_surface("div")
    }

    pub fn with_surface(tag: &str) -> Self {
        let mut tree = Self {
            nodes: HashMap::new(),
            root: NodeId(0),
            next_id: 0,
            generation: 0,
        };
        tree.root = tree.alloc(NodeKind::Element(ElementData::new(tag)));
        tree
    }

    /// Build a document from markup
    pub fn parse(source: &str) -> ParseResult<Self> {
        let mut tree = Self::new();
        tree.load(source)?;
        Ok(tree)
    }

    /// Replace the whole content with `source`.
    ///
    /// All previously issued ids stop resolving. On a parse error the
    /// document is left untouched.
    pub fn load(&mut self, source: &str) -> ParseResult<()> {
        let fragment = markup::parse(source)?;
        let surface = self
            .element(self.root)
            .map(|e| e.shallow_clone())
            .unwrap_or_else(|| ElementData::new("div"));

        self.nodes.clear();
        self.root = self.alloc(NodeKind::Element(surface));
        for node in &fragment {
            let id = self.import(node);
            self.push_child(self.root, id);
        }
        self.normalize_lists(self.root);
        self.touch();
        Ok(())
    }

    /// Markup of the surface's content
    pub fn serialize(&self) -> String {
        markup::serialize(&self.export_children(self.root))
    }

    // Accessors

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Bumped on every structural mutation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(&id).map(|slot| &slot.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|slot| slot.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.get(id) {
            Some(NodeKind::Element(element)) => &element.children,
            _ => &[],
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.get(id) {
            Some(NodeKind::Text(content)) => Some(content),
            _ => None,
        }
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.get(id) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    /// Attribute and style edits. Children stay out of reach.
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.nodes.get_mut(&id).map(|slot| &mut slot.kind) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    /// True if `id` is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.nodes.contains_key(&id) {
            return false;
        }
        id == self.root || self.ancestors(id).last() == Some(self.root)
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Characters for text, child count for elements
    pub fn node_len(&self, id: NodeId) -> usize {
        match self.get(id) {
            Some(NodeKind::Text(content)) => content.chars().count(),
            Some(NodeKind::Element(element)) => element.children.len(),
            None => 0,
        }
    }

    /// True if `pos` points into the live document
    pub fn resolves(&self, pos: &Position) -> bool {
        self.is_attached(pos.node) && pos.offset <= self.node_len(pos.node)
    }

    /// Strict ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Nearest element (inclusive of `id`, exclusive of the root) matching `pred`
    pub fn nearest_ancestor<F>(&self, id: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&ElementData) -> bool,
    {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .take_while(|&n| n != self.root)
            .find(|&n| self.element(n).is_some_and(&pred))
    }

    /// Nearest common inclusive ancestor
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let chain: HashSet<NodeId> = std::iter::once(a).chain(self.ancestors(a)).collect();
        std::iter::once(b)
            .chain(self.ancestors(b))
            .find(|n| chain.contains(n))
    }

    /// Concatenated text below `id`
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// `id` and everything below it, pre-order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if !self.nodes.contains_key(&node) {
                continue;
            }
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Attached text nodes in document order
    pub fn text_nodes(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| self.text(id).is_some())
            .collect()
    }

    /// Text of the whole document
    pub fn plain_text(&self) -> String {
        self.text_content(self.root)
    }

    // Node creation

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(content.into()))
    }

    /// Allocate a detached element. Children in `data` are ignored.
    pub fn create_element(&mut self, mut data: ElementData) -> NodeId {
        data.children.clear();
        self.alloc(NodeKind::Element(data))
    }

    /// Copy an owned node into the arena as a detached subtree
    pub fn import(&mut self, node: &Node) -> NodeId {
        match node {
            Node::Text { content } => self.create_text(content.clone()),
            Node::Element(element) => {
                let id = self.alloc(NodeKind::Element(ElementData {
                    tag: element.tag.clone(),
                    attributes: element.attributes.clone(),
                    style: element.style.clone(),
                    children: Vec::new(),
                }));
                for child in &element.children {
                    let child = self.import(child);
                    self.push_child(id, child);
                }
                id
            }
        }
    }

    /// Owned copy of the subtree at `id`
    pub fn export(&self, id: NodeId) -> Option<Node> {
        match self.get(id)? {
            NodeKind::Text(content) => Some(Node::text(content.clone())),
            NodeKind::Element(data) => Some(Node::Element(Element {
                tag: data.tag.clone(),
                attributes: data.attributes.clone(),
                style: data.style.clone(),
                children: self.export_children(id),
            })),
        }
    }

    fn export_children(&self, id: NodeId) -> Vec<Node> {
        self.children(id)
            .iter()
            .filter_map(|&child| self.export(child))
            .collect()
    }

    // Structural mutations

    /// Move `child` under `parent` at `index` (clamped)
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), TreeError> {
        if !self.nodes.contains_key(&child) {
            return Err(TreeError::NodeNotFound(child));
        }
        if self.element(parent).is_none() {
            return Err(if self.nodes.contains_key(&parent) {
                TreeError::NotAnElement(parent)
            } else {
                TreeError::NodeNotFound(parent)
            });
        }
        if child == self.root {
            return Err(TreeError::RootImmutable);
        }
        if child == parent || self.ancestors(parent).any(|a| a == child) {
            return Err(TreeError::CycleDetected);
        }

        let mut index = index;
        if self.parent(child) == Some(parent) {
            if let Some(current) = self.index_in_parent(child) {
                if current < index {
                    index -= 1;
                }
            }
        }
        self.detach(child)?;

        if let Some(NodeKind::Element(element)) = self.nodes.get_mut(&parent).map(|s| &mut s.kind) {
            let index = index.min(element.children.len());
            element.children.insert(index, child);
        }
        if let Some(slot) = self.nodes.get_mut(&child) {
            slot.parent = Some(parent);
        }
        self.touch();
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.insert_child(parent, usize::MAX, child)
    }

    /// Unlink `id` from its parent. The subtree stays in the arena.
    pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        if id == self.root {
            return Err(TreeError::RootImmutable);
        }
        let slot = self.nodes.get_mut(&id).ok_or(TreeError::NodeNotFound(id))?;
        let Some(parent) = slot.parent.take() else {
            return Ok(());
        };
        if let Some(NodeKind::Element(element)) = self.nodes.get_mut(&parent).map(|s| &mut s.kind) {
            element.children.retain(|&c| c != id);
        }
        self.touch();
        Ok(())
    }

    /// Detach `id` and drop its subtree from the arena
    pub fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.detach(id)?;
        for node in self.descendants(id) {
            self.nodes.remove(&node);
        }
        Ok(())
    }

    /// Put `new` where `old` is; `old` stays in the arena, detached
    pub fn replace_node(&mut self, old: NodeId, new: NodeId) -> Result<(), TreeError> {
        let parent = self.parent(old).ok_or(TreeError::Detached(old))?;
        let index = self.index_in_parent(old).ok_or(TreeError::Detached(old))?;
        self.detach(old)?;
        self.insert_child(parent, index, new)
    }

    /// Append every child of `from` to `to`, keeping order
    pub fn move_children(&mut self, from: NodeId, to: NodeId) -> Result<(), TreeError> {
        let children = self.children(from).to_vec();
        for child in children {
            self.append_child(to, child)?;
        }
        Ok(())
    }

    /// Replace an element with its children
    pub fn unwrap_element(&mut self, id: NodeId) -> Result<(), TreeError> {
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let index = self.index_in_parent(id).ok_or(TreeError::Detached(id))?;
        let children = self.children(id).to_vec();
        for (i, child) in children.into_iter().enumerate() {
            self.insert_child(parent, index + i, child)?;
        }
        self.remove(id)
    }

    /// Split a text node at a character offset.
    ///
    /// The original node keeps the leading part; the trailing part becomes a
    /// new sibling right after it. Either part may be empty.
    pub fn split_text_node(&mut self, id: NodeId, offset: usize) -> Result<(NodeId, NodeId), TreeError> {
        let len = match self.get(id) {
            Some(NodeKind::Text(content)) => content.chars().count(),
            Some(NodeKind::Element(_)) => return Err(TreeError::NotText(id)),
            None => return Err(TreeError::NodeNotFound(id)),
        };
        if offset > len {
            return Err(TreeError::OffsetOutOfBounds { node: id, offset, len });
        }
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let index = self.index_in_parent(id).ok_or(TreeError::Detached(id))?;

        let tail = match self.nodes.get_mut(&id).map(|s| &mut s.kind) {
            Some(NodeKind::Text(content)) => {
                let at = byte_offset(content, offset);
                content.split_off(at)
            }
            _ => return Err(TreeError::NotText(id)),
        };
        let after = self.create_text(tail);
        self.insert_child(parent, index + 1, after)?;
        Ok((id, after))
    }

    /// Split an element so that children from `index` on move into a
    /// shallow copy inserted right after it
    pub fn split_element(&mut self, id: NodeId, index: usize) -> Result<NodeId, TreeError> {
        let data = self.element(id).ok_or(TreeError::NotAnElement(id))?.shallow_clone();
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let position = self.index_in_parent(id).ok_or(TreeError::Detached(id))?;
        let moving = self.children(id).get(index..).unwrap_or(&[]).to_vec();

        let copy = self.create_element(data);
        self.insert_child(parent, position + 1, copy)?;
        for child in moving {
            self.append_child(copy, child)?;
        }
        Ok(copy)
    }

    /// Insert `node` at a boundary point, splitting a text node if needed
    pub fn insert_node_at(&mut self, at: Position, node: NodeId) -> Result<(), TreeError> {
        match self.get(at.node) {
            Some(NodeKind::Element(_)) => self.insert_child(at.node, at.offset, node),
            Some(NodeKind::Text(content)) => {
                let len = content.chars().count();
                let parent = self.parent(at.node).ok_or(TreeError::Detached(at.node))?;
                let index = self.index_in_parent(at.node).ok_or(TreeError::Detached(at.node))?;
                if at.offset == 0 {
                    self.insert_child(parent, index, node)
                } else if at.offset >= len {
                    self.insert_child(parent, index + 1, node)
                } else {
                    self.split_text_node(at.node, at.offset)?;
                    self.insert_child(parent, index + 1, node)
                }
            }
            None => Err(TreeError::NodeNotFound(at.node)),
        }
    }

    /// Type `text` at a boundary point; returns the position after it
    pub fn insert_text_at(&mut self, at: Position, text: &str) -> Result<Position, TreeError> {
        let inserted = text.chars().count();
        match self.get(at.node) {
            Some(NodeKind::Text(content)) => {
                let len = content.chars().count();
                if at.offset > len {
                    return Err(TreeError::OffsetOutOfBounds { node: at.node, offset: at.offset, len });
                }
                if let Some(NodeKind::Text(content)) = self.nodes.get_mut(&at.node).map(|s| &mut s.kind) {
                    let byte = byte_offset(content, at.offset);
                    content.insert_str(byte, text);
                }
                self.touch();
                Ok(Position::new(at.node, at.offset + inserted))
            }
            Some(NodeKind::Element(element)) => {
                // Continue the text or block right before the boundary
                let previous = at
                    .offset
                    .checked_sub(1)
                    .and_then(|i| element.children.get(i))
                    .copied()
                    .filter(|&prev| match self.get(prev) {
                        Some(NodeKind::Text(_)) => true,
                        Some(NodeKind::Element(data)) => is_block_tag(&data.tag),
                        None => false,
                    });
                match previous {
                    Some(prev) => {
                        let end = self.node_len(prev);
                        self.insert_text_at(Position::new(prev, end), text)
                    }
                    None => {
                        let node = self.create_text(text);
                        self.insert_child(at.node, at.offset, node)?;
                        Ok(Position::new(node, inserted))
                    }
                }
            }
            None => Err(TreeError::NodeNotFound(at.node)),
        }
    }

    /// Wrap the range in a new element without leaving the boundaries'
    /// shared parent.
    ///
    /// Both boundaries must live in the same container element (a text
    /// node counts as its parent). Otherwise nothing is touched and
    /// `IncompatibleBoundaries` is returned.
    pub fn wrap_range(&mut self, range: &Range, wrapper: ElementData) -> Result<NodeId, TreeError> {
        let (start, end) = self.ordered(range)?;
        let parent = self.container_element(&start)?;
        if parent != self.container_element(&end)? {
            return Err(TreeError::IncompatibleBoundaries);
        }

        let (from, to) = self.isolate(start, end, parent)?;
        let covered = self.children(parent)[from..to].to_vec();
        let wrapper = self.create_element(wrapper);
        self.insert_child(parent, from, wrapper)?;
        for node in covered {
            self.append_child(wrapper, node)?;
        }
        Ok(wrapper)
    }

    /// Cut the range out of the document.
    ///
    /// Elements crossing a boundary are split so the fragment carries its
    /// own copy of their formatting. The returned nodes are detached; `at`
    /// is where they used to start.
    pub fn extract_range(&mut self, range: &Range) -> Result<Extraction, TreeError> {
        let (start, end) = self.ordered(range)?;
        let ancestor = self.common_container(&start, &end)?;
        let (from, to) = self.isolate(start, end, ancestor)?;
        let nodes = self.children(ancestor)[from..to].to_vec();
        for &node in &nodes {
            self.detach(node)?;
        }
        Ok(Extraction {
            nodes,
            at: Position::new(ancestor, from),
        })
    }

    /// Split everything between the boundaries and `ancestor` so that the
    /// range covers exactly `children(ancestor)[from..to]`
    pub fn isolate(&mut self, start: Position, end: Position, ancestor: NodeId) -> Result<(usize, usize), TreeError> {
        let end_index = self.split_up_to(end, ancestor)?;
        let end_ref = self.children(ancestor).get(end_index).copied();
        let start_index = self.split_up_to(start, ancestor)?;
        let end_index = match end_ref {
            Some(node) => self.index_in_parent(node).ok_or(TreeError::Detached(node))?,
            None => self.children(ancestor).len(),
        };
        Ok((start_index, end_index.max(start_index)))
    }

    /// Split at `pos` on every level up to `ancestor`; returns the child
    /// index in `ancestor` of the resulting boundary
    fn split_up_to(&mut self, pos: Position, ancestor: NodeId) -> Result<usize, TreeError> {
        let text_len = self.text(pos.node).map(|t| t.chars().count());
        let (mut node, mut index) = match text_len {
            Some(len) => {
                let parent = self.parent(pos.node).ok_or(TreeError::Detached(pos.node))?;
                let index = self.index_in_parent(pos.node).ok_or(TreeError::Detached(pos.node))?;
                let boundary = if pos.offset == 0 {
                    index
                } else if pos.offset >= len {
                    index + 1
                } else {
                    self.split_text_node(pos.node, pos.offset)?;
                    index + 1
                };
                (parent, boundary)
            }
            None => (pos.node, pos.offset),
        };

        while node != ancestor {
            let parent = self.parent(node).ok_or(TreeError::Detached(node))?;
            let position = self.index_in_parent(node).ok_or(TreeError::Detached(node))?;
            let len = self.children(node).len();
            index = if index == 0 {
                position
            } else if index >= len {
                position + 1
            } else {
                self.split_element(node, index)?;
                position + 1
            };
            node = parent;
        }
        Ok(index)
    }

    /// Drop every empty text node; returns how many were removed
    pub fn remove_empty_text_fragments(&mut self) -> usize {
        let empty: Vec<NodeId> = self
            .descendants(self.root)
            .into_iter()
            .filter(|&id| self.text(id).is_some_and(str::is_empty))
            .collect();
        let mut removed = 0;
        for id in empty {
            if self.remove(id).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    // Boundary points

    /// Element owning the boundary (the parent, for text positions)
    pub fn container_element(&self, pos: &Position) -> Result<NodeId, TreeError> {
        match self.get(pos.node) {
            Some(NodeKind::Element(_)) => Ok(pos.node),
            Some(NodeKind::Text(_)) => self.parent(pos.node).ok_or(TreeError::Detached(pos.node)),
            None => Err(TreeError::NodeNotFound(pos.node)),
        }
    }

    /// Nearest element containing both boundaries
    pub fn common_container(&self, a: &Position, b: &Position) -> Result<NodeId, TreeError> {
        let a = self.container_element(a)?;
        let b = self.container_element(b)?;
        self.common_ancestor(a, b).ok_or(TreeError::Detached(b))
    }

    fn boundary_path(&self, pos: &Position) -> Result<Vec<usize>, TreeError> {
        if !self.nodes.contains_key(&pos.node) {
            return Err(TreeError::NodeNotFound(pos.node));
        }
        if !self.resolves(pos) {
            let len = self.node_len(pos.node);
            return Err(if pos.offset > len {
                TreeError::OffsetOutOfBounds { node: pos.node, offset: pos.offset, len }
            } else {
                TreeError::Detached(pos.node)
            });
        }
        let mut path = vec![pos.offset];
        let mut node = pos.node;
        while node != self.root {
            let index = self.index_in_parent(node).ok_or(TreeError::Detached(node))?;
            path.push(index);
            node = self.parent(node).ok_or(TreeError::Detached(node))?;
        }
        path.reverse();
        Ok(path)
    }

    /// Document-order comparison of two boundary points
    pub fn compare(&self, a: &Position, b: &Position) -> Result<Ordering, TreeError> {
        Ok(self.boundary_path(a)?.cmp(&self.boundary_path(b)?))
    }

    /// Range boundaries as `(start, end)` in document order
    pub fn ordered(&self, range: &Range) -> Result<(Position, Position), TreeError> {
        match self.compare(&range.anchor, &range.focus)? {
            Ordering::Greater => Ok((range.focus, range.anchor)),
            _ => Ok((range.anchor, range.focus)),
        }
    }

    /// Text covered by the range, node by node
    pub fn text_in_range(&self, range: &Range) -> Result<Vec<TextSlice>, TreeError> {
        let (start, end) = self.ordered(range)?;
        let mut slices = Vec::new();
        for node in self.text_nodes() {
            let len = self.node_len(node);
            let from = if node == start.node {
                start.offset
            } else if self.compare(&Position::new(node, 0), &start)? == Ordering::Less {
                continue;
            } else {
                0
            };
            let to = if node == end.node {
                end.offset
            } else if self.compare(&Position::new(node, 0), &end)? != Ordering::Less {
                break;
            } else {
                len
            };
            if from < to {
                slices.push(TextSlice { node, start: from, end: to });
            }
        }
        Ok(slices)
    }

    pub fn selected_text(&self, range: &Range) -> Result<String, TreeError> {
        let mut out = String::new();
        for slice in self.text_in_range(range)? {
            if let Some(text) = self.text(slice.node) {
                out.extend(text.chars().skip(slice.start).take(slice.end - slice.start));
            }
        }
        Ok(out)
    }

    /// Map a plain-text character offset to a boundary point.
    ///
    /// At a node boundary, `prefer_following` picks the start of the next
    /// text node instead of the end of the previous one.
    pub fn position_at_text_offset(&self, offset: usize, prefer_following: bool) -> Option<Position> {
        let mut seen = 0;
        let mut last = None;
        for node in self.text_nodes() {
            let len = self.node_len(node);
            if offset < seen + len || (offset == seen + len && !prefer_following) {
                return Some(Position::new(node, offset - seen));
            }
            seen += len;
            last = Some((node, len));
        }
        match last {
            Some((node, len)) if offset == seen => Some(Position::new(node, len)),
            None if offset == 0 => Some(Position::new(self.root, 0)),
            _ => None,
        }
    }

    /// Range over plain-text character offsets `[start, end)`
    pub fn range_from_text_offsets(&self, start: usize, end: usize) -> Option<Range> {
        if start == end {
            return self.position_at_text_offset(start, false).map(Range::caret);
        }
        let (start, end) = (start.min(end), start.max(end));
        Some(Range::new(
            self.position_at_text_offset(start, true)?,
            self.position_at_text_offset(end, false)?,
        ))
    }

    // History

    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            nodes: self.nodes.clone(),
            root: self.root,
            next_id: self.next_id,
        }
    }

    /// Freeze this tree without copying it
    pub fn into_snapshot(self) -> TreeSnapshot {
        TreeSnapshot {
            nodes: self.nodes,
            root: self.root,
            next_id: self.next_id,
        }
    }

    /// Bring back a snapshot. Counts as a structural mutation.
    pub fn restore(&mut self, snapshot: &TreeSnapshot) {
        self.nodes = snapshot.nodes.clone();
        self.root = snapshot.root;
        self.next_id = self.next_id.max(snapshot.next_id);
        self.touch();
    }

    /// Put a clone taken earlier back in place.
    ///
    /// Unlike [`restore`](Self::restore) this keeps the checkpoint's
    /// generation, but ids allocated since the clone stay spent.
    pub fn roll_back_to(&mut self, checkpoint: DocumentTree) {
        let next_id = self.next_id.max(checkpoint.next_id);
        *self = checkpoint;
        self.next_id = next_id;
    }

    // Internals

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Slot { kind, parent: None });
        id
    }

    /// Link a freshly allocated node; skips the checks `insert_child` does
    fn push_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(NodeKind::Element(element)) = self.nodes.get_mut(&parent).map(|s| &mut s.kind) {
            element.children.push(child);
        }
        if let Some(slot) = self.nodes.get_mut(&child) {
            slot.parent = Some(parent);
        }
    }

    fn touch(&mut self) {
        self.generation += 1;
    }

    /// Lists hold only `li` children: whitespace between items goes away,
    /// runs of anything else are gathered into an item
    fn normalize_lists(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        if self.element(id).is_some_and(|e| e.is_tag(&["ul", "ol"])) {
            let mut normalized = Vec::with_capacity(children.len());
            let mut pending_item: Option<NodeId> = None;
            for child in children {
                if self.text(child).is_some_and(|t| t.trim().is_empty()) {
                    self.nodes.remove(&child);
                    continue;
                }
                if self.tag(child) == Some("li") {
                    pending_item = None;
                    normalized.push(child);
                    continue;
                }
                let item = match pending_item {
                    Some(item) => item,
                    None => {
                        let item = self.create_element(ElementData::new("li"));
                        self.nodes.entry(item).and_modify(|s| s.parent = Some(id));
                        normalized.push(item);
                        pending_item = Some(item);
                        item
                    }
                };
                self.push_child(item, child);
            }
            if let Some(NodeKind::Element(element)) = self.nodes.get_mut(&id).map(|s| &mut s.kind) {
                element.children = normalized;
            }
        }
        for child in self.children(id).to_vec() {
            self.normalize_lists(child);
        }
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over strict ancestors, nearest first
pub struct Ancestors<'a> {
    tree: &'a DocumentTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_text(tree: &DocumentTree) -> NodeId {
        tree.text_nodes()[0]
    }

    #[test]
    fn test_load_and_serialize() {
        let tree = DocumentTree::parse("<p>Hello <b>world</b></p>").unwrap();
        assert_eq!(tree.serialize(), "<p>Hello <b>world</b></p>");
        assert_eq!(tree.plain_text(), "Hello world");
    }

    #[test]
    fn test_load_invalidates_old_ids() {
        let mut tree = DocumentTree::parse("<p>a</p>").unwrap();
        let old = first_text(&tree);
        let generation = tree.generation();
        tree.load("<p>a</p>").unwrap();
        assert!(!tree.is_attached(old));
        assert!(tree.generation() > generation);
    }

    #[test]
    fn test_lists_are_normalized() {
        let tree = DocumentTree::parse("<ul>\n  <li>a</li>\n  stray <b>x</b><li>b</li></ul>").unwrap();
        assert_eq!(tree.serialize(), "<ul><li>a</li><li>\n  stray <b>x</b></li><li>b</li></ul>");
    }

    #[test]
    fn test_split_text_node() {
        let mut tree = DocumentTree::parse("<p>Hello</p>").unwrap();
        let text = first_text(&tree);
        let (before, after) = tree.split_text_node(text, 2).unwrap();
        assert_eq!(tree.text(before), Some("He"));
        assert_eq!(tree.text(after), Some("llo"));
        assert_eq!(tree.serialize(), "<p>Hello</p>");

        let err = tree.split_text_node(before, 9).unwrap_err();
        assert!(matches!(err, TreeError::OffsetOutOfBounds { len: 2, .. }));
    }

    #[test]
    fn test_split_text_node_counts_characters() {
        let mut tree = DocumentTree::parse("<p>héllo</p>").unwrap();
        let text = first_text(&tree);
        let (before, after) = tree.split_text_node(text, 2).unwrap();
        assert_eq!(tree.text(before), Some("hé"));
        assert_eq!(tree.text(after), Some("llo"));
    }

    #[test]
    fn test_wrap_range_in_single_text() {
        let mut tree = DocumentTree::parse("<p>Hello world</p>").unwrap();
        let text = first_text(&tree);
        let range = Range::new(Position::new(text, 6), Position::new(text, 11));
        tree.wrap_range(&range, ElementData::new("b")).unwrap();
        assert_eq!(tree.serialize(), "<p>Hello <b>world</b></p>");
    }

    #[test]
    fn test_wrap_range_backwards_selection() {
        let mut tree = DocumentTree::parse("<p>Hello world</p>").unwrap();
        let text = first_text(&tree);
        let range = Range::new(Position::new(text, 5), Position::new(text, 0));
        tree.wrap_range(&range, ElementData::new("i")).unwrap();
        assert_eq!(tree.serialize(), "<p><i>Hello</i> world</p>");
    }

    #[test]
    fn test_wrap_range_rejects_incompatible_boundaries() {
        let mut tree = DocumentTree::parse("<p>one <b>two</b> three</p>").unwrap();
        let texts = tree.text_nodes();
        let range = Range::new(Position::new(texts[0], 1), Position::new(texts[1], 2));
        let before = tree.serialize();
        let err = tree.wrap_range(&range, ElementData::new("u")).unwrap_err();
        assert_eq!(err, TreeError::IncompatibleBoundaries);
        assert_eq!(tree.serialize(), before);
    }

    #[test]
    fn test_extract_range_across_elements() {
        let mut tree = DocumentTree::parse("<p>one <b>two</b> three</p>").unwrap();
        let texts = tree.text_nodes();
        let range = Range::new(Position::new(texts[0], 2), Position::new(texts[1], 2));
        let extraction = tree.extract_range(&range).unwrap();

        assert_eq!(tree.serialize(), "<p>on<b>o</b> three</p>");
        let fragment: Vec<Node> = extraction.nodes.iter().filter_map(|&n| tree.export(n)).collect();
        assert_eq!(markup::serialize(&fragment), "e <b>tw</b>");
        assert_eq!(tree.tag(extraction.at.node), Some("p"));
        assert_eq!(extraction.at.offset, 1);
    }

    #[test]
    fn test_extract_range_across_blocks() {
        let mut tree = DocumentTree::parse("<p>abc</p><p>def</p>").unwrap();
        let texts = tree.text_nodes();
        let range = Range::new(Position::new(texts[0], 1), Position::new(texts[1], 2));
        let extraction = tree.extract_range(&range).unwrap();

        assert_eq!(tree.serialize(), "<p>a</p><p>f</p>");
        assert_eq!(extraction.at, Position::new(tree.root(), 1));
        let fragment: Vec<Node> = extraction.nodes.iter().filter_map(|&n| tree.export(n)).collect();
        assert_eq!(markup::serialize(&fragment), "<p>bc</p><p>de</p>");
    }

    #[test]
    fn test_insert_node_at_splits_text() {
        let mut tree = DocumentTree::parse("<p>ab</p>").unwrap();
        let text = first_text(&tree);
        let br = tree.create_element(ElementData::new("br"));
        tree.insert_node_at(Position::new(text, 1), br).unwrap();
        assert_eq!(tree.serialize(), "<p>a<br>b</p>");
    }

    #[test]
    fn test_insert_text_at_element_position_extends_previous_text() {
        let mut tree = DocumentTree::parse("<p>ab<br></p>").unwrap();
        let p = tree.children(tree.root())[0];
        let end = tree.insert_text_at(Position::new(p, 1), "c").unwrap();
        assert_eq!(tree.serialize(), "<p>abc<br></p>");
        assert_eq!(end.offset, 3);
    }

    #[test]
    fn test_remove_empty_text_fragments() {
        let mut tree = DocumentTree::parse("<p>ab</p>").unwrap();
        let text = first_text(&tree);
        tree.split_text_node(text, 2).unwrap();
        assert_eq!(tree.text_nodes().len(), 2);
        assert_eq!(tree.remove_empty_text_fragments(), 1);
        assert_eq!(tree.text_nodes().len(), 1);
    }

    #[test]
    fn test_insert_child_rejects_cycles() {
        let mut tree = DocumentTree::parse("<p><b>x</b></p>").unwrap();
        let p = tree.children(tree.root())[0];
        let b = tree.children(p)[0];
        assert_eq!(tree.append_child(b, p), Err(TreeError::CycleDetected));
        assert_eq!(tree.detach(tree.root()), Err(TreeError::RootImmutable));
    }

    #[test]
    fn test_unwrap_element() {
        let mut tree = DocumentTree::parse("<p>a<b>b<i>c</i></b>d</p>").unwrap();
        let b = tree.descendants(tree.root()).into_iter().find(|&n| tree.tag(n) == Some("b")).unwrap();
        tree.unwrap_element(b).unwrap();
        assert_eq!(tree.serialize(), "<p>ab<i>c</i>d</p>");
        assert!(tree.get(b).is_none());
    }

    #[test]
    fn test_compare_document_order() {
        let tree = DocumentTree::parse("<p>ab</p><p>cd</p>").unwrap();
        let texts = tree.text_nodes();
        let p1 = tree.children(tree.root())[0];
        let a = Position::new(texts[0], 2);
        let b = Position::new(texts[1], 0);
        assert_eq!(tree.compare(&a, &b).unwrap(), Ordering::Less);
        assert_eq!(tree.compare(&Position::new(p1, 0), &Position::new(texts[0], 0)).unwrap(), Ordering::Less);
        assert_eq!(tree.compare(&Position::new(p1, 1), &a).unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_text_offsets() {
        let tree = DocumentTree::parse("<p>Hello <b>big</b> world</p>").unwrap();
        let texts = tree.text_nodes();
        assert_eq!(tree.position_at_text_offset(6, false), Some(Position::new(texts[0], 6)));
        assert_eq!(tree.position_at_text_offset(6, true), Some(Position::new(texts[1], 0)));
        assert_eq!(tree.position_at_text_offset(15, false), Some(Position::new(texts[2], 6)));
        assert_eq!(tree.position_at_text_offset(16, false), None);

        let range = tree.range_from_text_offsets(6, 9).unwrap();
        assert_eq!(tree.selected_text(&range).unwrap(), "big");
        let range = tree.range_from_text_offsets(4, 11).unwrap();
        assert_eq!(tree.selected_text(&range).unwrap(), "o big w");
    }

    #[test]
    fn test_snapshot_restore_moves_generation_forward() {
        let mut tree = DocumentTree::parse("<p>a</p>").unwrap();
        let snapshot = tree.snapshot();
        tree.load("<p>b</p>").unwrap();
        let generation = tree.generation();
        tree.restore(&snapshot);
        assert_eq!(tree.serialize(), "<p>a</p>");
        assert!(tree.generation() > generation);

        // new ids never collide with ones handed out before the restore
        let fresh = tree.create_text("x");
        assert!(fresh.raw() >= snapshot.next_id);
    }

    #[test]
    fn test_roll_back_keeps_ids_spent() {
        let mut tree = DocumentTree::parse("<p>a</p>").unwrap();
        let checkpoint = tree.clone();
        let generation = tree.generation();

        let p = tree.children(tree.root())[0];
        let text = tree.create_text("b");
        tree.append_child(p, text).unwrap();
        tree.roll_back_to(checkpoint);

        assert_eq!(tree.serialize(), "<p>a</p>");
        assert_eq!(tree.generation(), generation);
        assert!(tree.get(text).is_none());
        assert!(tree.create_text("c").raw() > text.raw());
    }
}
