//! # List Style Manager
//!
//! Ordered/unordered conversion and bullet styling.
//!
//! Conversion never rewrites items: the `li` children migrate into a new
//! list element in their original order and the old list takes no part in
//! the result. Bullet styles are written twice, as `list-style-type` and as
//! the legacy `type` attribute, so the markup keeps its numbering even when
//! a consumer drops inline styles.

use crate::blocks::touched_blocks;
use crate::commands::{BulletStyle, ListKind};
use crate::errors::{CommandError, TreeError};
use crate::range::Range;
use crate::tree::{DocumentTree, ElementData, NodeId};
use tracing::debug;

pub struct ListStyleManager<'a> {
    tree: &'a mut DocumentTree,
}

impl<'a> ListStyleManager<'a> {
    pub fn new(tree: &'a mut DocumentTree) -> Self {
        Self { tree }
    }

    /// Make the selection a `kind` list styled with `style`; returns the list
    pub fn apply(&mut self, range: &Range, kind: ListKind, style: BulletStyle) -> Result<NodeId, CommandError> {
        let (start, _) = self.tree.ordered(range)?;
        let container = self.tree.container_element(&start)?;
        let existing = self
            .tree
            .nearest_ancestor(container, |e| e.is_tag(&["ul", "ol"]));

        let list = match existing {
            Some(list) if self.tree.tag(list) == Some(kind.tag()) => {
                debug!("[Lists] restyling {} {}", kind.tag(), list);
                list
            }
            Some(list) => self.convert(list, kind)?,
            None => self.create(range, kind)?,
        };
        self.set_bullet_style(list, style)?;
        Ok(list)
    }

    /// Replace `list` with a `kind` list holding the same items
    pub fn convert(&mut self, list: NodeId, kind: ListKind) -> Result<NodeId, TreeError> {
        let mut data = self
            .tree
            .element(list)
            .ok_or(TreeError::NotAnElement(list))?
            .shallow_clone();
        debug!("[Lists] converting {} {} to {}", data.tag, list, kind.tag());
        data.tag = kind.tag().to_string();

        let converted = self.tree.create_element(data);
        self.tree.move_children(list, converted)?;
        self.tree.replace_node(list, converted)?;
        self.tree.remove(list)?;
        Ok(converted)
    }

    /// Write `style` as both the style property and the `type` attribute
    pub fn set_bullet_style(&mut self, list: NodeId, style: BulletStyle) -> Result<(), TreeError> {
        let element = self.tree.element_mut(list).ok_or(TreeError::NotAnElement(list))?;
        element.style.set("list-style-type", style.as_css());
        element.attributes.set("type", style.type_attribute());
        Ok(())
    }

    /// Start a `kind` list holding one item.
    ///
    /// A single touched block becomes the item itself. Several touched
    /// blocks move, unchanged, into one shared item.
    fn create(&mut self, range: &Range, kind: ListKind) -> Result<NodeId, CommandError> {
        let blocks = touched_blocks(self.tree, range, "p")?;
        let first = *blocks.first().ok_or(CommandError::Abandoned("no block to turn into a list"))?;
        let parent = self.tree.parent(first).ok_or(TreeError::Detached(first))?;
        let index = self.tree.index_in_parent(first).ok_or(TreeError::Detached(first))?;
        debug!("[Lists] creating {} from {} block(s)", kind.tag(), blocks.len());

        let list = self.tree.create_element(ElementData::new(kind.tag()));
        self.tree.insert_child(parent, index, list)?;
        let item = match blocks.as_slice() {
            [block] => self.retag_as_item(*block)?,
            _ => {
                let item = self.tree.create_element(ElementData::new("li"));
                for &block in &blocks {
                    self.tree.append_child(item, block)?;
                }
                item
            }
        };
        self.tree.append_child(list, item)?;
        Ok(list)
    }

    fn retag_as_item(&mut self, block: NodeId) -> Result<NodeId, TreeError> {
        if self.tree.tag(block) == Some("li") {
            return Ok(block);
        }
        let mut data = self
            .tree
            .element(block)
            .ok_or(TreeError::NotAnElement(block))?
            .shallow_clone();
        data.tag = "li".to_string();
        let item = self.tree.create_element(data);
        self.tree.move_children(block, item)?;
        self.tree.remove(block)?;
        Ok(item)
    }
}
