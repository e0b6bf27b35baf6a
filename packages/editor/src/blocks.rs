//! Line-level commands: alignment and block retagging.
//!
//! Both act on every block a range touches. Inline content sitting
//! directly on the surface has no block, so the run it belongs to (bounded
//! by neighbouring blocks or `br`) is gathered into a fresh one first.

use crate::commands::{normalize_block_tag, Alignment};
use crate::errors::{CommandError, TreeError};
use crate::range::Range;
use crate::tree::{is_block_tag, DocumentTree, ElementData, NodeId};
use tracing::debug;

/// Nearest block around `node`, gathering a surface-level inline run into
/// a new `tag` element when there is none
pub fn ensure_block(tree: &mut DocumentTree, node: NodeId, tag: &str) -> Result<NodeId, TreeError> {
    if let Some(block) = tree.nearest_ancestor(node, |e| is_block_tag(&e.tag)) {
        return Ok(block);
    }

    let root = tree.root();
    if node == root {
        return gather_run(tree, 0, tag);
    }
    let top = std::iter::once(node)
        .chain(tree.ancestors(node))
        .find(|&n| tree.parent(n) == Some(root))
        .ok_or(TreeError::Detached(node))?;
    let index = tree.index_in_parent(top).ok_or(TreeError::Detached(top))?;
    gather_run(tree, index, tag)
}

/// Wrap the surface children around `index` that belong to one line
fn gather_run(tree: &mut DocumentTree, index: usize, tag: &str) -> Result<NodeId, TreeError> {
    let root = tree.root();
    let children = tree.children(root).to_vec();
    let breaks_line = |id: NodeId| tree.tag(id).is_some_and(|t| is_block_tag(t) || t == "br");

    let mut from = index.min(children.len());
    while from > 0 && !breaks_line(children[from - 1]) {
        from -= 1;
    }
    let mut to = from;
    while to < children.len() && (to < index || !breaks_line(children[to])) {
        to += 1;
    }

    debug!("[Blocks] gathering surface children {}..{} into <{}>", from, to, tag);
    let block = tree.create_element(ElementData::new(tag));
    tree.insert_child(root, from, block)?;
    for child in &children[from..to] {
        tree.append_child(block, *child)?;
    }
    Ok(block)
}

/// Blocks touched by `range`, in document order
pub fn touched_blocks(tree: &mut DocumentTree, range: &Range, gather_tag: &str) -> Result<Vec<NodeId>, CommandError> {
    let (start, _) = tree.ordered(range)?;
    let mut nodes: Vec<NodeId> = if range.is_collapsed() {
        Vec::new()
    } else {
        tree.text_in_range(range)?.into_iter().map(|slice| slice.node).collect()
    };
    if nodes.is_empty() {
        // A caret between children belongs to the child next to it
        let children = tree.children(start.node);
        let near = children
            .get(start.offset)
            .or_else(|| start.offset.checked_sub(1).and_then(|i| children.get(i)))
            .copied();
        nodes.push(near.unwrap_or(start.node));
    }

    let mut blocks = Vec::new();
    for node in nodes {
        let block = ensure_block(tree, node, gather_tag)?;
        if !blocks.contains(&block) {
            blocks.push(block);
        }
    }
    Ok(blocks)
}

/// Set `text-align` on every touched block
pub fn align(tree: &mut DocumentTree, range: &Range, alignment: Alignment) -> Result<(), CommandError> {
    for block in touched_blocks(tree, range, "div")? {
        if let Some(element) = tree.element_mut(block) {
            element.style.set("text-align", alignment.as_css());
        }
    }
    Ok(())
}

/// Retag every touched block, keeping attributes, style and children
pub fn format_block(tree: &mut DocumentTree, range: &Range, raw_tag: &str) -> Result<(), CommandError> {
    let tag = normalize_block_tag(raw_tag)?;
    for block in touched_blocks(tree, range, &tag)? {
        retag(tree, block, &tag)?;
    }
    Ok(())
}

fn retag(tree: &mut DocumentTree, block: NodeId, tag: &str) -> Result<NodeId, TreeError> {
    let data = tree.element(block).ok_or(TreeError::NotAnElement(block))?;
    if data.tag == tag {
        return Ok(block);
    }

    // List items keep their place in the list and get the block inside
    if data.tag == "li" {
        let inner = tree.create_element(ElementData::new(tag));
        tree.move_children(block, inner)?;
        tree.append_child(block, inner)?;
        return Ok(inner);
    }

    let mut replacement = data.shallow_clone();
    replacement.tag = tag.to_string();
    let replacement = tree.create_element(replacement);
    tree.move_children(block, replacement)?;
    tree.replace_node(block, replacement)?;
    tree.remove(block)?;
    Ok(replacement)
}
