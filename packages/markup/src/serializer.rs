use crate::ast::{Element, Node};
use crate::entities::{escape_attribute, escape_text};

/// Serializer converts a node fragment back to markup text.
///
/// Output is compact (no indentation is added or removed) so that text
/// nodes survive byte-for-byte and `serialize(parse(s))` is a fixed point
/// after the first normalization.
pub struct Serializer {
    output: String,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    /// Serialize a fragment to markup
    pub fn serialize(mut self, nodes: &[Node]) -> String {
        for node in nodes {
            self.serialize_node(node);
        }
        self.output
    }

    fn serialize_node(&mut self, node: &Node) {
        match node {
            Node::Text { content } => escape_text(content, &mut self.output),
            Node::Element(element) => self.serialize_element(element),
        }
    }

    fn serialize_element(&mut self, element: &Element) {
        self.output.push('<');
        self.output.push_str(&element.tag);

        for (name, value) in element.attributes.iter() {
            self.serialize_attribute(name, value);
        }
        if !element.style.is_empty() {
            let style = element.style.to_style_string();
            self.serialize_attribute("style", &style);
        }
        self.output.push('>');

        if element.is_void() {
            return;
        }

        for child in &element.children {
            self.serialize_node(child);
        }

        self.output.push_str("</");
        self.output.push_str(&element.tag);
        self.output.push('>');
    }

    fn serialize_attribute(&mut self, name: &str, value: &str) {
        self.output.push(' ');
        self.output.push_str(name);
        self.output.push_str("=\"");
        escape_attribute(value, &mut self.output);
        self.output.push('"');
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a fragment to markup
pub fn serialize(nodes: &[Node]) -> String {
    Serializer::new().serialize(nodes)
}
