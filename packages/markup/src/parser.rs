use crate::ast::{is_void_tag, Element, Node, Properties};
use crate::entities;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, Token};

/// Tolerant tree builder for markup fragments.
///
/// The builder never rejects mismatched nesting: a close tag pops every
/// element opened after its match, an unmatched close tag is dropped, and
/// whatever is still open at the end of input is closed implicitly. Only a
/// start tag cut off by the end of input is an error.
pub struct Parser<'src> {
    tokens: Vec<(Token<'src>, std::ops::Range<usize>)>,
    pos: usize,
    source_len: usize,
    /// Elements opened but not yet closed (innermost last)
    open: Vec<Element>,
    /// Finished top-level nodes
    output: Vec<Node>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            tokens: tokenize(source),
            pos: 0,
            source_len: source.len(),
            open: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Parse the whole input as a fragment
    pub fn parse_fragment(mut self) -> ParseResult<Vec<Node>> {
        while let Some((token, _)) = self.advance() {
            match token {
                Token::Text(raw) => self.push_text(&entities::decode(raw)),
                Token::OpenTagStart(name) => self.parse_start_tag(name)?,
                Token::CloseTag(name) => self.close_element(&name.to_ascii_lowercase()),
                other => {
                    return Err(ParseError::invalid_syntax(
                        self.current_pos(),
                        format!("Unexpected {} outside of a tag", other),
                    ));
                }
            }
        }

        while let Some(element) = self.open.pop() {
            self.push_node(Node::Element(element));
        }

        Ok(self.output)
    }

    fn parse_start_tag(&mut self, name: &str) -> ParseResult<()> {
        let mut element = Element::new(name.to_ascii_lowercase());

        let self_closing = loop {
            let Some((token, _)) = self.advance() else {
                return Err(ParseError::unexpected_eof(
                    self.source_len,
                    format!("unterminated <{}> tag", element.tag),
                ));
            };

            match token {
                Token::TagEnd => break false,
                Token::SelfClosingTagEnd => break true,
                Token::AttrName(attr) => {
                    let value = if matches!(self.peek(), Some(Token::Equals)) {
                        self.advance();
                        match self.peek() {
                            Some(Token::AttrValue(v)) | Some(Token::AttrName(v)) => {
                                let v = *v;
                                self.advance();
                                entities::decode(v)
                            }
                            _ => String::new(),
                        }
                    } else {
                        String::new()
                    };
                    self.set_attribute(&mut element, attr, value);
                }
                // A dangling `=` or value without a name is dropped
                _ => {}
            }
        };

        if self_closing || element.is_void() {
            self.push_node(Node::Element(element));
        } else {
            self.open.push(element);
        }
        Ok(())
    }

    fn set_attribute(&self, element: &mut Element, name: &str, value: String) {
        let name = name.to_ascii_lowercase();
        if name == "style" {
            element.style = Properties::parse_style(&value);
        } else {
            element.attributes.set(name, value);
        }
    }

    fn close_element(&mut self, tag: &str) {
        let Some(depth) = self.open.iter().rposition(|e| e.tag == tag) else {
            return;
        };
        while self.open.len() > depth {
            if let Some(element) = self.open.pop() {
                self.push_node(Node::Element(element));
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let siblings = self.current_children();
        if let Some(Node::Text { content }) = siblings.last_mut() {
            content.push_str(text);
        } else {
            siblings.push(Node::text(text));
        }
    }

    fn push_node(&mut self, node: Node) {
        self.current_children().push(node);
    }

    fn current_children(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(element) => &mut element.children,
            None => &mut self.output,
        }
    }

    // Helper methods

    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<(Token<'src>, std::ops::Range<usize>)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn current_pos(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(_, span)| span.start)
            .unwrap_or(0)
    }
}

/// Parse a markup fragment
pub fn parse(source: &str) -> ParseResult<Vec<Node>> {
    Parser::new(source).parse_fragment()
}
