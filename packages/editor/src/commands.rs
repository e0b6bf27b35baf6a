//! # Formatting Commands
//!
//! The toolbar surface: one variant per action, plus the input rules for
//! the free-text parameters (font size, link URL).
//!
//! Commands serialize as `{"type": "fontSize", "value": 24}` so scripts and
//! hosts can send them over JSON.

use crate::errors::CommandError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_FONT_SIZE: u32 = 1;
pub const MAX_FONT_SIZE: u32 = 200;

/// Tags accepted by [`Command::FormatBlock`]
pub const FORMAT_BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "pre",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Command {
    Bold,
    Italic,
    Underline,
    Align(Alignment),
    TextColor(String),
    Highlight(String),
    /// Pixels
    FontSize(u32),
    FontFamily(String),
    FormatBlock(String),
    List(ListKind, BulletStyle),
    Link(String),
    Undo,
    Redo,
}

impl Command {
    /// Short name used for history entries and logs
    pub fn label(&self) -> &'static str {
        match self {
            Command::Bold => "bold",
            Command::Italic => "italic",
            Command::Underline => "underline",
            Command::Align(_) => "align",
            Command::TextColor(_) => "text color",
            Command::Highlight(_) => "highlight",
            Command::FontSize(_) => "font size",
            Command::FontFamily(_) => "font family",
            Command::FormatBlock(_) => "format block",
            Command::List(_, _) => "list",
            Command::Link(_) => "link",
            Command::Undo => "undo",
            Command::Redo => "redo",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Align(alignment) => write!(f, "align({})", alignment.as_css()),
            Command::TextColor(color) | Command::Highlight(color) => write!(f, "{}({})", self.label(), color),
            Command::FontSize(px) => write!(f, "font size({}px)", px),
            Command::FontFamily(name) => write!(f, "font family({})", name),
            Command::FormatBlock(tag) => write!(f, "format block({})", tag),
            Command::List(kind, style) => write!(f, "list({}, {})", kind.tag(), style.as_css()),
            Command::Link(url) => write!(f, "link({})", url),
            _ => f.write_str(self.label()),
        }
    }
}

/// What a command did. Failures never surface beyond this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandOutcome {
    Applied,
    NoOp,
}

impl CommandOutcome {
    pub fn is_applied(self) -> bool {
        self == CommandOutcome::Applied
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn as_css(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Ordered,
    Unordered,
}

impl ListKind {
    pub fn tag(self) -> &'static str {
        match self {
            ListKind::Ordered => "ol",
            ListKind::Unordered => "ul",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BulletStyle {
    Disc,
    Circle,
    Square,
    Decimal,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
}

impl BulletStyle {
    /// `list-style-type` value
    pub fn as_css(self) -> &'static str {
        match self {
            BulletStyle::Disc => "disc",
            BulletStyle::Circle => "circle",
            BulletStyle::Square => "square",
            BulletStyle::Decimal => "decimal",
            BulletStyle::LowerAlpha => "lower-alpha",
            BulletStyle::UpperAlpha => "upper-alpha",
            BulletStyle::LowerRoman => "lower-roman",
            BulletStyle::UpperRoman => "upper-roman",
        }
    }

    /// Value of the legacy `type` attribute mirrored next to the style
    pub fn type_attribute(self) -> &'static str {
        match self {
            BulletStyle::Decimal => "1",
            BulletStyle::LowerAlpha => "a",
            BulletStyle::UpperAlpha => "A",
            BulletStyle::LowerRoman => "i",
            BulletStyle::UpperRoman => "I",
            other => other.as_css(),
        }
    }
}

/// Parse a typed font size. Only whole pixels in `[1, 200]` commit.
pub fn parse_font_size(input: &str) -> Result<u32, CommandError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CommandError::InputValidation("font size is empty".to_string()));
    }
    let px: u32 = trimmed
        .parse()
        .map_err(|_| CommandError::InputValidation(format!("font size '{}' is not a whole number", trimmed)))?;
    validate_font_size(px)
}

pub fn validate_font_size(px: u32) -> Result<u32, CommandError> {
    if (MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&px) {
        Ok(px)
    } else {
        Err(CommandError::InputValidation(format!(
            "font size {} outside {}..={}",
            px, MIN_FONT_SIZE, MAX_FONT_SIZE
        )))
    }
}

/// Check a value bound for an inline `style` declaration.
///
/// A `;` or an unquoted `:` would start another declaration once the style
/// is written out, so both are refused.
pub fn validate_style_value(property: &str, raw: &str) -> Result<String, CommandError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(CommandError::InputValidation(format!("{} is empty", property)));
    }

    let mut quote = None;
    for c in value.chars() {
        match (quote, c) {
            (_, ';') => {
                return Err(CommandError::InputValidation(format!("{} value {:?} contains ';'", property, raw)));
            }
            (None, '"' | '\'') => quote = Some(c),
            (Some(open), _) if c == open => quote = None,
            (None, ':') => {
                return Err(CommandError::InputValidation(format!("{} value {:?} contains ':'", property, raw)));
            }
            _ => {}
        }
    }
    if quote.is_some() {
        return Err(CommandError::InputValidation(format!("{} value {:?} has an open quote", property, raw)));
    }
    Ok(value.to_string())
}

/// Prefix `https://` unless the URL already names http(s)
pub fn normalize_url(raw: &str) -> Result<String, CommandError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(CommandError::InputValidation("link URL is empty".to_string()));
    }
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Ok(url.to_string())
    } else {
        Ok(format!("https://{}", url))
    }
}

/// Lower-cased block tag with any angle brackets stripped
pub fn normalize_block_tag(raw: &str) -> Result<String, CommandError> {
    let tag = raw
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim()
        .to_ascii_lowercase();
    if FORMAT_BLOCK_TAGS.contains(&tag.as_str()) {
        Ok(tag)
    } else {
        Err(CommandError::InputValidation(format!("unsupported block tag '{}'", raw)))
    }
}
