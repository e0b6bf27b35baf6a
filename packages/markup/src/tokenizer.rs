use logos::{Lexer, Logos};
use std::fmt;
use std::ops::Range;

/// Tokens between tags
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"<!--([^-]|-[^-])*-->")]
#[logos(skip r"<![a-zA-Z][^>]*>")]
enum ContentToken<'src> {
    #[regex(r"<[a-zA-Z][a-zA-Z0-9-]*", |lex| &lex.slice()[1..])]
    OpenTagStart(&'src str),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9-]*[ \t\r\n]*>", close_tag_name)]
    CloseTag(&'src str),

    #[regex(r"[^<]+")]
    Text,
}

fn close_tag_name<'src>(lex: &mut Lexer<'src, ContentToken<'src>>) -> &'src str {
    let slice = lex.slice();
    slice[2..slice.len() - 1].trim_end()
}

/// Tokens inside a start tag
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum TagToken<'src> {
    #[regex(r#"[^ \t\r\n=>/"'][^ \t\r\n=>"']*"#, |lex| lex.slice())]
    Name(&'src str),

    #[token("=")]
    Equals,

    #[regex(r#""[^"]*""#, strip_quotes)]
    #[regex(r"'[^']*'", strip_quotes)]
    Quoted(&'src str),

    #[token(">")]
    End,

    #[token("/>")]
    SelfClosingEnd,
}

fn strip_quotes<'src>(lex: &mut Lexer<'src, TagToken<'src>>) -> &'src str {
    let slice = lex.slice();
    &slice[1..slice.len() - 1]
}

/// Unified token stream consumed by the parser
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    /// Raw (still entity-encoded) character data
    Text(&'src str),
    /// `<name`, attributes follow until `TagEnd` or `SelfClosingTagEnd`
    OpenTagStart(&'src str),
    AttrName(&'src str),
    Equals,
    /// Quoted attribute value without its quotes
    AttrValue(&'src str),
    TagEnd,
    SelfClosingTagEnd,
    CloseTag(&'src str),
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(t) => write!(f, "text {:?}", t),
            Token::OpenTagStart(name) => write!(f, "<{}", name),
            Token::AttrName(name) => write!(f, "attribute '{}'", name),
            Token::Equals => write!(f, "="),
            Token::AttrValue(v) => write!(f, "value \"{}\"", v),
            Token::TagEnd => write!(f, ">"),
            Token::SelfClosingTagEnd => write!(f, "/>"),
            Token::CloseTag(name) => write!(f, "</{}>", name),
        }
    }
}

/// Tokenize a markup string.
///
/// Content and tag interiors use separate lexers; the stream switches between
/// them with `Lexer::morph` whenever a start tag opens or closes. A `<` that
/// does not begin a tag is reported as text.
pub fn tokenize(source: &str) -> Vec<(Token<'_>, Range<usize>)> {
    let mut tokens = Vec::new();
    let mut content = ContentToken::lexer(source);

    while let Some(result) = content.next() {
        let span = content.span();
        match result {
            Ok(ContentToken::Text) | Err(()) => {
                tokens.push((Token::Text(&source[span.clone()]), span));
            }
            Ok(ContentToken::CloseTag(name)) => tokens.push((Token::CloseTag(name), span)),
            Ok(ContentToken::OpenTagStart(name)) => {
                tokens.push((Token::OpenTagStart(name), span));

                let mut tag = content.morph::<TagToken>();
                while let Some(result) = tag.next() {
                    let span = tag.span();
                    match result {
                        Ok(TagToken::Name(name)) => tokens.push((Token::AttrName(name), span)),
                        Ok(TagToken::Equals) => tokens.push((Token::Equals, span)),
                        Ok(TagToken::Quoted(value)) => tokens.push((Token::AttrValue(value), span)),
                        Ok(TagToken::End) => {
                            tokens.push((Token::TagEnd, span));
                            break;
                        }
                        Ok(TagToken::SelfClosingEnd) => {
                            tokens.push((Token::SelfClosingTagEnd, span));
                            break;
                        }
                        // Stray characters inside a tag carry no meaning
                        Err(()) => {}
                    }
                }
                content = tag.morph();
            }
        }
    }

    tokens
}
