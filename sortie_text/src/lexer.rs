// Token rules for the block grammar.
//
// Three anchored regex rules are tried at the current position, in order:
// - block open:  `Tag {`
// - property:    `Name = value;` (value is a quoted string or bare text up to `;`)
// - block close: `}`
// Whitespace and `#` comments (to end of line) between tokens are skipped.
// Anything else is `ParseError::Unexpected`.
//
// The lexer only slices the source; interpreting values (numbers, quotes,
// complex values) is the parser's job.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;

static OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*\{").expect("valid open rule"));

static PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([A-Za-z0-9_]+)\s*=\s*("(?:[^"\\]|\\.)*"|[^;{}"]*?)\s*;"#)
        .expect("valid property rule")
});

static CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\}").expect("valid close rule"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind<'a> {
    Open(&'a str),
    /// `raw` is the value text exactly as written, quotes included.
    Property { name: &'a str, raw: &'a str },
    Close,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    /// 1-based line the token starts on.
    pub line: usize,
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
        }
    }

    fn rest(&self) -> &'a str {
        let src: &'a str = self.src;
        &src[self.pos..]
    }

    fn advance(&mut self, len: usize) {
        let consumed = &self.src[self.pos..self.pos + len];
        self.line += consumed.matches('\n').count();
        self.pos += len;
    }

    fn skip_trivia(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.advance(rest.len() - trimmed.len());
            if !trimmed.starts_with('#') {
                return;
            }
            let comment = trimmed.find('\n').unwrap_or(trimmed.len());
            self.advance(comment);
        }
    }

    fn unexpected(&self) -> ParseError {
        let snippet = self
            .rest()
            .lines()
            .next()
            .unwrap_or_default()
            .chars()
            .take(40)
            .collect();
        ParseError::Unexpected {
            line: self.line,
            snippet,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_trivia();
        let rest = self.rest();
        if rest.is_empty() {
            return None;
        }
        let line = self.line;

        let (kind, len) = if let Some(caps) = OPEN.captures(rest) {
            let tag = caps.get(1).map_or("", |m| m.as_str());
            (TokenKind::Open(tag), caps[0].len())
        } else if let Some(caps) = PROPERTY.captures(rest) {
            let name = caps.get(1).map_or("", |m| m.as_str());
            let raw = caps.get(2).map_or("", |m| m.as_str());
            (TokenKind::Property { name, raw }, caps[0].len())
        } else if let Some(m) = CLOSE.find(rest) {
            (TokenKind::Close, m.len())
        } else {
            // Park at the end so a caller that keeps iterating stops.
            let err = self.unexpected();
            self.pos = self.src.len();
            return Some(Err(err));
        };

        self.advance(len);
        Some(Ok(Token { kind, line }))
    }
}
