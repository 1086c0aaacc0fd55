//! Directive grammar for advisor output
//!
//! ```text
//! directive := ws identifier ws "(" ws [ argument ( "," argument )* ] ")" trailer
//! argument  := any text up to a top-level "," or ")"; quotes may wrap it
//! trailer   := ws ( "." | ";" )* ws EOF
//! ```
//!
//! Quoting is only stripped. Names, arity and numbers are checked later,
//! when the directive becomes a [`Command`](super::Command).

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A syntactically valid `name(args)` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directive {
    pub operation: String,
    pub args: Vec<String>,
}

impl Directive {
    pub fn new(operation: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            operation: operation.into(),
            args,
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.operation, self.args.join(", "))
    }
}

/// Advisor text that does not match the directive grammar
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("advice text is empty")]
    Empty,

    #[error("no line matches name(args): {text:?}")]
    NoDirective { text: String },

    #[error("{reason} at column {column}: {text:?}")]
    Malformed {
        text: String,
        column: usize,
        reason: &'static str,
    },
}

impl ParseError {
    /// The offending advisor text
    pub fn text(&self) -> &str {
        match self {
            ParseError::Empty => "",
            ParseError::NoDirective { text } | ParseError::Malformed { text, .. } => text,
        }
    }
}

/// Parse the first line of `advice` that matches the grammar.
///
/// Blank lines and prose lines are skipped. When the advice is a single
/// line the specific grammar error for it is returned.
pub fn parse_advice(advice: &str) -> Result<Directive, ParseError> {
    let lines: Vec<&str> = advice
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    match lines.as_slice() {
        [] => Err(ParseError::Empty),
        [only] => parse_directive(only),
        _ => lines
            .iter()
            .find_map(|line| parse_directive(line).ok())
            .ok_or_else(|| ParseError::NoDirective {
                text: advice.trim().to_string(),
            }),
    }
}

/// Parse exactly one directive line
pub fn parse_directive(line: &str) -> Result<Directive, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    Parser::new(strip_backticks(trimmed)).directive()
}

/// Drop a wrapping pair of markdown backticks
fn strip_backticks(line: &str) -> &str {
    if line.len() > 1 && line.starts_with('`') && line.ends_with('`') {
        line.trim_matches('`').trim()
    } else {
        line
    }
}

fn is_quote(c: char) -> bool {
    c == '"' || c == '\''
}

struct Parser<'a> {
    text: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, reason: &'static str) -> ParseError {
        ParseError::Malformed {
            text: self.text.to_string(),
            column: self.pos + 1,
            reason,
        }
    }

    fn directive(mut self) -> Result<Directive, ParseError> {
        self.skip_ws();
        let operation = self.identifier()?;
        self.skip_ws();
        if self.peek() != Some('(') {
            return Err(self.error("expected '(' after operation name"));
        }
        self.pos += 1;
        let args = self.arguments()?;
        self.trailer()?;

        Ok(Directive { operation, args })
    }

    fn identifier(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return Err(self.error("expected an operation name")),
        }

        let start = self.pos;
        while self
            .peek()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    /// Arguments up to and including the closing paren
    fn arguments(&mut self) -> Result<Vec<String>, ParseError> {
        let mut args = Vec::new();

        self.skip_ws();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(args);
        }

        loop {
            args.push(self.argument()?);
            match self.bump() {
                Some(',') => continue,
                Some(')') => return Ok(args),
                _ => return Err(self.error("missing ')'")),
            }
        }
    }

    /// One positional argument, leaving the delimiter unconsumed
    fn argument(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let mut open_quote: Option<char> = None;

        loop {
            match (self.peek(), open_quote) {
                (None, Some(_)) => return Err(self.error("unterminated quote")),
                (None, None) => return Err(self.error("missing ')'")),
                (Some(c), Some(q)) if c == q => open_quote = None,
                (Some(_), Some(_)) => {}
                (Some(c), None) if is_quote(c) => open_quote = Some(c),
                (Some(',') | Some(')'), None) => break,
                (Some('('), None) => return Err(self.error("nested '(' in argument")),
                (Some(_), None) => {}
            }
            self.pos += 1;
        }

        let raw: String = self.chars[start..self.pos].iter().collect();
        let cleaned = raw.trim().trim_matches(is_quote).trim();
        if cleaned.is_empty() {
            return Err(self.error("empty argument"));
        }
        Ok(cleaned.to_string())
    }

    fn trailer(&mut self) -> Result<(), ParseError> {
        self.skip_ws();
        while matches!(self.peek(), Some('.') | Some(';')) {
            self.pos += 1;
        }
        self.skip_ws();
        if self.pos < self.chars.len() {
            return Err(self.error("unexpected text after ')'"));
        }
        Ok(())
    }
}
