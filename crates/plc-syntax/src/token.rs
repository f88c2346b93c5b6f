//! Token definitions for the PLC language.
//!
//! Tokens are the interface between the lexer and the parser. Unlike many
//! lexers, the PLC lexer does not classify keywords: `FUN`, `IF`, `TRUE` and
//! friends arrive as ordinary [`Identifier`](TokenKind::Identifier) tokens and
//! the parser matches on their lexemes. Every token keeps its exact source
//! lexeme; string and character literals *retain their surrounding quotes*,
//! and escape sequences inside them are decoded later by the parser.
//!
//! # Examples
//!
//! ```rust
//! use plc_syntax::{Token, TokenKind};
//!
//! let keyword = Token {
//!     kind: TokenKind::Identifier,
//!     literal: "FUN".to_string(),
//!     index: 0,
//! };
//!
//! let string = Token {
//!     kind: TokenKind::String,
//!     literal: "\"hello\"".to_string(),
//!     index: 4,
//! };
//!
//! assert_eq!(keyword.ends_at(), 3);
//! assert_eq!(string.ends_at(), 11);
//! ```

/// Token categories produced by the PLC lexer.
///
/// The category carries no payload; the text of the token always lives in
/// [`Token::literal`]. This keeps the parser's `peek`/`matches` primitives
/// uniform: a pattern is either a `TokenKind` (matches the category) or a
/// literal string (matches the lexeme).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An identifier or keyword: `main`, `FUN`, `x_1`
    Identifier,

    /// An integer literal: `42`, `0`
    Integer,

    /// A decimal literal: `3.14`, `0.5`
    Decimal,

    /// A character literal, quotes included: `'c'`, `'\n'`
    Character,

    /// A string literal, quotes included: `"hello"`
    String,

    /// An operator or punctuation token: `+`, `==`, `;`, `(`
    Operator,
}

/// A token with its category, exact lexeme, and source position.
///
/// `index` is the byte offset of the token's first character in the source.
/// Positions flow into parse errors so the driver can point at the offending
/// byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The lexical category of this token
    pub kind: TokenKind,

    /// The exact source text of this token
    pub literal: String,

    /// Byte offset of the token in the source (0-based)
    pub index: usize,
}

impl Token {
    /// Byte offset one past the end of this token.
    ///
    /// Used for error positions when the token stream is exhausted: the
    /// parser reports the end of the last consumed token.
    pub fn ends_at(&self) -> usize {
        self.index + self.literal.len()
    }
}
