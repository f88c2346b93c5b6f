//! PLC lexer: converts source text into tokens.
//!
//! Keywords are not distinguished here: `FUN` and `main` are both
//! [`TokenKind::Identifier`] tokens, and the parser matches on lexemes.
//! String and character literals keep their surrounding quotes and raw
//! escape sequences; the parser decodes them.

use plc_syntax::error::{error_at, Result};
use plc_syntax::token::{Token, TokenKind};

/// Streaming character scanner that produces tokens with byte offsets.
pub struct Lexer {
    src: Vec<char>,
    pos: usize,
    offset: usize,
}

impl Lexer {
    /// Create a new lexer over the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            src: input.chars().collect(),
            pos: 0,
            offset: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }
    fn peek_next(&self) -> Option<char> {
        self.src.get(self.pos + 1).copied()
    }
    fn advance(&mut self) -> Option<char> {
        let ch = self.src.get(self.pos).copied();
        if let Some(c) = ch {
            self.pos += 1;
            self.offset += c.len_utf8();
        }
        ch
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '\u{0008}' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.offset;
        let mut s = String::new();
        s.push(self.advance().unwrap());
        // after the first character, digits, '_' and '-' are legal
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Token {
            kind: TokenKind::Identifier,
            literal: s,
            index: start,
        }
    }

    fn read_number(&mut self) -> Token {
        let start = self.offset;
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let mut kind = TokenKind::Integer;
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            kind = TokenKind::Decimal;
            s.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    s.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        Token {
            kind,
            literal: s,
            index: start,
        }
    }

    fn read_string(&mut self) -> Result<Token> {
        let start = self.offset;
        let mut s = String::new();
        s.push(self.advance().unwrap()); // opening quote
        loop {
            match self.peek() {
                None | Some('\n') | Some('\r') => {
                    return error_at(start, "Unterminated string");
                }
                Some('"') => {
                    s.push('"');
                    self.advance();
                    return Ok(Token {
                        kind: TokenKind::String,
                        literal: s,
                        index: start,
                    });
                }
                Some('\\') => {
                    s.push('\\');
                    self.advance();
                    match self.advance() {
                        Some(c) if c != '\n' && c != '\r' => s.push(c),
                        _ => return error_at(start, "Unterminated string"),
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_character(&mut self) -> Result<Token> {
        let start = self.offset;
        let mut s = String::new();
        s.push(self.advance().unwrap()); // opening quote
        match self.peek() {
            None | Some('\n') | Some('\r') | Some('\'') => {
                return error_at(start, "Empty or unterminated character literal");
            }
            Some('\\') => {
                s.push('\\');
                self.advance();
                match self.advance() {
                    Some(c) if c != '\n' && c != '\r' => s.push(c),
                    _ => return error_at(start, "Empty or unterminated character literal"),
                }
            }
            Some(c) => {
                s.push(c);
                self.advance();
            }
        }
        if self.peek() != Some('\'') {
            return error_at(start, "Empty or unterminated character literal");
        }
        s.push('\'');
        self.advance();
        Ok(Token {
            kind: TokenKind::Character,
            literal: s,
            index: start,
        })
    }

    fn read_operator(&mut self) -> Token {
        let start = self.offset;
        let c = self.advance().unwrap();
        let mut s = String::new();
        s.push(c);
        let two_char = matches!(
            (c, self.peek()),
            ('&', Some('&')) | ('|', Some('|')) | ('=' | '!' | '<' | '>', Some('='))
        );
        if two_char {
            s.push(self.advance().unwrap());
        }
        Token {
            kind: TokenKind::Operator,
            literal: s,
            index: start,
        }
    }

    /// Tokenize the entire input into a vector of tokens.
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let tk = match self.peek() {
                None => break,
                Some('"') => self.read_string()?,
                Some('\'') => self.read_character()?,
                Some(c) if c.is_ascii_digit() => self.read_number(),
                Some(c) if c.is_ascii_alphabetic() || c == '@' => self.read_identifier(),
                Some(_) => self.read_operator(),
            };
            tokens.push(tk);
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().expect("lexing should succeed")
    }

    fn lexemes(input: &str) -> Vec<String> {
        lex(input).into_iter().map(|t| t.literal).collect()
    }

    #[test]
    fn keywords_are_identifiers() {
        let tokens = lex("FUN main");
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Identifier));
        assert_eq!(tokens[0].literal, "FUN");
        assert_eq!(tokens[1].index, 4);
    }

    #[test]
    fn identifiers_allow_hyphens_and_at() {
        assert_eq!(lexemes("@env x-coord a_b"), vec!["@env", "x-coord", "a_b"]);
    }

    #[test]
    fn numbers_split_into_integer_and_decimal() {
        let tokens = lex("42 3.14 1.");
        assert_eq!(tokens[0].kind, TokenKind::Integer);
        assert_eq!(tokens[1].kind, TokenKind::Decimal);
        assert_eq!(tokens[1].literal, "3.14");
        // a dot without a following digit is not part of the number
        assert_eq!(tokens[2].kind, TokenKind::Integer);
        assert_eq!(tokens[3].literal, ".");
    }

    #[test]
    fn string_literals_keep_quotes_and_raw_escapes() {
        let tokens = lex(r#""a\nb""#);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].literal, r#""a\nb""#);
    }

    #[test]
    fn character_literals_keep_quotes() {
        let tokens = lex(r"'c' '\n'");
        assert_eq!(tokens[0].literal, "'c'");
        assert_eq!(tokens[1].literal, r"'\n'");
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Character));
    }

    #[test]
    fn compound_operators_are_single_tokens() {
        assert_eq!(
            lexemes("a <= b == c && d != e >= f || g < h"),
            vec!["a", "<=", "b", "==", "c", "&&", "d", "!=", "e", ">=", "f", "||", "g", "<", "h"]
        );
    }

    #[test]
    fn unterminated_literals_are_errors() {
        assert!(Lexer::new("\"abc").tokenize().is_err());
        assert!(Lexer::new("'a").tokenize().is_err());
        assert!(Lexer::new("''").tokenize().is_err());
    }

    #[test]
    fn indices_are_byte_offsets() {
        let tokens = lex("VAR x = 1;");
        let indices: Vec<usize> = tokens.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 4, 6, 8, 9]);
    }
}
