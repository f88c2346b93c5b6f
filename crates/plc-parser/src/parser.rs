//! Recursive-descent parser over a random-access token cursor.
//!
//! Each grammar rule gets its own method; rule references become calls. Two
//! primitives drive everything: [`Parser::peek`] checks a run of patterns
//! against the upcoming tokens, and [`Parser::matches`] is `peek` plus
//! advance. A pattern matches either a token's kind or its exact lexeme, so
//! keywords (which arrive as plain identifier tokens) are matched by text.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use plc_syntax::ast::{
    BinaryOp, Case, Expression, Function, Global, Literal, NodeId, Parameter, Source, Statement,
};
use plc_syntax::error::{error_at, Result};
use plc_syntax::token::{Token, TokenKind};

/// A lookahead pattern: a token kind or an exact lexeme.
#[derive(Debug, Clone, Copy)]
pub enum Pattern {
    Kind(TokenKind),
    Lexeme(&'static str),
}

use Pattern::{Kind, Lexeme};

const IDENTIFIER: Pattern = Kind(TokenKind::Identifier);
const INTEGER: Pattern = Kind(TokenKind::Integer);
const DECIMAL: Pattern = Kind(TokenKind::Decimal);
const CHARACTER: Pattern = Kind(TokenKind::Character);
const STRING: Pattern = Kind(TokenKind::String);
const OPERATOR: Pattern = Kind(TokenKind::Operator);

/// Random-access cursor over the token vector.
struct TokenStream {
    tokens: Vec<Token>,
    index: usize,
}

impl TokenStream {
    /// True if a token exists at `index + offset`.
    fn has(&self, offset: isize) -> bool {
        let i = self.index as isize + offset;
        i >= 0 && (i as usize) < self.tokens.len()
    }

    /// The token at `index + offset`; negative offsets read consumed tokens.
    fn get(&self, offset: isize) -> &Token {
        &self.tokens[(self.index as isize + offset) as usize]
    }

    fn advance(&mut self) {
        self.index += 1;
    }
}

/// The PLC parser. Consumes the whole token stream and produces a [`Source`],
/// assigning a fresh [`NodeId`] to every node that owns a resolution slot.
pub struct Parser {
    tokens: TokenStream,
    next_id: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: TokenStream { tokens, index: 0 },
            next_id: 0,
        }
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// True iff the tokens at offsets `0..patterns.len()` all exist and each
    /// matches its pattern.
    fn peek(&self, patterns: &[Pattern]) -> bool {
        patterns.iter().enumerate().all(|(i, p)| {
            self.tokens.has(i as isize)
                && match p {
                    Kind(kind) => self.tokens.get(i as isize).kind == *kind,
                    Lexeme(lexeme) => self.tokens.get(i as isize).literal == *lexeme,
                }
        })
    }

    /// [`Self::peek`], advancing past the matched tokens on success.
    fn matches(&mut self, patterns: &[Pattern]) -> bool {
        let matched = self.peek(patterns);
        if matched {
            for _ in patterns {
                self.tokens.advance();
            }
        }
        matched
    }

    /// Error at the current position: the next token's index if one exists,
    /// else one past the end of the last consumed token.
    fn err<T>(&self, msg: impl Into<String>) -> Result<T> {
        let index = if self.tokens.has(0) {
            self.tokens.get(0).index
        } else if self.tokens.has(-1) {
            self.tokens.get(-1).ends_at()
        } else {
            0
        };
        error_at(index, msg)
    }

    /// Parses the `source` rule: globals, then functions, then end of input.
    pub fn parse_source(&mut self) -> Result<Source> {
        let mut source = Source::default();
        while self.peek(&[Lexeme("LIST")])
            || self.peek(&[Lexeme("VAR")])
            || self.peek(&[Lexeme("VAL")])
        {
            source.globals.push(self.parse_global()?);
        }
        while self.peek(&[Lexeme("FUN")]) {
            source.functions.push(self.parse_function()?);
        }
        if self.tokens.has(0) {
            return self.err("Unexpected token");
        }
        Ok(source)
    }

    /// Parses the `global` rule; dispatches on the introducing keyword.
    pub fn parse_global(&mut self) -> Result<Global> {
        if self.matches(&[Lexeme("LIST")]) {
            self.parse_list()
        } else if self.matches(&[Lexeme("VAR")]) {
            self.parse_mutable()
        } else if self.matches(&[Lexeme("VAL")]) {
            self.parse_immutable()
        } else {
            self.err("Unexpected token")
        }
    }

    /// Name and type annotation shared by every global form.
    fn parse_global_header(&mut self) -> Result<(String, String)> {
        if !self.matches(&[IDENTIFIER, Lexeme(":"), IDENTIFIER]) {
            return self.err("Expected 'name : Type'");
        }
        Ok((
            self.tokens.get(-3).literal.clone(),
            self.tokens.get(-1).literal.clone(),
        ))
    }

    /// `list = IDENT ":" IDENT "=" "[" (expr ("," expr)*)? "]" ";"`
    ///
    /// `LIST` globals are always mutable.
    fn parse_list(&mut self) -> Result<Global> {
        let (name, type_name) = self.parse_global_header()?;
        if !self.matches(&[Lexeme("="), Lexeme("[")]) {
            return self.err("Expected '= ['");
        }
        let mut elements = Vec::new();
        if !self.peek(&[Lexeme("]")]) {
            elements.push(self.parse_expression()?);
            while self.matches(&[Lexeme(",")]) {
                if self.peek(&[Lexeme("]")]) {
                    return self.err("Hanging comma");
                }
                elements.push(self.parse_expression()?);
            }
        }
        if !self.matches(&[Lexeme("]")]) {
            return self.err("Missing closing bracket");
        }
        if !self.matches(&[Lexeme(";")]) {
            return self.err("Missing semicolon");
        }
        let list = Expression::List {
            id: self.fresh_id(),
            elements,
        };
        Ok(Global {
            id: self.fresh_id(),
            name,
            type_name,
            mutable: true,
            value: Some(list),
        })
    }

    /// `mutable = IDENT ":" IDENT ("=" expr)? ";"`
    fn parse_mutable(&mut self) -> Result<Global> {
        let (name, type_name) = self.parse_global_header()?;
        let value = if self.matches(&[Lexeme("=")]) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        if !self.matches(&[Lexeme(";")]) {
            return self.err("Missing semicolon");
        }
        Ok(Global {
            id: self.fresh_id(),
            name,
            type_name,
            mutable: true,
            value,
        })
    }

    /// `immutable = IDENT ":" IDENT "=" expr ";"`; the initializer is
    /// mandatory.
    fn parse_immutable(&mut self) -> Result<Global> {
        let (name, type_name) = self.parse_global_header()?;
        if !self.matches(&[Lexeme("=")]) {
            return self.err("Immutable global requires an initializer");
        }
        let value = self.parse_expression()?;
        if !self.matches(&[Lexeme(";")]) {
            return self.err("Missing semicolon");
        }
        Ok(Global {
            id: self.fresh_id(),
            name,
            type_name,
            mutable: false,
            value: Some(value),
        })
    }

    /// `function = "FUN" IDENT "(" params? ")" (":" IDENT)? "DO" block "END"`
    pub fn parse_function(&mut self) -> Result<Function> {
        if !self.matches(&[Lexeme("FUN"), IDENTIFIER]) {
            return self.err("Unexpected token");
        }
        let name = self.tokens.get(-1).literal.clone();
        if !self.matches(&[Lexeme("(")]) {
            return self.err("Missing opening parenthesis");
        }
        let mut parameters = Vec::new();
        if self.matches(&[IDENTIFIER]) {
            if !self.matches(&[Lexeme(":"), IDENTIFIER]) {
                return self.err("Missing parameter type");
            }
            parameters.push(Parameter {
                name: self.tokens.get(-3).literal.clone(),
                type_name: self.tokens.get(-1).literal.clone(),
            });
            while self.matches(&[Lexeme(",")]) {
                if !self.matches(&[IDENTIFIER, Lexeme(":"), IDENTIFIER]) {
                    return self.err("Missing parameter type");
                }
                parameters.push(Parameter {
                    name: self.tokens.get(-3).literal.clone(),
                    type_name: self.tokens.get(-1).literal.clone(),
                });
            }
        }
        if !self.matches(&[Lexeme(")")]) {
            return self.err("Missing closing parenthesis");
        }
        let return_type_name = if self.matches(&[Lexeme(":")]) {
            if !self.matches(&[IDENTIFIER]) {
                return self.err("Missing return type");
            }
            Some(self.tokens.get(-1).literal.clone())
        } else {
            None
        };
        if !self.matches(&[Lexeme("DO")]) {
            return self.err("Expected 'DO'");
        }
        let body = self.parse_block()?;
        if !self.matches(&[Lexeme("END")]) {
            return self.err("Unexpected end of block");
        }
        Ok(Function {
            id: self.fresh_id(),
            name,
            parameters,
            return_type_name,
            body,
        })
    }

    /// `block = statement*`, stopping before `ELSE`, `END`, `CASE`, `DEFAULT`.
    pub fn parse_block(&mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        while !self.peek(&[Lexeme("ELSE")])
            && !self.peek(&[Lexeme("END")])
            && !self.peek(&[Lexeme("CASE")])
            && !self.peek(&[Lexeme("DEFAULT")])
        {
            if !self.tokens.has(0) {
                return self.err("Unterminated block");
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    /// Parses the `statement` rule and delegates on the leading keyword; a
    /// statement that starts with none of them is an expression or
    /// assignment statement.
    pub fn parse_statement(&mut self) -> Result<Statement> {
        if self.matches(&[Lexeme("LET")]) {
            self.parse_declaration_statement()
        } else if self.matches(&[Lexeme("IF")]) {
            self.parse_if_statement()
        } else if self.matches(&[Lexeme("WHILE")]) {
            self.parse_while_statement()
        } else if self.matches(&[Lexeme("SWITCH")]) {
            self.parse_switch_statement()
        } else if self.matches(&[Lexeme("RETURN")]) {
            self.parse_return_statement()
        } else {
            let receiver = self.parse_expression()?;
            if self.matches(&[Lexeme("=")]) {
                let value = self.parse_expression()?;
                if !self.matches(&[Lexeme(";")]) {
                    return self.err("Missing semicolon");
                }
                Ok(Statement::Assignment { receiver, value })
            } else {
                if !self.matches(&[Lexeme(";")]) {
                    return self.err("Missing semicolon");
                }
                Ok(Statement::Expression(receiver))
            }
        }
    }

    /// `decl = IDENT (":" IDENT)? ("=" expr)? ";"`; `LET` is already consumed.
    fn parse_declaration_statement(&mut self) -> Result<Statement> {
        if !self.matches(&[IDENTIFIER]) {
            return self.err("Expected variable name");
        }
        let name = self.tokens.get(-1).literal.clone();
        let type_name = if self.matches(&[Lexeme(":")]) {
            if !self.matches(&[IDENTIFIER]) {
                return self.err("Missing type name");
            }
            Some(self.tokens.get(-1).literal.clone())
        } else {
            None
        };
        let value = if self.matches(&[Lexeme("=")]) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        if !self.matches(&[Lexeme(";")]) {
            return self.err("Missing semicolon");
        }
        Ok(Statement::Declaration {
            id: self.fresh_id(),
            name,
            type_name,
            value,
        })
    }

    /// `"IF" expr "DO" block ("ELSE" block)? "END"`; `IF` is already consumed.
    fn parse_if_statement(&mut self) -> Result<Statement> {
        let condition = self.parse_expression()?;
        if !self.matches(&[Lexeme("DO")]) {
            return self.err("Expected 'DO'");
        }
        let then_block = self.parse_block()?;
        let else_block = if self.matches(&[Lexeme("ELSE")]) {
            self.parse_block()?
        } else {
            Vec::new()
        };
        if !self.matches(&[Lexeme("END")]) {
            return self.err("Unexpected end of block");
        }
        Ok(Statement::If {
            condition,
            then_block,
            else_block,
        })
    }

    /// `"SWITCH" expr ("CASE" expr ":" block)* "DEFAULT" block "END"`;
    /// `SWITCH` is already consumed. The default arm is appended as a case with
    /// no value.
    fn parse_switch_statement(&mut self) -> Result<Statement> {
        let condition = self.parse_expression()?;
        let mut cases = Vec::new();
        while self.matches(&[Lexeme("CASE")]) {
            cases.push(self.parse_case_statement()?);
        }
        if !self.matches(&[Lexeme("DEFAULT")]) {
            return self.err("Missing DEFAULT case");
        }
        let body = self.parse_block()?;
        cases.push(Case { value: None, body });
        if !self.matches(&[Lexeme("END")]) {
            return self.err("Unexpected end of block");
        }
        Ok(Statement::Switch { condition, cases })
    }

    /// `"CASE" expr ":" block`; `CASE` is already consumed.
    fn parse_case_statement(&mut self) -> Result<Case> {
        let value = self.parse_expression()?;
        if !self.matches(&[Lexeme(":")]) {
            return self.err("Missing colon");
        }
        let body = self.parse_block()?;
        Ok(Case {
            value: Some(value),
            body,
        })
    }

    /// `"WHILE" expr "DO" block "END"`; `WHILE` is already consumed.
    fn parse_while_statement(&mut self) -> Result<Statement> {
        let condition = self.parse_expression()?;
        if !self.matches(&[Lexeme("DO")]) {
            return self.err("Expected 'DO'");
        }
        let body = self.parse_block()?;
        if !self.matches(&[Lexeme("END")]) {
            return self.err("Unexpected end of block");
        }
        Ok(Statement::While { condition, body })
    }

    /// `"RETURN" expr ";"`; `RETURN` is already consumed.
    fn parse_return_statement(&mut self) -> Result<Statement> {
        let value = self.parse_expression()?;
        if !self.matches(&[Lexeme(";")]) {
            return self.err("Missing semicolon");
        }
        Ok(Statement::Return(value))
    }

    /// Parses the `expression` rule.
    pub fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_logical_expression()
    }

    fn binary(&mut self, op: BinaryOp, left: Expression, right: Expression) -> Expression {
        Expression::Binary {
            id: self.fresh_id(),
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `logical = compare (("&&" | "||") compare)*`, left-associative.
    fn parse_logical_expression(&mut self) -> Result<Expression> {
        let mut e = self.parse_comparison_expression()?;
        loop {
            let op = if self.matches(&[Lexeme("&&")]) {
                BinaryOp::And
            } else if self.matches(&[Lexeme("||")]) {
                BinaryOp::Or
            } else {
                break;
            };
            let right = self.parse_comparison_expression()?;
            e = self.binary(op, e, right);
        }
        Ok(e)
    }

    /// `compare = additive (("<" | "<=" | ">" | ">=" | "==" | "!=") additive)*`
    fn parse_comparison_expression(&mut self) -> Result<Expression> {
        let mut e = self.parse_additive_expression()?;
        loop {
            let op = if self.matches(&[Lexeme("<=")]) {
                BinaryOp::Le
            } else if self.matches(&[Lexeme(">=")]) {
                BinaryOp::Ge
            } else if self.matches(&[Lexeme("==")]) {
                BinaryOp::Eq
            } else if self.matches(&[Lexeme("!=")]) {
                BinaryOp::Ne
            } else if self.matches(&[Lexeme("<")]) {
                BinaryOp::Lt
            } else if self.matches(&[Lexeme(">")]) {
                BinaryOp::Gt
            } else {
                break;
            };
            let right = self.parse_additive_expression()?;
            e = self.binary(op, e, right);
        }
        Ok(e)
    }

    /// `additive = multi (("+" | "-") multi)*`
    fn parse_additive_expression(&mut self) -> Result<Expression> {
        let mut e = self.parse_multiplicative_expression()?;
        loop {
            let op = if self.matches(&[Lexeme("+")]) {
                BinaryOp::Add
            } else if self.matches(&[Lexeme("-")]) {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.parse_multiplicative_expression()?;
            e = self.binary(op, e, right);
        }
        Ok(e)
    }

    /// `multi = primary (("*" | "/" | "^") primary)*`
    fn parse_multiplicative_expression(&mut self) -> Result<Expression> {
        let mut e = self.parse_primary_expression()?;
        loop {
            let op = if self.matches(&[Lexeme("*")]) {
                BinaryOp::Mul
            } else if self.matches(&[Lexeme("/")]) {
                BinaryOp::Div
            } else if self.matches(&[Lexeme("^")]) {
                BinaryOp::Pow
            } else {
                break;
            };
            let right = self.parse_primary_expression()?;
            e = self.binary(op, e, right);
        }
        Ok(e)
    }

    /// `primary`: literals, grouping, variable access, and function calls.
    pub fn parse_primary_expression(&mut self) -> Result<Expression> {
        if self.matches(&[Lexeme("TRUE")]) {
            return Ok(self.literal(Literal::Boolean(true)));
        }
        if self.matches(&[Lexeme("FALSE")]) {
            return Ok(self.literal(Literal::Boolean(false)));
        }
        if self.matches(&[Lexeme("NIL")]) {
            return Ok(self.literal(Literal::Nil));
        }
        if self.matches(&[INTEGER]) {
            let token = self.tokens.get(-1);
            let value = match BigInt::from_str(&token.literal) {
                Ok(v) => v,
                Err(_) => return error_at(token.index, "Invalid integer literal"),
            };
            return Ok(self.literal(Literal::Integer(value)));
        }
        if self.matches(&[DECIMAL]) {
            let token = self.tokens.get(-1);
            let value = match BigDecimal::from_str(&token.literal) {
                Ok(v) => v,
                Err(_) => return error_at(token.index, "Invalid decimal literal"),
            };
            return Ok(self.literal(Literal::Decimal(value)));
        }
        if self.matches(&[STRING]) {
            let token = self.tokens.get(-1).clone();
            let decoded = decode_escapes(trim_quotes(&token.literal), token.index)?;
            return Ok(self.literal(Literal::String(decoded)));
        }
        if self.matches(&[CHARACTER]) {
            let token = self.tokens.get(-1).clone();
            let decoded = decode_escapes(trim_quotes(&token.literal), token.index)?;
            let mut chars = decoded.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(self.literal(Literal::Character(c))),
                _ => error_at(token.index, "Invalid character literal"),
            };
        }
        if self.matches(&[Lexeme("(")]) {
            let inner = self.parse_expression()?;
            if !self.matches(&[Lexeme(")")]) {
                return self.err("Missing closing parenthesis");
            }
            return Ok(Expression::Group {
                id: self.fresh_id(),
                inner: Box::new(inner),
            });
        }
        if self.peek(&[OPERATOR]) {
            return self.err("Unexpected token");
        }
        if self.matches(&[IDENTIFIER]) {
            let name = self.tokens.get(-1).literal.clone();
            if self.matches(&[Lexeme("(")]) {
                let mut args = Vec::new();
                if !self.peek(&[Lexeme(")")]) {
                    args.push(self.parse_expression()?);
                    while self.matches(&[Lexeme(",")]) {
                        if self.peek(&[Lexeme(")")]) {
                            return self.err("Hanging comma");
                        }
                        args.push(self.parse_expression()?);
                    }
                }
                if !self.matches(&[Lexeme(")")]) {
                    return self.err("Missing closing parenthesis");
                }
                return Ok(Expression::Call {
                    id: self.fresh_id(),
                    name,
                    args,
                });
            }
            if self.matches(&[Lexeme("[")]) {
                let offset = self.parse_expression()?;
                if !self.matches(&[Lexeme("]")]) {
                    return self.err("Missing closing square bracket");
                }
                return Ok(Expression::Access {
                    id: self.fresh_id(),
                    name,
                    offset: Some(Box::new(offset)),
                });
            }
            return Ok(Expression::Access {
                id: self.fresh_id(),
                name,
                offset: None,
            });
        }
        self.err("Unexpected token")
    }

    fn literal(&mut self, value: Literal) -> Expression {
        Expression::Literal {
            id: self.fresh_id(),
            value,
        }
    }
}

fn trim_quotes(lexeme: &str) -> &str {
    &lexeme[1..lexeme.len() - 1]
}

/// Decodes `\b \n \r \t \' \" \\`; any other backslash sequence is an error.
fn decode_escapes(raw: &str, index: usize) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('b') => out.push('\u{0008}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            _ => return error_at(index, "Invalid escape sequence"),
        }
    }
    Ok(out)
}
